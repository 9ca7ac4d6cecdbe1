//! Local Ollama runtime adapter.
//!
//! The runtime owns the accelerator; this adapter probes it, pulls and warms the model, and
//! relays chat completions as cumulative partial text.

mod backend;
mod transport;
mod types;

pub use backend::OllamaBackend;
pub use transport::{OllamaHttpTransport, OllamaLineStream, OllamaTransport};
pub use types::{
    OllamaChatChunk, OllamaChatRequest, OllamaMessage, OllamaOptions, OllamaPullStatus,
    OllamaWarmRequest,
};

pub const OLLAMA_HOST_URL: &str = "http://localhost:11434";
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.2:1b";
