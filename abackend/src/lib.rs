//! Inference backend adapters for the on-device assistant.
//!
//! A backend probes for local inference support, loads one model with progress reporting, and
//! answers chat completions either as one string or as a stream of cumulative partials.
//!
//! ```rust
//! use abackend::{ChatMessage, CompletionRequest, Role};
//!
//! let request = CompletionRequest::builder("llama3.2:1b")
//!     .message(ChatMessage::new(Role::User, "When do trout bite?"))
//!     .temperature(0.7)
//!     .max_tokens(512)
//!     .build()
//!     .expect("request should be valid");
//!
//! assert_eq!(request.messages.len(), 1);
//! ```

pub mod adapters;
mod backend;
mod error;
mod handle;
mod model;
pub mod prelude;
mod stream;

pub use backend::{InferenceBackend, ProgressSink};
pub use error::{BackendError, BackendErrorKind};
pub use handle::{BackendHandle, Completion};
pub use model::{
    BackendId, ChatMessage, CompletionRequest, CompletionRequestBuilder, LoadedModel, Role,
};
pub use stream::{
    BoxedPartialStream, CumulativeText, PartialTextStream, VecPartialStream, accumulate_deltas,
};

pub use acommon::{BoxFuture, GenerationOptions, MetadataMap};
