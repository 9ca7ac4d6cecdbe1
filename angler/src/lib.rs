//! Unified facade over the angler workspace crates.
//!
//! One [`AssistantRuntime`] per process owns the shared [`SessionRegistry`]; every chat surface
//! asks it for a [`SessionClient`] with a private conversation.
//!
//! ```rust,no_run
//! use angler::{AssistantConfig, AssistantRuntime};
//!
//! # async fn demo() -> Result<(), angler::ChatError> {
//! let runtime = AssistantRuntime::from_config(AssistantConfig::from_env())?;
//! runtime.preload(None).await?;
//!
//! let client = runtime.open_client().await?;
//! let reply = client.send("How do I catch mackerel?").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

mod backends;
mod config;
mod macros;

pub mod prelude;
pub mod runtime;
pub mod util;

pub use abackend;
pub use achat;
pub use acommon;
pub use amemory;
pub use aobserve;
pub use asession;

pub use abackend::{
    BackendError, BackendErrorKind, BackendHandle, BackendId, BoxedPartialStream, ChatMessage,
    Completion, CompletionRequest, CompletionRequestBuilder, InferenceBackend, LoadedModel,
    PartialTextStream, ProgressSink, Role, VecPartialStream, accumulate_deltas,
};
pub use achat::{
    ChatError, ChatErrorKind, ChatHooks, Conversation, ConversationPersistence,
    DEFAULT_MAX_TOKENS, DEFAULT_NAMESPACE, DEFAULT_TEMPERATURE, InMemoryConversationPersistence,
    Message, MessageKind, NoopChatHooks, SessionClient, SessionClientBuilder,
    default_generation_options,
};
pub use acommon::{
    BoxFuture, DefaultTranslator, GenerationOptions, MessageCatalog, MessageId, MetadataMap,
    TextKey, Translator,
};
pub use amemory::{
    FilesystemKeyValueBackend, InMemoryKeyValueBackend, KeyValueBackend, MemoryBackendConfig,
    MemoryConversationPersistence, MemoryError, MemoryErrorKind, SqliteKeyValueBackend,
    create_default_memory_backend, create_memory_backend,
};
pub use aobserve::{
    MetricsObservabilityHooks, ObservabilityHooks, SafeChatHooks, SafeRegistryHooks,
    TracingObservabilityHooks,
};
pub use asession::{
    LOAD_COMPLETE_MESSAGE, NoopRegistryHooks, ProgressCallback, RegistryHooks, SessionError,
    SessionErrorKind, SessionRegistry, SessionRegistryBuilder, SessionState, StateListener,
    Subscription,
};

pub use backends::build_backend;
pub use config::{
    AssistantConfig, DEFAULT_BACKEND_HOST, DEFAULT_MODEL_ID, HOST_ENV, MODEL_ENV, STORAGE_ENV,
};
pub use runtime::{AssistantRuntime, AssistantRuntimeBuilder};
pub use util::{assistant_message, generation, parse_role, user_message};
