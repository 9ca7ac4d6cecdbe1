//! Common imports for most angler applications.

pub use crate::{
    AssistantConfig, AssistantRuntime, AssistantRuntimeBuilder, assistant_message, build_backend,
    generation, parse_role, user_message,
};
pub use crate::{angler_history, angler_msg};
pub use crate::{
    BackendError, BackendErrorKind, BackendHandle, BoxFuture, ChatError, ChatErrorKind,
    ChatHooks, CompletionRequest, ConversationPersistence, GenerationOptions, InferenceBackend,
    KeyValueBackend, MemoryBackendConfig, MemoryConversationPersistence, Message, MessageKind,
    ProgressCallback, RegistryHooks, Role, SessionClient, SessionError, SessionErrorKind,
    SessionRegistry, SessionState, Subscription, Translator,
};
