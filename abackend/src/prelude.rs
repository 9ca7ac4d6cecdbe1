//! Common `abackend` imports for downstream crates.

pub use crate::{
    BackendError, BackendErrorKind, BackendHandle, BackendId, BoxedPartialStream, ChatMessage,
    Completion, CompletionRequest, CompletionRequestBuilder, InferenceBackend, LoadedModel,
    PartialTextStream, ProgressSink, Role, VecPartialStream, accumulate_deltas,
};
pub use acommon::{BoxFuture, GenerationOptions, MetadataMap};
