//! Inference backend trait implemented by local model runtimes.

use std::sync::Arc;

use acommon::BoxFuture;

use crate::{BackendError, BackendId, BoxedPartialStream, CompletionRequest, LoadedModel};

/// Receives human-readable load status lines.
pub type ProgressSink = Arc<dyn Fn(&str) + Send + Sync>;

pub trait InferenceBackend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Reports whether local inference prerequisites are present.
    ///
    /// Implementations fail closed: an unknown answer is `false`.
    fn probe_capability<'a>(&'a self) -> BoxFuture<'a, bool>;

    fn load<'a>(
        &'a self,
        model_id: &'a str,
        progress: ProgressSink,
    ) -> BoxFuture<'a, Result<LoadedModel, BackendError>>;

    fn complete<'a>(
        &'a self,
        model: &'a LoadedModel,
        request: CompletionRequest,
    ) -> BoxFuture<'a, Result<String, BackendError>>;

    /// Streams cumulative partials; see [`crate::PartialTextStream`].
    fn stream<'a>(
        &'a self,
        model: &'a LoadedModel,
        request: CompletionRequest,
    ) -> BoxFuture<'a, Result<BoxedPartialStream<'a>, BackendError>>;

    fn unload<'a>(&'a self, model: &'a LoadedModel) -> BoxFuture<'a, Result<(), BackendError>>;
}
