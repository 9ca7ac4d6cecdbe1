//! Exclusive owner of a loaded model.
//!
//! A [`BackendHandle`] is created once per successful load and shared by `Arc`. After
//! [`BackendHandle::unload`] every call fails with `HandleReleased`.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    BackendError, BackendId, BoxedPartialStream, CompletionRequest, InferenceBackend, LoadedModel,
};

/// Result of [`BackendHandle::generate`], shaped by `options.stream`.
pub enum Completion<'a> {
    Text(String),
    Stream(BoxedPartialStream<'a>),
}

impl Debug for Completion<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

pub struct BackendHandle {
    backend: Arc<dyn InferenceBackend>,
    model: LoadedModel,
    released: AtomicBool,
}

impl BackendHandle {
    pub fn new(backend: Arc<dyn InferenceBackend>, model: LoadedModel) -> Self {
        Self {
            backend,
            model,
            released: AtomicBool::new(false),
        }
    }

    pub fn backend_id(&self) -> BackendId {
        self.backend.id()
    }

    pub fn model_id(&self) -> &str {
        &self.model.model_id
    }

    pub fn loaded_model(&self) -> &LoadedModel {
        &self.model
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError> {
        let request = self.prepare(request)?;
        self.backend.complete(&self.model, request).await
    }

    pub async fn stream(
        &self,
        request: CompletionRequest,
    ) -> Result<BoxedPartialStream<'_>, BackendError> {
        let request = self.prepare(request)?;
        self.backend.stream(&self.model, request).await
    }

    pub async fn generate(&self, request: CompletionRequest) -> Result<Completion<'_>, BackendError> {
        if request.options.stream {
            self.stream(request).await.map(Completion::Stream)
        } else {
            self.complete(request).await.map(Completion::Text)
        }
    }

    /// Releases backend resources. A second call fails with `HandleReleased`.
    pub async fn unload(&self) -> Result<(), BackendError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Err(self.released_error());
        }

        self.backend.unload(&self.model).await
    }

    fn prepare(&self, mut request: CompletionRequest) -> Result<CompletionRequest, BackendError> {
        if self.is_released() {
            return Err(self.released_error());
        }

        if request.model.trim().is_empty() {
            request.model = self.model.model_id.clone();
        } else if request.model != self.model.model_id {
            return Err(BackendError::invalid_request(format!(
                "request targets model '{}' but handle owns '{}'",
                request.model, self.model.model_id
            )));
        }

        request.validate()?;
        Ok(request)
    }

    fn released_error(&self) -> BackendError {
        BackendError::handle_released(format!(
            "model '{}' on backend '{}' was unloaded",
            self.model.model_id,
            self.backend.id()
        ))
    }
}

impl Debug for BackendHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("backend", &self.backend.id())
            .field("model", &self.model.model_id)
            .field("released", &self.is_released())
            .finish()
    }
}
