use std::sync::Arc;

use acommon::BoxFuture;
use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::Client;

use super::transport::{OllamaHttpTransport, OllamaLineStream, OllamaTransport};
use super::types::{OllamaChatRequest, OllamaWarmRequest};
use crate::{
    BackendError, BackendErrorKind, BackendId, BoxedPartialStream, CompletionRequest,
    InferenceBackend, LoadedModel, ProgressSink, accumulate_deltas,
};

/// Keeps the model resident until an explicit unload.
const KEEP_LOADED: i64 = -1;
const RELEASE_NOW: i64 = 0;

#[derive(Clone)]
pub struct OllamaBackend {
    transport: Arc<dyn OllamaTransport>,
    keep_alive: Option<i64>,
}

impl OllamaBackend {
    pub fn new(transport: Arc<dyn OllamaTransport>) -> Self {
        Self {
            transport,
            keep_alive: Some(KEEP_LOADED),
        }
    }

    pub fn with_keep_alive(mut self, keep_alive: Option<i64>) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn default_http_transport(client: Client) -> OllamaHttpTransport {
        OllamaHttpTransport::new(client)
    }

    fn chat_request(
        &self,
        model: &LoadedModel,
        mut request: CompletionRequest,
        stream: bool,
    ) -> Result<OllamaChatRequest, BackendError> {
        if request.model.trim().is_empty() {
            request.model = model.model_id.clone();
        }
        request.validate()?;
        Ok(OllamaChatRequest::from_request(request, stream, self.keep_alive))
    }
}

impl InferenceBackend for OllamaBackend {
    fn id(&self) -> BackendId {
        BackendId::Ollama
    }

    fn probe_capability<'a>(&'a self) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            match self.transport.version().await {
                Ok(version) => !version.trim().is_empty(),
                Err(_) => false,
            }
        })
    }

    fn load<'a>(
        &'a self,
        model_id: &'a str,
        progress: ProgressSink,
    ) -> BoxFuture<'a, Result<LoadedModel, BackendError>> {
        Box::pin(async move {
            let mut statuses = self
                .transport
                .pull(model_id)
                .await
                .map_err(|err| err.during(BackendErrorKind::LoadFailure))?;

            while let Some(status) = statuses.next().await {
                let status = status.map_err(|err| err.during(BackendErrorKind::LoadFailure))?;
                if let Some(error) = status.error {
                    return Err(BackendError::load_failure(error));
                }

                let line = status.describe();
                if !line.trim().is_empty() {
                    progress(&line);
                }
            }

            progress(&format!("loading {model_id} into memory"));
            self.transport
                .warm(OllamaWarmRequest {
                    model: model_id.to_string(),
                    keep_alive: self.keep_alive,
                })
                .await
                .map_err(|err| err.during(BackendErrorKind::LoadFailure))?;

            Ok(LoadedModel::new(model_id).with_metadata("backend", BackendId::Ollama.to_string()))
        })
    }

    fn complete<'a>(
        &'a self,
        model: &'a LoadedModel,
        request: CompletionRequest,
    ) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(async move {
            let request = self.chat_request(model, request, false)?;
            let chunk = self
                .transport
                .chat(request)
                .await
                .map_err(|err| err.during(BackendErrorKind::Generation))?;

            if let Some(error) = chunk.error {
                return Err(BackendError::generation(error));
            }

            Ok(chunk.text().to_string())
        })
    }

    fn stream<'a>(
        &'a self,
        model: &'a LoadedModel,
        request: CompletionRequest,
    ) -> BoxFuture<'a, Result<BoxedPartialStream<'a>, BackendError>> {
        Box::pin(async move {
            let request = self.chat_request(model, request, true)?;
            let mut chunks = self
                .transport
                .chat_stream(request)
                .await
                .map_err(|err| err.during(BackendErrorKind::Generation))?;

            let deltas = try_stream! {
                let mut done = false;
                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk.map_err(|err| err.during(BackendErrorKind::Generation))?;
                    if let Some(error) = chunk.error.as_deref() {
                        Err::<(), BackendError>(BackendError::generation(error))?;
                    }

                    yield chunk.text().to_string();

                    if chunk.done {
                        done = true;
                        break;
                    }
                }

                if !done {
                    Err::<(), BackendError>(BackendError::generation(
                        "stream ended before the reply was complete",
                    ))?;
                }
            };

            let deltas: OllamaLineStream<'a, String> = Box::pin(deltas);
            Ok(Box::pin(accumulate_deltas(deltas)) as BoxedPartialStream<'a>)
        })
    }

    fn unload<'a>(&'a self, model: &'a LoadedModel) -> BoxFuture<'a, Result<(), BackendError>> {
        Box::pin(async move {
            self.transport
                .warm(OllamaWarmRequest {
                    model: model.model_id.clone(),
                    keep_alive: Some(RELEASE_NOW),
                })
                .await
        })
    }
}
