//! Inference backend construction for facade consumers.

use std::sync::Arc;

use reqwest::Client;

use crate::{AssistantConfig, BackendError, InferenceBackend};

pub fn build_backend(config: &AssistantConfig) -> Result<Arc<dyn InferenceBackend>, BackendError> {
    let http = Client::builder()
        .connect_timeout(config.request_timeout)
        .build()
        .map_err(|err| BackendError::transport(err.to_string()))?;

    build_ollama_backend(http, &config.backend_host)
}

#[cfg(feature = "backend-ollama")]
fn build_ollama_backend(
    http: Client,
    host: &str,
) -> Result<Arc<dyn InferenceBackend>, BackendError> {
    use abackend::adapters::ollama::OllamaBackend;

    let transport = Arc::new(OllamaBackend::default_http_transport(http).with_host(host));
    Ok(Arc::new(OllamaBackend::new(transport)))
}

#[cfg(not(feature = "backend-ollama"))]
fn build_ollama_backend(
    _http: Client,
    _host: &str,
) -> Result<Arc<dyn InferenceBackend>, BackendError> {
    Err(BackendError::unsupported_environment(
        "backend-ollama feature is not enabled on angler",
    ))
}

#[cfg(all(test, feature = "backend-ollama"))]
mod tests {
    use crate::{AssistantConfig, BackendId};

    use super::build_backend;

    #[test]
    fn default_build_targets_ollama() {
        let config = AssistantConfig::default().with_backend_host("localhost:11999");
        let backend = build_backend(&config).expect("backend should build");
        assert_eq!(backend.id(), BackendId::Ollama);
    }
}
