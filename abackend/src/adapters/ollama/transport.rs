use std::pin::Pin;

use acommon::BoxFuture;
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::OLLAMA_HOST_URL;
use super::types::{
    OllamaChatChunk, OllamaChatRequest, OllamaErrorBody, OllamaPullStatus, OllamaVersion,
    OllamaWarmRequest,
};
use crate::BackendError;

/// Newline-delimited JSON records decoded from a streaming Ollama endpoint.
pub type OllamaLineStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T, BackendError>> + Send + 'a>>;

pub trait OllamaTransport: Send + Sync {
    fn version<'a>(&'a self) -> BoxFuture<'a, Result<String, BackendError>>;

    fn pull<'a>(
        &'a self,
        model: &'a str,
    ) -> BoxFuture<'a, Result<OllamaLineStream<'a, OllamaPullStatus>, BackendError>>;

    fn warm<'a>(&'a self, request: OllamaWarmRequest) -> BoxFuture<'a, Result<(), BackendError>>;

    fn chat<'a>(
        &'a self,
        request: OllamaChatRequest,
    ) -> BoxFuture<'a, Result<OllamaChatChunk, BackendError>>;

    fn chat_stream<'a>(
        &'a self,
        request: OllamaChatRequest,
    ) -> BoxFuture<'a, Result<OllamaLineStream<'a, OllamaChatChunk>, BackendError>>;
}

#[derive(Debug, Clone)]
pub struct OllamaHttpTransport {
    client: Client,
    host: String,
}

impl OllamaHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            host: OLLAMA_HOST_URL.to_string(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.host.trim_end_matches('/'), path)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response, BackendError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(parse_error(response).await);
        }

        Ok(response)
    }
}

impl OllamaTransport for OllamaHttpTransport {
    fn version<'a>(&'a self) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.endpoint("version"))
                .send()
                .await
                .map_err(map_reqwest_error)?;

            if !response.status().is_success() {
                return Err(parse_error(response).await);
            }

            let parsed: OllamaVersion = response
                .json()
                .await
                .map_err(|err| BackendError::transport(err.to_string()))?;

            Ok(parsed.version)
        })
    }

    fn pull<'a>(
        &'a self,
        model: &'a str,
    ) -> BoxFuture<'a, Result<OllamaLineStream<'a, OllamaPullStatus>, BackendError>> {
        Box::pin(async move {
            let body = serde_json::json!({ "model": model, "stream": true });
            let response = self.post("pull", &body).await?;
            Ok(ndjson_lines(response))
        })
    }

    fn warm<'a>(&'a self, request: OllamaWarmRequest) -> BoxFuture<'a, Result<(), BackendError>> {
        Box::pin(async move {
            let response = self.post("generate", &request).await?;
            let body = response
                .text()
                .await
                .map_err(|err| BackendError::transport(err.to_string()))?;

            match extract_error_message(&body) {
                Some(message) => Err(BackendError::transport(message)),
                None => Ok(()),
            }
        })
    }

    fn chat<'a>(
        &'a self,
        mut request: OllamaChatRequest,
    ) -> BoxFuture<'a, Result<OllamaChatChunk, BackendError>> {
        Box::pin(async move {
            request.stream = false;
            let response = self.post("chat", &request).await?;
            response
                .json::<OllamaChatChunk>()
                .await
                .map_err(|err| BackendError::transport(err.to_string()))
        })
    }

    fn chat_stream<'a>(
        &'a self,
        mut request: OllamaChatRequest,
    ) -> BoxFuture<'a, Result<OllamaLineStream<'a, OllamaChatChunk>, BackendError>> {
        Box::pin(async move {
            request.stream = true;
            let response = self.post("chat", &request).await?;
            Ok(ndjson_lines(response))
        })
    }
}

fn ndjson_lines<'a, T>(response: Response) -> OllamaLineStream<'a, T>
where
    T: DeserializeOwned + Send + 'a,
{
    let stream = try_stream! {
        let mut chunks = response.bytes_stream();
        let mut line_buffer: Vec<u8> = Vec::new();

        while let Some(item) = chunks.next().await {
            let bytes = item.map_err(map_reqwest_error)?;
            line_buffer.extend_from_slice(&bytes);

            while let Some(newline_index) = line_buffer.iter().position(|byte| *byte == b'\n') {
                let line = line_buffer.drain(..=newline_index).collect::<Vec<u8>>();
                if let Some(record) = decode_line::<T>(&line)? {
                    yield record;
                }
            }
        }

        if let Some(record) = decode_line::<T>(&line_buffer)? {
            yield record;
        }
    };

    Box::pin(stream)
}

fn decode_line<T: DeserializeOwned>(line: &[u8]) -> Result<Option<T>, BackendError> {
    let text = std::str::from_utf8(line).map_err(|err| BackendError::transport(err.to_string()))?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(text)
        .map(Some)
        .map_err(|err| BackendError::transport(format!("malformed ndjson line: {err}")))
}

fn map_reqwest_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::timeout(err.to_string())
    } else {
        BackendError::transport(err.to_string())
    }
}

async fn parse_error(response: Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body)
        .unwrap_or_else(|| format!("Ollama request failed with status {status}"));

    match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => BackendError::invalid_request(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendError::timeout(message),
        _ => BackendError::transport(message),
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<OllamaErrorBody>(body.trim())
        .ok()
        .and_then(|parsed| parsed.error)
        .filter(|message| !message.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{decode_line, extract_error_message};
    use crate::BackendErrorKind;
    use crate::adapters::ollama::OllamaChatChunk;

    #[test]
    fn decode_line_skips_blank_lines() {
        let decoded = decode_line::<OllamaChatChunk>(b"  \n").expect("blank line");
        assert!(decoded.is_none());
    }

    #[test]
    fn decode_line_reports_malformed_json_as_transport() {
        let err = decode_line::<OllamaChatChunk>(b"{not json}\n").expect_err("malformed");
        assert_eq!(err.kind, BackendErrorKind::Transport);
    }

    #[test]
    fn extract_error_message_reads_error_field() {
        assert_eq!(
            extract_error_message(r#"{"error":"model not found"}"#).as_deref(),
            Some("model not found")
        );
        assert_eq!(extract_error_message("plain text"), None);
    }
}
