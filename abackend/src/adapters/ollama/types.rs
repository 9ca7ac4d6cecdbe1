use serde::{Deserialize, Serialize};

use crate::{ChatMessage, CompletionRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    pub content: String,
}

impl From<ChatMessage> for OllamaMessage {
    fn from(message: ChatMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    pub options: OllamaOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<i64>,
}

impl OllamaChatRequest {
    pub fn from_request(request: CompletionRequest, stream: bool, keep_alive: Option<i64>) -> Self {
        Self {
            model: request.model,
            messages: request
                .messages
                .into_iter()
                .map(OllamaMessage::from)
                .collect(),
            stream,
            options: OllamaOptions {
                temperature: request.options.temperature,
                num_predict: request.options.max_tokens,
            },
            keep_alive,
        }
    }
}

/// A `/api/generate` call without a prompt, used to map weights in or out of memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OllamaWarmRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct OllamaChatChunk {
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl OllamaChatChunk {
    pub fn text(&self) -> &str {
        self.message
            .as_ref()
            .map(|message| message.content.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct OllamaPullStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl OllamaPullStatus {
    /// Renders the status line shown to users while the model downloads.
    pub fn describe(&self) -> String {
        match (self.completed, self.total) {
            (Some(completed), Some(total)) if total > 0 => {
                let percent = (completed.min(total) * 100) / total;
                format!("{}: {percent}%", self.status)
            }
            _ => self.status.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub(crate) struct OllamaVersion {
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub(crate) struct OllamaErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{OllamaChatChunk, OllamaChatRequest, OllamaPullStatus};
    use crate::{ChatMessage, CompletionRequest, Role};

    #[test]
    fn pull_status_reports_percentage_when_totals_known() {
        let status: OllamaPullStatus = serde_json::from_str(
            r#"{"status":"pulling 6a0746a1ec1a","digest":"sha256:6a07","total":200,"completed":84}"#,
        )
        .expect("status json");

        assert_eq!(status.describe(), "pulling 6a0746a1ec1a: 42%");
    }

    #[test]
    fn pull_status_falls_back_to_status_text() {
        let status: OllamaPullStatus =
            serde_json::from_str(r#"{"status":"verifying sha256 digest"}"#).expect("status json");
        assert_eq!(status.describe(), "verifying sha256 digest");
    }

    #[test]
    fn chat_request_maps_options_to_ollama_names() {
        let request = CompletionRequest::new("llama3.2:1b", vec![ChatMessage::new(Role::User, "hi")])
            .with_temperature(0.7)
            .with_max_tokens(512);

        let json = serde_json::to_value(OllamaChatRequest::from_request(request, true, Some(-1)))
            .expect("serialize");

        assert_eq!(json["model"], "llama3.2:1b");
        assert_eq!(json["stream"], true);
        assert_eq!(json["options"]["num_predict"], 512);
        assert_eq!(json["keep_alive"], -1);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn chat_chunk_tolerates_missing_message() {
        let chunk: OllamaChatChunk = serde_json::from_str(r#"{"done":true}"#).expect("chunk");
        assert!(chunk.done);
        assert_eq!(chunk.text(), "");
    }
}
