//! Assistant configuration.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use angler::{AssistantConfig, MemoryBackendConfig};
//!
//! let config = AssistantConfig::new("llama3.2:1b")
//!     .with_storage(MemoryBackendConfig::InMemory)
//!     .with_request_timeout(Duration::from_secs(5))
//!     .with_greeting(false);
//!
//! assert_eq!(config.model_id, "llama3.2:1b");
//! assert!(config.validate().is_ok());
//! ```

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    ChatError, DEFAULT_NAMESPACE, GenerationOptions, MemoryBackendConfig,
    default_generation_options,
};

pub const DEFAULT_MODEL_ID: &str = "llama3.2:1b";
pub const DEFAULT_BACKEND_HOST: &str = "http://localhost:11434";

pub const MODEL_ENV: &str = "ANGLER_MODEL";
pub const HOST_ENV: &str = "OLLAMA_HOST";
pub const STORAGE_ENV: &str = "ANGLER_STORAGE_PATH";

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub model_id: String,
    pub backend_host: String,
    /// Bounds connecting to the runtime; pulls and streams are not cut short.
    pub request_timeout: Duration,
    pub generation: GenerationOptions,
    pub storage: MemoryBackendConfig,
    pub namespace: String,
    pub greeting: bool,
    pub observe: bool,
}

impl AssistantConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            backend_host: DEFAULT_BACKEND_HOST.to_string(),
            request_timeout: Duration::from_secs(30),
            generation: default_generation_options(),
            storage: MemoryBackendConfig::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            greeting: true,
            observe: true,
        }
    }

    /// Reads `ANGLER_MODEL`, `OLLAMA_HOST` and `ANGLER_STORAGE_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.to_string_lossy().trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::new(read(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()));
        if let Some(host) = read(HOST_ENV) {
            config.backend_host = normalize_host(&host);
        }
        if let Some(path) = read(STORAGE_ENV) {
            config.storage = MemoryBackendConfig::Sqlite {
                path: PathBuf::from(path),
            };
        }
        config
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_backend_host(mut self, host: impl Into<String>) -> Self {
        self.backend_host = normalize_host(&host.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_generation(mut self, generation: GenerationOptions) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_storage(mut self, storage: MemoryBackendConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_greeting(mut self, greeting: bool) -> Self {
        self.greeting = greeting;
        self
    }

    pub fn with_observe(mut self, observe: bool) -> Self {
        self.observe = observe;
        self
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        if self.model_id.trim().is_empty() {
            return Err(ChatError::invalid_request("model id must not be empty"));
        }
        if self.namespace.trim().is_empty() {
            return Err(ChatError::invalid_request("namespace must not be empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(ChatError::invalid_request(
                "request timeout must be greater than zero",
            ));
        }
        self.generation
            .check()
            .map_err(ChatError::invalid_request)
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_ID)
    }
}

/// `OLLAMA_HOST` is commonly set without a scheme, e.g. `0.0.0.0:11434`.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::{ChatErrorKind, MemoryBackendConfig};

    use super::{AssistantConfig, DEFAULT_BACKEND_HOST, DEFAULT_MODEL_ID};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let values = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), OsString::from(value)))
            .collect::<HashMap<_, _>>();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn lookup_without_variables_uses_defaults() {
        let config = AssistantConfig::from_lookup(lookup(&[]));

        assert_eq!(config.model_id, DEFAULT_MODEL_ID);
        assert_eq!(config.backend_host, DEFAULT_BACKEND_HOST);
        assert_eq!(config.namespace, "ai_chat_history");
        assert_eq!(config.generation.max_tokens, Some(512));
        assert!(config.greeting);
    }

    #[test]
    fn lookup_reads_model_host_and_storage_path() {
        let config = AssistantConfig::from_lookup(lookup(&[
            ("ANGLER_MODEL", "qwen2.5:0.5b"),
            ("OLLAMA_HOST", "127.0.0.1:11500/"),
            ("ANGLER_STORAGE_PATH", "/tmp/angler/history.sqlite3"),
        ]));

        assert_eq!(config.model_id, "qwen2.5:0.5b");
        assert_eq!(config.backend_host, "http://127.0.0.1:11500");
        assert_eq!(
            config.storage,
            MemoryBackendConfig::Sqlite {
                path: PathBuf::from("/tmp/angler/history.sqlite3")
            }
        );
    }

    #[test]
    fn blank_variables_are_ignored() {
        let config = AssistantConfig::from_lookup(lookup(&[("ANGLER_MODEL", "  ")]));
        assert_eq!(config.model_id, DEFAULT_MODEL_ID);
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let error = AssistantConfig::new(" ").validate().expect_err("blank model");
        assert_eq!(error.kind, ChatErrorKind::InvalidRequest);

        let error = AssistantConfig::default()
            .with_request_timeout(Duration::ZERO)
            .validate()
            .expect_err("zero timeout");
        assert_eq!(error.kind, ChatErrorKind::InvalidRequest);

        let mut config = AssistantConfig::default();
        config.generation.temperature = Some(3.0);
        assert!(config.validate().is_err());
    }
}
