//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use acommon::{GenerationOptions, MessageCatalog, MessageId, TextKey, Translator};
//!
//! let id = MessageId::from("msg-1");
//! let options = GenerationOptions::default().with_temperature(0.3).enable_streaming();
//!
//! const GREETING: TextKey = TextKey::new("chat.greeting", "Hello!");
//! let catalog = MessageCatalog::new().with_entry("chat.greeting", "Hola!");
//!
//! assert_eq!(id.as_str(), "msg-1");
//! assert!(options.stream);
//! assert_eq!(catalog.text(&GREETING), "Hola!");
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use acommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Shared metadata and identifier newtypes.
    //!
    //! ```rust
    //! use acommon::{MessageId, MetadataMap};
    //!
    //! let generated = MessageId::generate();
    //! let fixed = MessageId::new("welcome");
    //! let mut metadata = MetadataMap::new();
    //! metadata.insert("surface".to_string(), "chat-tab".to_string());
    //!
    //! assert_ne!(generated, fixed);
    //! assert_eq!(fixed.to_string(), "welcome");
    //! ```

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};

    pub type MetadataMap = HashMap<String, String>;

    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct MessageId(String);

    impl MessageId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn generate() -> Self {
            Self(uuid::Uuid::new_v4().to_string())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for MessageId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for MessageId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for MessageId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod model {
    //! Shared generation settings used by completion requests and chat clients.
    //!
    //! ```rust
    //! use acommon::GenerationOptions;
    //!
    //! let options = GenerationOptions::default()
    //!     .with_temperature(0.2)
    //!     .with_max_tokens(128)
    //!     .enable_streaming();
    //!
    //! assert_eq!(options.temperature, Some(0.2));
    //! assert_eq!(options.max_tokens, Some(128));
    //! assert!(options.stream);
    //! assert!(options.check().is_ok());
    //! ```

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct GenerationOptions {
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
        pub stream: bool,
    }

    impl GenerationOptions {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }

        pub fn with_streaming(mut self, stream: bool) -> Self {
            self.stream = stream;
            self
        }

        pub fn enable_streaming(self) -> Self {
            self.with_streaming(true)
        }

        /// Checks the sampling bounds shared by every backend.
        ///
        /// Returns a human-readable reason for the first violated bound.
        pub fn check(&self) -> Result<(), &'static str> {
            if let Some(max_tokens) = self.max_tokens
                && max_tokens == 0
            {
                return Err("max_tokens must be greater than zero");
            }

            if let Some(temperature) = self.temperature
                && !(0.0..=1.0).contains(&temperature)
            {
                return Err("temperature must be in the inclusive range 0.0..=1.0");
            }

            Ok(())
        }
    }
}

pub mod i18n {
    //! Localized text lookup with natural-language fallbacks.
    //!
    //! ```rust
    //! use acommon::{DefaultTranslator, TextKey, Translator};
    //!
    //! const RETRY: TextKey = TextKey::new("chat.retry", "Please try again.");
    //! assert_eq!(DefaultTranslator.text(&RETRY), "Please try again.");
    //! ```

    use std::collections::HashMap;

    /// A lookup key paired with the text used when no translation resolves.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextKey {
        pub key: &'static str,
        pub default: &'static str,
    }

    impl TextKey {
        pub const fn new(key: &'static str, default: &'static str) -> Self {
            Self { key, default }
        }
    }

    pub trait Translator: Send + Sync {
        fn lookup(&self, key: &str) -> Option<String>;

        fn translate(&self, key: &str, default: &str) -> String {
            self.lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        }

        fn text(&self, key: &TextKey) -> String {
            self.translate(key.key, key.default)
        }
    }

    #[derive(Debug, Default, Clone, Copy)]
    pub struct DefaultTranslator;

    impl Translator for DefaultTranslator {
        fn lookup(&self, _key: &str) -> Option<String> {
            None
        }
    }

    #[derive(Debug, Default, Clone)]
    pub struct MessageCatalog {
        entries: HashMap<String, String>,
    }

    impl MessageCatalog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
            self.entries.insert(key.into(), value.into())
        }

        pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
            self.insert(key, value);
            self
        }

        pub fn len(&self) -> usize {
            self.entries.len()
        }

        pub fn is_empty(&self) -> bool {
            self.entries.is_empty()
        }
    }

    impl Translator for MessageCatalog {
        fn lookup(&self, key: &str) -> Option<String> {
            self.entries.get(key).cloned()
        }
    }
}

pub use context::{MessageId, MetadataMap};
pub use future::BoxFuture;
pub use i18n::{DefaultTranslator, MessageCatalog, TextKey, Translator};
pub use model::GenerationOptions;

#[cfg(test)]
mod tests {
    use super::{DefaultTranslator, GenerationOptions, MessageCatalog, MessageId, TextKey, Translator};

    const NOTICE: TextKey = TextKey::new("chat.notice", "Something went wrong.");

    #[test]
    fn message_ids_round_trip_strings_and_generate_unique_values() {
        let fixed = MessageId::new("msg-1");
        assert_eq!(fixed.as_str(), "msg-1");
        assert_eq!(fixed.to_string(), "msg-1");
        assert_eq!(MessageId::from("msg-1".to_string()), fixed);

        let first = MessageId::generate();
        let second = MessageId::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn generation_options_builder_helpers_set_values() {
        let options = GenerationOptions::default()
            .with_temperature(0.7)
            .with_max_tokens(512)
            .enable_streaming();

        assert_eq!(options.temperature, Some(0.7));
        assert_eq!(options.max_tokens, Some(512));
        assert!(options.stream);
        assert!(options.check().is_ok());
    }

    #[test]
    fn generation_options_check_rejects_out_of_range_values() {
        let hot = GenerationOptions::default().with_temperature(1.5);
        assert!(hot.check().is_err());

        let negative = GenerationOptions::default().with_temperature(-0.1);
        assert!(negative.check().is_err());

        let empty = GenerationOptions::default().with_max_tokens(0);
        assert!(empty.check().is_err());

        let edges = GenerationOptions::default().with_temperature(1.0).with_max_tokens(1);
        assert!(edges.check().is_ok());
    }

    #[test]
    fn translators_fall_back_to_natural_language_default() {
        assert_eq!(DefaultTranslator.text(&NOTICE), "Something went wrong.");

        let catalog = MessageCatalog::new()
            .with_entry("chat.notice", "Algo salió mal.")
            .with_entry("chat.blank", "   ");

        assert_eq!(catalog.text(&NOTICE), "Algo salió mal.");
        assert_eq!(catalog.translate("chat.blank", "fallback"), "fallback");
        assert_eq!(catalog.translate("chat.missing", "fallback"), "fallback");
        assert_eq!(catalog.len(), 2);
    }
}
