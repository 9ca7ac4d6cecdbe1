//! Runtime wiring: one shared session registry, many chat surfaces.

use std::sync::Arc;

use crate::{
    AssistantConfig, BackendHandle, ChatError, ChatHooks, ConversationPersistence,
    DefaultTranslator, GenerationOptions, InferenceBackend, MemoryConversationPersistence,
    NoopChatHooks, NoopRegistryHooks, ObservabilityHooks, ProgressCallback, RegistryHooks,
    SafeChatHooks, SafeRegistryHooks, SessionClient, SessionError, SessionRegistry, Translator,
    build_backend,
};

/// Process-wide assistant state.
///
/// Cloning shares the registry, so a preload started from one clone is joined by every
/// client created from another.
#[derive(Clone)]
pub struct AssistantRuntime {
    registry: SessionRegistry,
    persistence: Arc<dyn ConversationPersistence>,
    translator: Arc<dyn Translator>,
    chat_hooks: Arc<dyn ChatHooks>,
    generation: GenerationOptions,
    namespace: String,
    greeting: bool,
}

pub struct AssistantRuntimeBuilder {
    config: AssistantConfig,
    backend: Option<Arc<dyn InferenceBackend>>,
    persistence: Option<Arc<dyn ConversationPersistence>>,
    translator: Arc<dyn Translator>,
}

impl AssistantRuntimeBuilder {
    pub fn new(config: AssistantConfig) -> Self {
        Self {
            config,
            backend: None,
            persistence: None,
            translator: Arc::new(DefaultTranslator),
        }
    }

    /// Overrides the backend built from the config.
    pub fn backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Overrides the storage selected by the config.
    pub fn persistence(mut self, persistence: Arc<dyn ConversationPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn build(self) -> Result<AssistantRuntime, ChatError> {
        let config = self.config;
        config.validate()?;

        let backend = match self.backend {
            Some(backend) => backend,
            None => build_backend(&config)?,
        };
        let persistence = match self.persistence {
            Some(persistence) => persistence,
            None => Arc::new(MemoryConversationPersistence::from_config(
                config.storage.clone(),
            )?),
        };

        let (registry_hooks, chat_hooks): (Arc<dyn RegistryHooks>, Arc<dyn ChatHooks>) =
            if config.observe {
                (
                    Arc::new(SafeRegistryHooks::new(ObservabilityHooks::new())),
                    Arc::new(SafeChatHooks::new(ObservabilityHooks::new())),
                )
            } else {
                (Arc::new(NoopRegistryHooks), Arc::new(NoopChatHooks))
            };

        let registry = SessionRegistry::builder(backend, config.model_id)
            .hooks(registry_hooks)
            .build();

        Ok(AssistantRuntime {
            registry,
            persistence,
            translator: self.translator,
            chat_hooks,
            generation: config.generation,
            namespace: config.namespace,
            greeting: config.greeting,
        })
    }
}

impl AssistantRuntime {
    pub fn builder(config: AssistantConfig) -> AssistantRuntimeBuilder {
        AssistantRuntimeBuilder::new(config)
    }

    pub fn from_config(config: AssistantConfig) -> Result<Self, ChatError> {
        Self::builder(config).build()
    }

    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_config(AssistantConfig::from_env())
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn persistence(&self) -> Arc<dyn ConversationPersistence> {
        Arc::clone(&self.persistence)
    }

    /// Starts loading the model before any chat surface exists.
    pub async fn preload(
        &self,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Arc<BackendHandle>, SessionError> {
        self.registry.ensure_ready(on_progress).await
    }

    pub async fn unload(&self) -> Result<(), SessionError> {
        self.registry.unload().await
    }

    /// A fresh client with its own conversation, not yet restored.
    pub fn client(&self) -> Result<SessionClient, ChatError> {
        SessionClient::builder(self.registry.clone())
            .persistence(Arc::clone(&self.persistence))
            .translator(Arc::clone(&self.translator))
            .options(self.generation)
            .namespace(self.namespace.clone())
            .hooks(Arc::clone(&self.chat_hooks))
            .greeting(self.greeting)
            .build()
    }

    /// A client with the persisted conversation loaded.
    pub async fn open_client(&self) -> Result<SessionClient, ChatError> {
        let client = self.client()?;
        client.restore().await?;
        Ok(client)
    }
}
