//! Per-surface session client: one user turn at a time over the shared registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use abackend::{BackendHandle, ChatMessage, CompletionRequest, Role};
use acommon::{DefaultTranslator, GenerationOptions, MessageId, Translator};
use asession::{ProgressCallback, SessionRegistry, SessionState, Subscription};
use futures_util::StreamExt;

use crate::text::{EMPTY_REPLY, GREETING_ID, TURN_FAILED, WELCOME};
use crate::{
    ChatError, ChatHooks, Conversation, ConversationPersistence, Message, NoopChatHooks,
};

pub const DEFAULT_NAMESPACE: &str = "ai_chat_history";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Sampling settings used when a client is built without explicit options.
pub fn default_generation_options() -> GenerationOptions {
    GenerationOptions::default()
        .with_temperature(DEFAULT_TEMPERATURE)
        .with_max_tokens(DEFAULT_MAX_TOKENS)
}

fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SessionClientBuilder {
    registry: SessionRegistry,
    persistence: Option<Arc<dyn ConversationPersistence>>,
    translator: Arc<dyn Translator>,
    options: GenerationOptions,
    namespace: String,
    hooks: Arc<dyn ChatHooks>,
    greeting: bool,
}

impl SessionClientBuilder {
    pub fn new(registry: SessionRegistry) -> Self {
        Self {
            registry,
            persistence: None,
            translator: Arc::new(DefaultTranslator),
            options: default_generation_options(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            hooks: Arc::new(NoopChatHooks),
            greeting: true,
        }
    }

    pub fn persistence(mut self, persistence: Arc<dyn ConversationPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn ChatHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn greeting(mut self, greeting: bool) -> Self {
        self.greeting = greeting;
        self
    }

    pub fn build(self) -> Result<SessionClient, ChatError> {
        self.options.check().map_err(ChatError::invalid_request)?;

        if self.namespace.trim().is_empty() {
            return Err(ChatError::invalid_request("namespace must not be empty"));
        }

        let client = SessionClient {
            registry: self.registry,
            conversation: Mutex::new(Conversation::new()),
            persistence: self.persistence,
            translator: self.translator,
            options: self.options.with_streaming(false),
            namespace: self.namespace,
            hooks: self.hooks,
            greeting: self.greeting,
            turn_active: AtomicBool::new(false),
        };
        client.seed(&mut lock_recovering(&client.conversation));
        Ok(client)
    }
}

/// Chat surface facade. Owns its conversation; shares the backend through the registry.
pub struct SessionClient {
    registry: SessionRegistry,
    conversation: Mutex<Conversation>,
    persistence: Option<Arc<dyn ConversationPersistence>>,
    translator: Arc<dyn Translator>,
    options: GenerationOptions,
    namespace: String,
    hooks: Arc<dyn ChatHooks>,
    greeting: bool,
    turn_active: AtomicBool,
}

impl SessionClient {
    pub fn builder(registry: SessionRegistry) -> SessionClientBuilder {
        SessionClientBuilder::new(registry)
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn options(&self) -> GenerationOptions {
        self.options
    }

    /// Starts or joins backend initialization.
    pub async fn connect(
        &self,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Arc<BackendHandle>, ChatError> {
        self.registry
            .ensure_ready(on_progress)
            .await
            .map_err(ChatError::from)
    }

    pub fn state(&self) -> SessionState {
        self.registry.current_state()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.registry.subscribe(listener)
    }

    pub fn is_generating(&self) -> bool {
        self.turn_active.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.conversation().snapshot()
    }

    pub fn len(&self) -> usize {
        self.conversation().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversation().is_empty()
    }

    /// Sends one turn and waits for the complete reply.
    pub async fn send(&self, user_text: &str) -> Result<String, ChatError> {
        self.send_turn(user_text, None).await
    }

    /// Sends one turn, relaying every cumulative partial to `on_partial`.
    pub async fn send_streaming<F>(&self, user_text: &str, on_partial: F) -> Result<String, ChatError>
    where
        F: Fn(&str) + Send + Sync,
    {
        self.send_turn(user_text, Some(&on_partial)).await
    }

    /// Runs one user turn against the full conversation history.
    ///
    /// On backend failure the assistant placeholder is removed, a failure notice is appended,
    /// and the user message is kept. Dropping the returned future removes the placeholder.
    pub async fn send_turn(
        &self,
        user_text: &str,
        on_partial: Option<&(dyn Fn(&str) + Send + Sync)>,
    ) -> Result<String, ChatError> {
        if user_text.trim().is_empty() {
            return Err(ChatError::invalid_request("message must not be empty"));
        }

        let handle = self.registry.handle().ok_or_else(|| {
            ChatError::not_ready(format!(
                "assistant is not ready ({})",
                self.registry.current_state()
            ))
        })?;

        let mut guard = TurnGuard::acquire(self)?;
        let started = Instant::now();
        self.hooks.on_turn_start(&self.namespace, on_partial.is_some());

        let (context, placeholder) = {
            let mut conversation = self.conversation();
            conversation.append(Message::user(user_text));
            let context = conversation.context();
            let placeholder = conversation.append(Message::placeholder());
            (context, placeholder)
        };
        guard.placeholder = Some(placeholder.clone());

        match self
            .generate(&handle, context, &placeholder, on_partial)
            .await
        {
            Ok(text) => {
                let reply = if text.trim().is_empty() {
                    self.translator.text(&EMPTY_REPLY)
                } else {
                    text
                };

                self.conversation()
                    .update_content(&placeholder, reply.clone(), false);
                guard.commit();
                self.persist().await;
                self.hooks.on_turn_success(
                    &self.namespace,
                    started.elapsed(),
                    reply.chars().count(),
                );
                Ok(reply)
            }
            Err(error) => {
                {
                    let mut conversation = self.conversation();
                    if conversation
                        .last()
                        .is_some_and(|message| message.id == placeholder)
                    {
                        conversation.rollback_last(Role::Assistant);
                    }
                    conversation.append(Message::notice(self.translator.text(&TURN_FAILED)));
                }
                guard.commit();
                self.persist().await;
                self.hooks
                    .on_turn_failure(&self.namespace, started.elapsed(), &error);
                Err(error)
            }
        }
    }

    /// Loads the persisted snapshot, or seeds a fresh thread when nothing is stored.
    ///
    /// Returns the number of messages in the thread afterwards.
    pub async fn restore(&self) -> Result<usize, ChatError> {
        let _guard = TurnGuard::acquire(self)?;
        let Some(persistence) = &self.persistence else {
            return Ok(self.len());
        };

        let stored = match persistence.load(&self.namespace).await {
            Ok(stored) => stored,
            Err(error) => {
                self.hooks.on_persistence_failure(&self.namespace, &error);
                return Err(error);
            }
        };

        let mut conversation = self.conversation();
        match stored {
            Some(messages) if !messages.is_empty() => conversation.replace_all(messages),
            _ => {
                conversation.clear();
                self.seed(&mut conversation);
            }
        }
        Ok(conversation.len())
    }

    /// Replaces the thread; the next turn replays `messages` in order.
    pub async fn replace_all(&self, messages: Vec<Message>) -> Result<(), ChatError> {
        let _guard = TurnGuard::acquire(self)?;
        self.conversation().replace_all(messages);
        self.persist().await;
        Ok(())
    }

    /// Clears the thread back to its greeting.
    pub async fn reset(&self) -> Result<(), ChatError> {
        let _guard = TurnGuard::acquire(self)?;
        {
            let mut conversation = self.conversation();
            conversation.clear();
            self.seed(&mut conversation);
        }
        self.persist().await;
        Ok(())
    }

    async fn generate(
        &self,
        handle: &BackendHandle,
        context: Vec<ChatMessage>,
        placeholder: &MessageId,
        on_partial: Option<&(dyn Fn(&str) + Send + Sync)>,
    ) -> Result<String, ChatError> {
        let request = CompletionRequest::builder(handle.model_id())
            .messages(context)
            .options(self.options.with_streaming(on_partial.is_some()))
            .build()?;

        let Some(on_partial) = on_partial else {
            return Ok(handle.complete(request).await?);
        };

        let mut partials = handle.stream(request).await?;
        let mut latest = String::new();
        while let Some(partial) = partials.next().await {
            let partial = partial?;
            if partial.len() < latest.len() {
                continue;
            }

            self.conversation()
                .update_content(placeholder, partial.clone(), true);
            on_partial(&partial);
            latest = partial;
        }

        Ok(latest)
    }

    async fn persist(&self) {
        let Some(persistence) = &self.persistence else {
            return;
        };

        let snapshot = self.snapshot();
        if let Err(error) = persistence.save(&self.namespace, snapshot).await {
            self.hooks.on_persistence_failure(&self.namespace, &error);
        }
    }

    fn seed(&self, conversation: &mut Conversation) {
        if self.greeting {
            conversation.append(
                Message::greeting(self.translator.text(&WELCOME)).with_id(GREETING_ID),
            );
        }
    }

    fn conversation(&self) -> MutexGuard<'_, Conversation> {
        lock_recovering(&self.conversation)
    }
}

/// Marks a turn as active; on drop clears the flag and removes an uncommitted placeholder.
struct TurnGuard<'a> {
    client: &'a SessionClient,
    placeholder: Option<MessageId>,
}

impl<'a> TurnGuard<'a> {
    fn acquire(client: &'a SessionClient) -> Result<Self, ChatError> {
        client
            .turn_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ChatError::turn_in_progress("a turn is already in flight on this conversation"))?;

        Ok(Self {
            client,
            placeholder: None,
        })
    }

    fn commit(&mut self) {
        self.placeholder = None;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if let Some(placeholder) = self.placeholder.take() {
            let mut conversation = self.client.conversation();
            if conversation
                .last()
                .is_some_and(|message| message.id == placeholder)
            {
                conversation.rollback_last(Role::Assistant);
            }
        }

        self.client.turn_active.store(false, Ordering::SeqCst);
    }
}
