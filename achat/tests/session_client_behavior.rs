use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use abackend::{
    BackendError, BackendId, BoxFuture, BoxedPartialStream, CompletionRequest, InferenceBackend,
    LoadedModel, ProgressSink, Role,
};
use achat::text::{EMPTY_REPLY, GREETING_ID, TURN_FAILED};
use achat::{
    ChatError, ChatErrorKind, ChatHooks, ConversationPersistence, InMemoryConversationPersistence,
    Message, MessageKind, SessionClient,
};
use acommon::{GenerationOptions, MessageCatalog};
use asession::SessionRegistry;
use futures_util::StreamExt;

#[derive(Default)]
struct ScriptedBackend {
    reply: String,
    deltas: Vec<&'static str>,
    fail_after: Option<usize>,
    fail_complete: bool,
    delay: Duration,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }

    fn record(&self, request: CompletionRequest) {
        self.requests.lock().expect("requests lock").push(request);
    }
}

impl InferenceBackend for ScriptedBackend {
    fn id(&self) -> BackendId {
        BackendId::Custom("scripted")
    }

    fn probe_capability<'a>(&'a self) -> BoxFuture<'a, bool> {
        Box::pin(async { true })
    }

    fn load<'a>(
        &'a self,
        model_id: &'a str,
        _progress: ProgressSink,
    ) -> BoxFuture<'a, Result<LoadedModel, BackendError>> {
        Box::pin(async move { Ok(LoadedModel::new(model_id)) })
    }

    fn complete<'a>(
        &'a self,
        _model: &'a LoadedModel,
        request: CompletionRequest,
    ) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(async move {
            self.record(request);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_complete {
                return Err(BackendError::generation("decoder crashed"));
            }
            Ok(self.reply.clone())
        })
    }

    fn stream<'a>(
        &'a self,
        _model: &'a LoadedModel,
        request: CompletionRequest,
    ) -> BoxFuture<'a, Result<BoxedPartialStream<'a>, BackendError>> {
        Box::pin(async move {
            self.record(request);
            let mut text = String::new();
            let mut items = Vec::new();
            for (index, delta) in self.deltas.iter().enumerate() {
                if self.fail_after == Some(index) {
                    items.push(Err(BackendError::generation("stream aborted")));
                    break;
                }
                text.push_str(delta);
                items.push(Ok(text.clone()));
            }

            let delay = self.delay;
            let stream = futures_util::stream::iter(items).then(move |item| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                item
            });
            Ok(Box::pin(stream) as BoxedPartialStream<'a>)
        })
    }

    fn unload<'a>(&'a self, _model: &'a LoadedModel) -> BoxFuture<'a, Result<(), BackendError>> {
        Box::pin(async { Ok(()) })
    }
}

async fn ready_registry(backend: Arc<ScriptedBackend>) -> SessionRegistry {
    let registry = SessionRegistry::new(backend, "tiny");
    registry.ensure_ready(None).await.expect("registry ready");
    registry
}

#[tokio::test]
async fn send_requires_ready_registry_and_non_empty_text() {
    let backend = Arc::new(ScriptedBackend::replying("hi"));
    let registry = SessionRegistry::new(backend, "tiny");
    let client = SessionClient::builder(registry).build().expect("client");

    let err = client.send("   ").await.expect_err("empty text");
    assert_eq!(err.kind, ChatErrorKind::InvalidRequest);

    let err = client.send("hello").await.expect_err("not ready");
    assert_eq!(err.kind, ChatErrorKind::NotReady);
    assert_eq!(client.len(), 1);
}

#[tokio::test]
async fn fresh_client_is_seeded_with_greeting_that_is_not_replayed() {
    let backend = Arc::new(ScriptedBackend::replying("Try dawn."));
    let registry = ready_registry(backend.clone()).await;
    let client = SessionClient::builder(registry).build().expect("client");

    let greeting = client.snapshot().remove(0);
    assert_eq!(greeting.id.as_str(), GREETING_ID);
    assert_eq!(greeting.kind, MessageKind::Greeting);

    let reply = client.send("When do bass bite?").await.expect("reply");
    assert_eq!(reply, "Try dawn.");
    assert_eq!(client.len(), 3);

    let requests = backend.requests.lock().expect("requests lock");
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].role, Role::User);
    assert_eq!(requests[0].options.temperature, Some(0.7));
    assert_eq!(requests[0].options.max_tokens, Some(512));
    assert!(!requests[0].options.stream);
}

#[tokio::test]
async fn user_text_is_stored_and_replayed_verbatim() {
    let backend = Arc::new(ScriptedBackend::replying("Try the riffles."));
    let registry = ready_registry(backend.clone()).await;
    let client = SessionClient::builder(registry).build().expect("client");

    let text = "  Where are the trout?\n    - near the bridge\n";
    client.send(text).await.expect("reply");

    let stored = client.snapshot();
    assert_eq!(stored[1].content, text);
    let requests = backend.requests.lock().expect("requests lock");
    assert_eq!(requests[0].messages[0].content, text);
}

#[tokio::test]
async fn empty_reply_is_replaced_with_translated_fallback() {
    let backend = Arc::new(ScriptedBackend::replying("  "));
    let registry = ready_registry(backend).await;
    let client = SessionClient::builder(registry)
        .greeting(false)
        .build()
        .expect("client");

    let reply = client.send("Anything?").await.expect("reply");

    assert_eq!(reply, EMPTY_REPLY.default);
    let last = client.snapshot().pop().expect("assistant");
    assert_eq!(last.content, EMPTY_REPLY.default);
    assert!(!last.is_streaming);
}

#[tokio::test]
async fn failed_turn_keeps_user_message_and_appends_localized_notice() {
    let backend = Arc::new(ScriptedBackend {
        fail_complete: true,
        ..ScriptedBackend::default()
    });
    let registry = ready_registry(backend).await;
    let catalog = MessageCatalog::new().with_entry(TURN_FAILED.key, "Lo siento, inténtalo de nuevo.");
    let client = SessionClient::builder(registry)
        .greeting(false)
        .translator(Arc::new(catalog))
        .build()
        .expect("client");

    let err = client.send("Hola").await.expect_err("generation fails");

    assert_eq!(err.kind, ChatErrorKind::Generation);
    let snapshot = client.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].role, Role::User);
    assert_eq!(snapshot[1].kind, MessageKind::Notice);
    assert_eq!(snapshot[1].content, "Lo siento, inténtalo de nuevo.");
    assert!(!client.is_generating());
}

#[tokio::test]
async fn streaming_partials_grow_and_finalize_the_reply() {
    let backend = Arc::new(ScriptedBackend {
        deltas: vec!["Use ", "a silver ", "spoon."],
        ..ScriptedBackend::default()
    });
    let registry = ready_registry(backend.clone()).await;
    let client = SessionClient::builder(registry)
        .greeting(false)
        .build()
        .expect("client");

    let partials = Arc::new(Mutex::new(Vec::new()));
    let sink = partials.clone();
    let reply = client
        .send_streaming("Lure for mackerel?", move |partial| {
            sink.lock().expect("partials lock").push(partial.to_string());
        })
        .await
        .expect("reply");

    assert_eq!(reply, "Use a silver spoon.");
    let partials = partials.lock().expect("partials lock").clone();
    assert_eq!(partials.len(), 3);
    assert!(partials.windows(2).all(|pair| pair[0].len() < pair[1].len()));
    assert!(client.snapshot().iter().all(|message| !message.is_streaming));
    assert!(backend.requests.lock().expect("requests lock")[0].options.stream);
}

#[tokio::test]
async fn second_turn_while_first_in_flight_is_rejected() {
    let backend = Arc::new(ScriptedBackend {
        reply: "slow answer".to_string(),
        delay: Duration::from_millis(40),
        ..ScriptedBackend::default()
    });
    let registry = ready_registry(backend).await;
    let client = SessionClient::builder(registry)
        .greeting(false)
        .build()
        .expect("client");

    let (first, second) = tokio::join!(client.send("first"), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        client.send("second").await
    });

    assert_eq!(first.expect("first"), "slow answer");
    assert_eq!(
        second.expect_err("second rejected").kind,
        ChatErrorKind::TurnInProgress
    );
    assert_eq!(client.len(), 2);
}

#[tokio::test]
async fn dropping_a_streaming_turn_removes_the_placeholder() {
    let backend = Arc::new(ScriptedBackend {
        deltas: vec!["one", " two", " three"],
        delay: Duration::from_millis(30),
        ..ScriptedBackend::default()
    });
    let registry = ready_registry(backend).await;
    let client = SessionClient::builder(registry)
        .greeting(false)
        .build()
        .expect("client");

    let abandoned = tokio::time::timeout(
        Duration::from_millis(45),
        client.send_streaming("long question", |_| {}),
    )
    .await;
    assert!(abandoned.is_err());

    let snapshot = client.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].role, Role::User);
    assert!(!client.is_generating());
}

struct FailingPersistence;

impl ConversationPersistence for FailingPersistence {
    fn load<'a>(
        &'a self,
        _namespace: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<Message>>, ChatError>> {
        Box::pin(async { Err(ChatError::store("disk unavailable")) })
    }

    fn save<'a>(
        &'a self,
        _namespace: &'a str,
        _messages: Vec<Message>,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async { Err(ChatError::store("disk full")) })
    }

    fn clear<'a>(&'a self, _namespace: &'a str) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async { Err(ChatError::store("disk full")) })
    }
}

#[derive(Default)]
struct PersistenceFailures {
    count: AtomicUsize,
}

impl ChatHooks for PersistenceFailures {
    fn on_persistence_failure(&self, _namespace: &str, _error: &ChatError) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn persistence_failures_never_fail_a_turn() {
    let backend = Arc::new(ScriptedBackend::replying("fine"));
    let registry = ready_registry(backend).await;
    let hooks = Arc::new(PersistenceFailures::default());
    let client = SessionClient::builder(registry)
        .persistence(Arc::new(FailingPersistence))
        .hooks(hooks.clone())
        .build()
        .expect("client");

    assert_eq!(client.send("hello").await.expect("reply"), "fine");
    assert_eq!(hooks.count.load(Ordering::SeqCst), 1);

    let err = client.restore().await.expect_err("load fails");
    assert_eq!(err.kind, ChatErrorKind::Store);
    assert_eq!(client.len(), 3);
}

#[tokio::test]
async fn restore_and_reset_round_trip_through_persistence() {
    let backend = Arc::new(ScriptedBackend::replying("Use corn."));
    let registry = ready_registry(backend.clone()).await;
    let persistence = Arc::new(InMemoryConversationPersistence::new());

    let first = SessionClient::builder(registry.clone())
        .persistence(persistence.clone())
        .build()
        .expect("first client");
    assert_eq!(first.restore().await.expect("restore empty"), 1);
    first.send("Carp bait?").await.expect("reply");

    let second = SessionClient::builder(registry)
        .persistence(persistence.clone())
        .build()
        .expect("second client");
    assert_eq!(second.restore().await.expect("restore"), 3);
    assert_eq!(second.snapshot()[2].content, "Use corn.");

    second.reset().await.expect("reset");
    assert_eq!(second.len(), 1);
    let stored = persistence
        .load(second.namespace())
        .await
        .expect("load")
        .expect("stored");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id.as_str(), GREETING_ID);
}

#[tokio::test]
async fn builder_rejects_invalid_generation_options() {
    let backend = Arc::new(ScriptedBackend::replying("x"));
    let registry = SessionRegistry::new(backend, "tiny");

    let err = SessionClient::builder(registry.clone())
        .options(GenerationOptions::default().with_temperature(2.0))
        .build()
        .err()
        .expect("invalid temperature");
    assert_eq!(err.kind, ChatErrorKind::InvalidRequest);

    let err = SessionClient::builder(registry)
        .namespace(" ")
        .build()
        .err()
        .expect("blank namespace");
    assert_eq!(err.kind, ChatErrorKind::InvalidRequest);
}
