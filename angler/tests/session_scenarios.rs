use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use angler::{
    AssistantConfig, AssistantRuntime, BackendError, BackendId, BoxFuture, BoxedPartialStream,
    ChatErrorKind, CompletionRequest, ConversationPersistence, InferenceBackend, LoadedModel,
    MemoryBackendConfig, MemoryConversationPersistence, Message, MessageKind, ProgressSink, Role,
    SessionErrorKind, SessionState, SqliteKeyValueBackend,
};
use futures_util::StreamExt;

#[derive(Default)]
struct FieldBackend {
    incapable: bool,
    load_delay: Duration,
    reply: String,
    deltas: Vec<&'static str>,
    fail_stream_at: Option<usize>,
    probes: AtomicUsize,
    loads: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FieldBackend {
    fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }

    fn recorded(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl InferenceBackend for FieldBackend {
    fn id(&self) -> BackendId {
        BackendId::Custom("field")
    }

    fn probe_capability<'a>(&'a self) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.probes.fetch_add(1, Ordering::SeqCst);
            !self.incapable
        })
    }

    fn load<'a>(
        &'a self,
        model_id: &'a str,
        progress: ProgressSink,
    ) -> BoxFuture<'a, Result<LoadedModel, BackendError>> {
        Box::pin(async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            progress("pulling manifest");
            if !self.load_delay.is_zero() {
                tokio::time::sleep(self.load_delay).await;
            }
            progress("pulling weights: 100%");
            Ok(LoadedModel::new(model_id))
        })
    }

    fn complete<'a>(
        &'a self,
        _model: &'a LoadedModel,
        request: CompletionRequest,
    ) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(async move {
            self.requests.lock().expect("requests lock").push(request);
            Ok(self.reply.clone())
        })
    }

    fn stream<'a>(
        &'a self,
        _model: &'a LoadedModel,
        request: CompletionRequest,
    ) -> BoxFuture<'a, Result<BoxedPartialStream<'a>, BackendError>> {
        Box::pin(async move {
            self.requests.lock().expect("requests lock").push(request);
            let mut text = String::new();
            let mut items = Vec::new();
            for (index, delta) in self.deltas.iter().enumerate() {
                if self.fail_stream_at == Some(index) {
                    items.push(Err(BackendError::generation("accelerator reset")));
                    break;
                }
                text.push_str(delta);
                items.push(Ok(text.clone()));
            }

            let stream = futures_util::stream::iter(items).then(|item| async move {
                tokio::task::yield_now().await;
                item
            });
            Ok(Box::pin(stream) as BoxedPartialStream<'a>)
        })
    }

    fn unload<'a>(&'a self, _model: &'a LoadedModel) -> BoxFuture<'a, Result<(), BackendError>> {
        Box::pin(async { Ok(()) })
    }
}

fn runtime_for(backend: Arc<FieldBackend>, greeting: bool) -> AssistantRuntime {
    AssistantRuntime::builder(
        AssistantConfig::new("llama3.2:1b")
            .with_storage(MemoryBackendConfig::InMemory)
            .with_greeting(greeting),
    )
    .backend(backend)
    .build()
    .expect("runtime should build")
}

#[tokio::test]
async fn missing_local_runtime_is_reported_as_unsupported() {
    let backend = Arc::new(FieldBackend {
        incapable: true,
        ..FieldBackend::default()
    });
    let runtime = runtime_for(Arc::clone(&backend), true);
    let states = Arc::new(Mutex::new(vec![runtime.registry().current_state()]));
    let sink = Arc::clone(&states);
    let _subscription = runtime
        .registry()
        .subscribe(move |state| sink.lock().expect("states lock").push(state.clone()));

    let error = runtime.preload(None).await.expect_err("probe should fail");

    assert_eq!(error.kind, SessionErrorKind::UnsupportedEnvironment);
    assert_eq!(backend.loads.load(Ordering::SeqCst), 0);
    let states = states.lock().expect("states lock").clone();
    assert_eq!(states.len(), 3);
    assert_eq!(states[0], SessionState::Uninitialized);
    assert_eq!(states[1], SessionState::Probing);
    assert!(states[2].is_failed());

    let client = runtime.open_client().await.expect("client");
    let error = client
        .send("Anything biting?")
        .await
        .expect_err("not ready");
    assert_eq!(error.kind, ChatErrorKind::NotReady);
}

#[tokio::test]
async fn two_surfaces_connecting_together_share_one_load() {
    let backend = Arc::new(FieldBackend {
        load_delay: Duration::from_millis(40),
        ..FieldBackend::replying("ok")
    });
    let runtime = runtime_for(Arc::clone(&backend), true);
    let chat = runtime.client().expect("chat client");
    let assistant = runtime.client().expect("assistant client");

    let (first, second) = tokio::join!(chat.connect(None), assistant.connect(None));

    let first = first.expect("first ready");
    let second = second.expect("second ready");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
    assert_eq!(backend.probes.load(Ordering::SeqCst), 1);
    assert!(chat.state().is_ready());
}

#[tokio::test]
async fn streaming_turn_grows_then_finalizes() {
    let backend = Arc::new(FieldBackend {
        deltas: vec!["Use ", "small ", "feathers ", "near the surface."],
        ..FieldBackend::default()
    });
    let runtime = runtime_for(Arc::clone(&backend), true);
    runtime.preload(None).await.expect("preload");
    let client = runtime.open_client().await.expect("client");
    let before = client.len();

    let partials = Mutex::new(Vec::new());
    let reply = client
        .send_streaming("How do I catch mackerel?", |partial| {
            partials
                .lock()
                .expect("partials lock")
                .push(partial.len());
        })
        .await
        .expect("streamed reply");

    assert_eq!(reply, "Use small feathers near the surface.");
    let lengths = partials.lock().expect("partials lock").clone();
    assert!(!lengths.is_empty());
    assert!(lengths.windows(2).all(|pair| pair[0] < pair[1]));

    let snapshot = client.snapshot();
    assert_eq!(snapshot.len(), before + 2);
    assert_eq!(snapshot[before].role, Role::User);
    let last = snapshot.last().expect("assistant reply");
    assert_eq!(last.role, Role::Assistant);
    assert!(!last.is_streaming);
    assert_eq!(last.content, reply);
}

#[tokio::test]
async fn failed_stream_keeps_user_message_and_appends_notice() {
    let backend = Arc::new(FieldBackend {
        deltas: vec!["Try ", "jigging ", "at "],
        fail_stream_at: Some(2),
        ..FieldBackend::default()
    });
    let runtime = runtime_for(Arc::clone(&backend), true);
    runtime.preload(None).await.expect("preload");
    let client = runtime.open_client().await.expect("client");
    let before = client.len();

    let error = client
        .send_streaming("How do I catch mackerel?", |_| {})
        .await
        .expect_err("stream should fail");
    assert_eq!(error.kind, ChatErrorKind::Generation);

    let snapshot = client.snapshot();
    assert_eq!(snapshot.len(), before + 2);
    assert_eq!(snapshot[before].role, Role::User);
    assert_eq!(snapshot[before].content, "How do I catch mackerel?");
    let notice = &snapshot[before + 1];
    assert_eq!(notice.kind, MessageKind::Notice);
    assert!(!notice.is_streaming);
    assert!(!notice.content.contains("accelerator reset"));
    assert!(!client.is_generating());
}

#[tokio::test]
async fn restored_history_is_replayed_in_order() {
    let backend = Arc::new(FieldBackend::replying("Low tide, slow retrieve."));
    let persistence = Arc::new(MemoryConversationPersistence::new(Arc::new(
        SqliteKeyValueBackend::new_in_memory().expect("sqlite"),
    )));

    let history = (0..10)
        .map(|index| {
            if index % 2 == 0 {
                Message::user(format!("question {index}"))
            } else {
                Message::assistant(format!("answer {index}"))
            }
        })
        .collect::<Vec<_>>();
    persistence
        .save("ai_chat_history", history.clone())
        .await
        .expect("seed history");

    let runtime = AssistantRuntime::builder(
        AssistantConfig::new("llama3.2:1b").with_greeting(false),
    )
    .backend(Arc::clone(&backend) as Arc<dyn InferenceBackend>)
    .persistence(persistence.clone())
    .build()
    .expect("runtime");
    runtime.preload(None).await.expect("preload");

    let client = runtime.open_client().await.expect("client");
    assert_eq!(client.len(), 10);

    client.send("And at dusk?").await.expect("reply");

    let requests = backend.recorded();
    assert_eq!(requests.len(), 1);
    let context = &requests[0].messages;
    assert_eq!(context.len(), 11);
    for (sent, original) in context.iter().zip(&history) {
        assert_eq!(sent.role, original.role);
        assert_eq!(sent.content, original.content);
    }
    assert_eq!(context[10].content, "And at dusk?");

    let stored = persistence
        .load("ai_chat_history")
        .await
        .expect("load")
        .expect("snapshot present");
    assert_eq!(stored.len(), 12);
}
