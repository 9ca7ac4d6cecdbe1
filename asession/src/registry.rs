//! Process-wide holder of the single backend handle.
//!
//! A [`SessionRegistry`] owns at most one [`BackendHandle`] and at most one initialization
//! attempt. The attempt runs as its own task on a tokio runtime, so it settles even when every
//! caller stops waiting. Concurrent `ensure_ready` callers join it through one shared future and
//! all observe its outcome.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use abackend::InferenceBackend;
//! # async fn demo(backend: Arc<dyn InferenceBackend>) {
//! use asession::SessionRegistry;
//!
//! let registry = SessionRegistry::builder(backend, "llama3.2:1b").build();
//! let _subscription = registry.subscribe(|state| println!("session is {state}"));
//! let progress: asession::ProgressCallback = Arc::new(|line: &str| println!("{line}"));
//!
//! match registry.ensure_ready(Some(progress)).await {
//!     Ok(handle) => println!("ready with {}", handle.model_id()),
//!     Err(error) => println!("unavailable: {error}"),
//! }
//! # }
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Debug, Formatter};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use abackend::{BackendErrorKind, BackendHandle, BackendId, InferenceBackend, ProgressSink};
use acommon::BoxFuture;
use futures_util::FutureExt;
use futures_util::future::Shared;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::{NoopRegistryHooks, RegistryHooks, SessionError, SessionState};

/// Final progress line delivered to an attempt's callbacks after a successful load.
pub const LOAD_COMPLETE_MESSAGE: &str = "Model loaded successfully!";

pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type StateListener = Arc<dyn Fn(&SessionState) + Send + Sync>;

type AttemptOutcome = Result<Arc<BackendHandle>, SessionError>;
type SharedAttempt = Shared<BoxFuture<'static, AttemptOutcome>>;
type SharedUnload = Shared<BoxFuture<'static, Result<(), SessionError>>>;

fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct ProgressFanout {
    callbacks: Mutex<Vec<ProgressCallback>>,
}

impl ProgressFanout {
    fn attach(&self, callback: ProgressCallback) {
        lock_recovering(&self.callbacks).push(callback);
    }

    fn emit(&self, text: &str) {
        let callbacks = lock_recovering(&self.callbacks).clone();
        for callback in callbacks {
            let _ = catch_unwind(AssertUnwindSafe(|| callback(text)));
        }
    }
}

struct InFlight {
    attempt: u64,
    outcome: SharedAttempt,
    progress: Arc<ProgressFanout>,
}

struct Transition {
    previous: SessionState,
    current: SessionState,
}

#[derive(Default)]
struct RegistryCore {
    state: SessionState,
    handle: Option<Arc<BackendHandle>>,
    in_flight: Option<InFlight>,
    unloading: Option<SharedUnload>,
    last_failure: Option<SessionError>,
    listeners: BTreeMap<u64, StateListener>,
    pending: VecDeque<Transition>,
    dispatching: bool,
    attempts: u64,
    next_listener: u64,
}

impl RegistryCore {
    fn queue(&mut self, next: SessionState) {
        let previous = std::mem::replace(&mut self.state, next.clone());
        self.pending.push_back(Transition {
            previous,
            current: next,
        });
    }
}

struct RegistryInner {
    backend: Arc<dyn InferenceBackend>,
    model_id: String,
    hooks: Arc<dyn RegistryHooks>,
    runtime: Option<Handle>,
    core: Mutex<RegistryCore>,
}

impl RegistryInner {
    fn lock_core(&self) -> MutexGuard<'_, RegistryCore> {
        lock_recovering(&self.core)
    }

    fn runtime(&self) -> Result<Handle, SessionError> {
        match &self.runtime {
            Some(runtime) => Ok(runtime.clone()),
            None => Handle::try_current().map_err(|_| {
                SessionError::internal("no tokio runtime is available to drive the backend")
            }),
        }
    }

    /// Applies `update` and records the state change under one lock, then delivers it.
    fn transition(&self, next: SessionState, update: impl FnOnce(&mut RegistryCore)) {
        {
            let mut core = self.lock_core();
            update(&mut core);
            core.queue(next);
        }
        self.dispatch();
    }

    /// Delivers queued transitions in order. Only one caller drains at a time; a transition
    /// queued from inside a listener is delivered by the active drainer after the current one.
    fn dispatch(&self) {
        {
            let mut core = self.lock_core();
            if core.dispatching {
                return;
            }
            core.dispatching = true;
        }

        loop {
            let (transition, listeners) = {
                let mut core = self.lock_core();
                match core.pending.pop_front() {
                    Some(transition) => {
                        let listeners = core.listeners.values().cloned().collect::<Vec<_>>();
                        (transition, listeners)
                    }
                    None => {
                        core.dispatching = false;
                        return;
                    }
                }
            };

            let _ = catch_unwind(AssertUnwindSafe(|| {
                self.hooks
                    .on_state_change(&transition.previous, &transition.current)
            }));
            for listener in listeners {
                let _ = catch_unwind(AssertUnwindSafe(|| listener(&transition.current)));
            }
        }
    }
}

/// Shared owner of the backend lifecycle. Clones refer to the same registry.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

pub struct SessionRegistryBuilder {
    backend: Arc<dyn InferenceBackend>,
    model_id: String,
    hooks: Arc<dyn RegistryHooks>,
    runtime: Option<Handle>,
}

impl SessionRegistryBuilder {
    pub fn new(backend: Arc<dyn InferenceBackend>, model_id: impl Into<String>) -> Self {
        Self {
            backend,
            model_id: model_id.into(),
            hooks: Arc::new(NoopRegistryHooks),
            runtime: None,
        }
    }

    pub fn model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn RegistryHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Runtime that drives initialization and unload tasks. Defaults to the runtime of the
    /// calling task.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> SessionRegistry {
        SessionRegistry {
            inner: Arc::new(RegistryInner {
                backend: self.backend,
                model_id: self.model_id,
                hooks: self.hooks,
                runtime: self.runtime,
                core: Mutex::new(RegistryCore::default()),
            }),
        }
    }
}

impl SessionRegistry {
    pub fn builder(
        backend: Arc<dyn InferenceBackend>,
        model_id: impl Into<String>,
    ) -> SessionRegistryBuilder {
        SessionRegistryBuilder::new(backend, model_id)
    }

    pub fn new(backend: Arc<dyn InferenceBackend>, model_id: impl Into<String>) -> Self {
        Self::builder(backend, model_id).build()
    }

    pub fn model_id(&self) -> &str {
        &self.inner.model_id
    }

    pub fn backend_id(&self) -> BackendId {
        self.inner.backend.id()
    }

    pub fn current_state(&self) -> SessionState {
        self.inner.lock_core().state.clone()
    }

    /// The most recent initialization failure, kept until the next attempt resolves.
    pub fn last_failure(&self) -> Option<SessionError> {
        self.inner.lock_core().last_failure.clone()
    }

    pub fn handle(&self) -> Option<Arc<BackendHandle>> {
        self.inner.lock_core().handle.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock_core().handle.is_some()
    }

    /// Number of initialization attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.inner.lock_core().attempts
    }

    /// Registers `listener` for every later state transition, in order.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let id = {
            let mut core = self.inner.lock_core();
            core.next_listener += 1;
            let id = core.next_listener;
            core.listeners.insert(id, Arc::new(listener));
            id
        };

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock_core().listeners.len()
    }

    /// Returns the loaded handle, starting or joining the single initialization attempt.
    ///
    /// `on_progress` receives human-readable load status for the attempt this call starts or
    /// joins. A failed state is retried from probing. While an unload is still releasing the
    /// previous model, the call waits for it first and returns its error if it fails.
    pub async fn ensure_ready(
        &self,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Arc<BackendHandle>, SessionError> {
        let mut on_progress = on_progress;
        loop {
            let step = {
                let mut core = self.inner.lock_core();
                if let Some(handle) = core.handle.as_ref() {
                    return Ok(Arc::clone(handle));
                }

                if let Some(unloading) = core.unloading.as_ref() {
                    ReadyStep::AwaitUnload(unloading.clone())
                } else if let Some(in_flight) = core.in_flight.as_ref() {
                    if let Some(callback) = on_progress.take() {
                        in_flight.progress.attach(callback);
                    }
                    ReadyStep::Join(in_flight.attempt, in_flight.outcome.clone())
                } else {
                    let runtime = self.inner.runtime()?;
                    core.attempts += 1;
                    let attempt = core.attempts;
                    let progress = Arc::new(ProgressFanout::default());
                    if let Some(callback) = on_progress.take() {
                        progress.attach(callback);
                    }

                    let (sender, receiver) = oneshot::channel();
                    let waiter: BoxFuture<'static, AttemptOutcome> = Box::pin(async move {
                        receiver.await.unwrap_or_else(|_| {
                            Err(SessionError::internal("initialization task was cancelled"))
                        })
                    });
                    let outcome = waiter.shared();
                    core.in_flight = Some(InFlight {
                        attempt,
                        outcome: outcome.clone(),
                        progress: Arc::clone(&progress),
                    });

                    let task = drive_attempt(
                        Arc::downgrade(&self.inner),
                        Arc::clone(&self.inner.backend),
                        self.inner.model_id.clone(),
                        attempt,
                        progress,
                        sender,
                    );
                    ReadyStep::Start(attempt, outcome, runtime, Box::pin(task))
                }
            };

            match step {
                ReadyStep::AwaitUnload(unloading) => unloading.await?,
                ReadyStep::Join(attempt, outcome) => {
                    self.inner.hooks.on_attempt_joined(attempt);
                    return outcome.await;
                }
                ReadyStep::Start(attempt, outcome, runtime, task) => {
                    self.inner
                        .hooks
                        .on_attempt_start(attempt, &self.inner.model_id);
                    runtime.spawn(task);
                    return outcome.await;
                }
            }
        }
    }

    /// Releases the loaded model and returns to `Uninitialized`.
    ///
    /// Rejected with `Busy` while an initialization attempt is running. A no-op when nothing is
    /// loaded. The backend release runs as its own task; until it resolves, `ensure_ready`
    /// waits instead of loading a second copy. A failed release moves the session to `Failed`.
    pub async fn unload(&self) -> Result<(), SessionError> {
        let (outcome, release) = {
            let mut core = self.inner.lock_core();
            if let Some(in_flight) = core.in_flight.as_ref() {
                return Err(SessionError::busy(format!(
                    "initialization attempt {} is still running",
                    in_flight.attempt
                )));
            }

            if let Some(unloading) = core.unloading.as_ref() {
                (unloading.clone(), None)
            } else {
                let Some(handle) = core.handle.clone() else {
                    return Ok(());
                };
                let runtime = self.inner.runtime()?;

                let (sender, receiver) = oneshot::channel();
                let waiter: BoxFuture<'static, Result<(), SessionError>> = Box::pin(async move {
                    receiver.await.unwrap_or_else(|_| {
                        Err(SessionError::internal("unload task was cancelled"))
                    })
                });
                let outcome = waiter.shared();
                core.handle = None;
                core.unloading = Some(outcome.clone());
                core.queue(SessionState::Uninitialized);
                (outcome, Some((runtime, handle, sender)))
            }
        };

        if let Some((runtime, handle, sender)) = release {
            self.inner.dispatch();
            self.inner.hooks.on_unload(handle.model_id());
            runtime.spawn(drive_unload(Arc::downgrade(&self.inner), handle, sender));
        }

        outcome.await
    }
}

enum ReadyStep {
    AwaitUnload(SharedUnload),
    Join(u64, SharedAttempt),
    Start(u64, SharedAttempt, Handle, BoxFuture<'static, ()>),
}

impl Debug for SessionRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let core = self.inner.lock_core();
        f.debug_struct("SessionRegistry")
            .field("backend", &self.inner.backend.id())
            .field("model_id", &self.inner.model_id)
            .field("state", &core.state)
            .field("attempts", &core.attempts)
            .field("unloading", &core.unloading.is_some())
            .finish()
    }
}

async fn drive_attempt(
    registry: Weak<RegistryInner>,
    backend: Arc<dyn InferenceBackend>,
    model_id: String,
    attempt: u64,
    progress: Arc<ProgressFanout>,
    sender: oneshot::Sender<AttemptOutcome>,
) {
    let started = Instant::now();
    let run = run_attempt(registry.clone(), backend, model_id, attempt, progress, started);
    let outcome = match AssertUnwindSafe(run).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(_) => fail_attempt(
            &registry,
            attempt,
            SessionError::internal("backend panicked while loading"),
            started,
        ),
    };
    let _ = sender.send(outcome);
}

async fn run_attempt(
    registry: Weak<RegistryInner>,
    backend: Arc<dyn InferenceBackend>,
    model_id: String,
    attempt: u64,
    progress: Arc<ProgressFanout>,
    started: Instant,
) -> AttemptOutcome {
    with_registry(&registry, |inner| {
        inner.transition(SessionState::Probing, |_| {})
    })?;

    if !backend.probe_capability().await {
        let error = SessionError::unsupported_environment(format!(
            "backend '{}' reports no local inference support",
            backend.id()
        ));
        return fail_attempt(&registry, attempt, error, started);
    }

    with_registry(&registry, |inner| {
        inner.transition(
            SessionState::Loading {
                progress: String::new(),
            },
            |_| {},
        )
    })?;

    let sink: ProgressSink = {
        let registry = registry.clone();
        let progress = Arc::clone(&progress);
        Arc::new(move |line: &str| {
            if let Some(inner) = registry.upgrade() {
                inner.transition(
                    SessionState::Loading {
                        progress: line.to_string(),
                    },
                    |_| {},
                );
            }
            progress.emit(line);
        })
    };

    match backend.load(&model_id, sink).await {
        Ok(model) => {
            let handle = Arc::new(BackendHandle::new(Arc::clone(&backend), model));
            if let Some(inner) = registry.upgrade() {
                inner.transition(SessionState::Ready, |core| {
                    core.handle = Some(Arc::clone(&handle));
                    core.in_flight = None;
                    core.last_failure = None;
                });
                inner
                    .hooks
                    .on_attempt_success(attempt, &model_id, started.elapsed());
            }
            progress.emit(LOAD_COMPLETE_MESSAGE);
            Ok(handle)
        }
        Err(err) => {
            let error = match err.kind {
                BackendErrorKind::UnsupportedEnvironment => {
                    SessionError::unsupported_environment(err.message)
                }
                _ => SessionError::load_failure(err.message),
            };
            fail_attempt(&registry, attempt, error, started)
        }
    }
}

async fn drive_unload(
    registry: Weak<RegistryInner>,
    handle: Arc<BackendHandle>,
    sender: oneshot::Sender<Result<(), SessionError>>,
) {
    let result = match AssertUnwindSafe(handle.unload()).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(match err.kind {
            BackendErrorKind::HandleReleased => SessionError::handle_released(err.message),
            _ => SessionError::internal(err.to_string()),
        }),
        Err(_) => Err(SessionError::internal("backend panicked while unloading")),
    };

    if let Some(inner) = registry.upgrade() {
        match &result {
            Ok(()) => inner.lock_core().unloading = None,
            Err(error) => inner.transition(
                SessionState::Failed {
                    reason: error.message.clone(),
                },
                |core| {
                    core.unloading = None;
                    core.last_failure = Some(error.clone());
                },
            ),
        }
    }
    let _ = sender.send(result);
}

fn with_registry(
    registry: &Weak<RegistryInner>,
    action: impl FnOnce(&RegistryInner),
) -> Result<(), SessionError> {
    let inner = registry
        .upgrade()
        .ok_or_else(|| SessionError::internal("session registry was dropped"))?;
    action(&inner);
    Ok(())
}

fn fail_attempt(
    registry: &Weak<RegistryInner>,
    attempt: u64,
    error: SessionError,
    started: Instant,
) -> AttemptOutcome {
    if let Some(inner) = registry.upgrade() {
        inner.transition(
            SessionState::Failed {
                reason: error.message.clone(),
            },
            |core| {
                core.in_flight = None;
                core.last_failure = Some(error.clone());
            },
        );
        inner
            .hooks
            .on_attempt_failure(attempt, &error, started.elapsed());
    }

    Err(error)
}

/// Keeps a state listener registered until dropped or [`Subscription::unsubscribe`] is called.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<RegistryInner>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Leaves the listener registered for the lifetime of the registry.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Some(inner) = self.registry.upgrade() {
            inner.lock_core().listeners.remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
