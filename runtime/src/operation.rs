//! The per-request state machine.
//!
//! An [`Operation`] wraps one conceptual request with observable lifecycle
//! state and a trigger surface. Each trigger starts an attempt; attempts are
//! filtered by the debounce policy, tagged with a monotonically increasing
//! ordinal, and only the attempt whose ordinal is still current when its
//! response arrives may settle the state. Failed attempts can schedule
//! automatic retries with a ticking countdown, and successful payloads can be
//! written through the client's cache capability.

use crate::cache;
use crate::client::Client;
use crate::debounce::DebounceGate;
use crate::options::{Behavior, DebounceMode, OperationOptions};
use crate::retry;
use crate::state::{OperationState, StateSnapshot};
use futures::future::BoxFuture;
use reqflow_core::request::{Method, RequestOptions};
use reqflow_core::source::ValueSource;
use reqflow_core::OperationError;
use serde_json::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What an action future resolves to.
///
/// `Ok(None)` covers every silent outcome: the trigger was debounced away,
/// the user declined the confirm dialog, the attempt was aborted or went
/// stale, or it failed without `throw_on_failure`.
pub type ActionResult<T> = Result<Option<T>, OperationError>;

/// Outcome of one attempt, before action-level settlement.
enum Attempt<T> {
    Data(T),
    Failed(OperationError),
    Aborted,
    Stale,
}

/// Observable state machine around one conceptual request.
///
/// Created through [`Client::operation`]. Cloning shares the same state and
/// in-flight attempts.
pub struct Operation<T, P = ()> {
    inner: Arc<Inner<T, P>>,
}

struct Inner<T, P> {
    client: Arc<Client>,
    behavior: Behavior,
    // Aliases rewrite the method in place, so the request fields live behind
    // a lock shared by every attempt.
    request: Mutex<RequestOptions<P>>,
    options: OperationOptions<T, P>,
    state: OperationState<T>,
    // Staleness checks key off this counter, not the public request_times
    // cell: a reset zeroes request_times, and a cancelled attempt's ordinal
    // must not collide with the fresh attempt's first one.
    generation: AtomicU64,
    initial_payload: Mutex<Option<Arc<P>>>,
    last_payload: Mutex<Option<Arc<P>>>,
    current_cancel: Mutex<Option<CancellationToken>>,
    loading_timer: Mutex<Option<JoinHandle<()>>>,
    retry_timer: Mutex<Option<JoinHandle<()>>>,
    immediate_task: Mutex<Option<JoinHandle<()>>>,
    debounce: DebounceGate,
}

fn lock<'a, G>(mutex: &'a Mutex<G>) -> std::sync::MutexGuard<'a, G> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T, P> Operation<T, P>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
    P: Send + Sync + 'static,
{
    pub(crate) fn create(client: Arc<Client>, mut options: OperationOptions<T, P>) -> Self {
        let behavior = options.behavior(client.defaults());
        let request = Mutex::new(std::mem::take(&mut options.request));
        let state = OperationState::new(options.initial_value.clone());
        let debounce = DebounceGate::new(behavior.debounce_time);
        let immediate = behavior.immediate;

        let inner = Arc::new(Inner {
            client,
            behavior,
            request,
            options,
            state,
            generation: AtomicU64::new(0),
            initial_payload: Mutex::new(None),
            last_payload: Mutex::new(None),
            current_cancel: Mutex::new(None),
            loading_timer: Mutex::new(None),
            retry_timer: Mutex::new(None),
            immediate_task: Mutex::new(None),
            debounce,
        });

        if immediate {
            let task_inner = Arc::clone(&inner);
            let task = tokio::spawn(async move {
                if let Err(error) = task_inner.action(None).await {
                    tracing::debug!(%error, "immediate attempt failed");
                }
            });
            *lock(&inner.immediate_task) = Some(task);
        }

        Self { inner }
    }

    /// The observable lifecycle state.
    #[must_use]
    pub fn state(&self) -> &OperationState<T> {
        &self.inner.state
    }

    /// A point-in-time copy of the lifecycle state.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot<T> {
        self.inner.state.snapshot()
    }

    /// Trigger an attempt with an optional action payload.
    ///
    /// Resolves once the attempt settles, or immediately when the trigger is
    /// filtered out.
    ///
    /// # Errors
    ///
    /// Only with `throw_on_failure`: the settled error of a failed winning
    /// attempt.
    pub async fn action(&self, payload: Option<P>) -> ActionResult<T> {
        self.inner.action(payload.map(Arc::new)).await
    }

    /// Re-run with the first action's payload, keeping the current data until
    /// the refresh settles.
    ///
    /// # Errors
    ///
    /// See [`Operation::action`].
    pub async fn refresh(&self) -> ActionResult<T> {
        let inner = &self.inner;
        if inner.state.refreshing.get() {
            tracing::debug!("refresh already in flight, ignoring trigger");
            return Ok(None);
        }
        inner.state.refreshing.set(true);
        let payload = lock(&inner.initial_payload).clone();
        let outcome = inner.run(payload).await;
        inner.settle(outcome)
    }

    /// Manually retry after a failure, reusing the last payload.
    ///
    /// Keeps counting `retry_times` past the automatic budget, and cancels
    /// any pending automatic retry countdown.
    ///
    /// # Errors
    ///
    /// See [`Operation::action`].
    pub async fn retry(&self) -> ActionResult<T> {
        let inner = &self.inner;
        if inner.state.error.with(Option::is_none) {
            tracing::warn!("retry triggered without a prior error, ignoring");
            return Ok(None);
        }
        if inner.state.retrying.get() {
            tracing::debug!("retry already in flight, ignoring trigger");
            return Ok(None);
        }
        inner.cancel_retry_schedule();
        // Inside the automatic budget the countdown scheduler does the
        // counting; manual retries only count once it is spent or unset.
        let budget = inner.behavior.auto_retry_times;
        if budget == 0 || inner.state.retry_times.get() >= budget {
            inner.state.retry_times.update(|times| *times += 1);
        }
        metrics::counter!("operation.retries").increment(1);
        inner.state.retrying.set(true);
        let payload = lock(&inner.last_payload).clone();
        let outcome = inner.run(payload).await;
        inner.settle(outcome)
    }

    /// Cancel the active attempt and any pending automatic retry.
    pub fn abort(&self) {
        self.inner.abort();
    }

    /// Abort, zero the state back to creation values, and trigger a fresh
    /// attempt with `payload`.
    ///
    /// # Errors
    ///
    /// See [`Operation::action`].
    pub async fn reset_action(&self, payload: Option<P>) -> ActionResult<T> {
        let inner = &self.inner;
        inner.abort();
        inner.debounce.cancel();
        // The aborted attempt's ordinal stays stale against the private
        // generation counter, which survives the public reset.
        inner.state.reset(inner.options.initial_value.clone());
        *lock(&inner.initial_payload) = None;
        *lock(&inner.last_payload) = None;
        inner.action(payload.map(Arc::new)).await
    }

    /// Drop the cached payload for `payload`'s cache key, if any.
    pub fn delete_cache(&self, payload: Option<&P>) {
        let inner = &self.inner;
        if let (Some(store), Some(key)) = (
            inner.client.cache.as_ref(),
            cache::resolve_key(inner.options.cache_key.as_ref(), payload),
        ) {
            store.delete(&key);
        }
    }

    /// Trigger with the method rewritten to GET, optionally replacing the
    /// query parameters.
    ///
    /// # Errors
    ///
    /// See [`Operation::action`].
    pub async fn get(&self, params: Option<Value>) -> ActionResult<T> {
        self.inner.alias_action(Method::Get, params).await
    }

    /// Trigger with the method rewritten to HEAD.
    ///
    /// # Errors
    ///
    /// See [`Operation::action`].
    pub async fn head(&self, params: Option<Value>) -> ActionResult<T> {
        self.inner.alias_action(Method::Head, params).await
    }

    /// Trigger with the method rewritten to OPTIONS.
    ///
    /// # Errors
    ///
    /// See [`Operation::action`].
    pub async fn options(&self, params: Option<Value>) -> ActionResult<T> {
        self.inner.alias_action(Method::Options, params).await
    }

    /// Trigger with the method rewritten to DELETE.
    ///
    /// # Errors
    ///
    /// See [`Operation::action`].
    pub async fn delete(&self, params: Option<Value>) -> ActionResult<T> {
        self.inner.alias_action(Method::Delete, params).await
    }

    /// Trigger with the method rewritten to POST, optionally replacing the
    /// body payload.
    ///
    /// # Errors
    ///
    /// See [`Operation::action`].
    pub async fn post(&self, data: Option<Value>) -> ActionResult<T> {
        self.inner.alias_action(Method::Post, data).await
    }

    /// Trigger with the method rewritten to PUT.
    ///
    /// # Errors
    ///
    /// See [`Operation::action`].
    pub async fn put(&self, data: Option<Value>) -> ActionResult<T> {
        self.inner.alias_action(Method::Put, data).await
    }

    /// Trigger with the method rewritten to PATCH.
    ///
    /// # Errors
    ///
    /// See [`Operation::action`].
    pub async fn patch(&self, data: Option<Value>) -> ActionResult<T> {
        self.inner.alias_action(Method::Patch, data).await
    }
}

impl<T, P> Clone for Operation<T, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, P> std::fmt::Debug for Operation<T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("request_times", &self.inner.state.request_times.get())
            .field("pending", &self.inner.state.pending.get())
            .finish_non_exhaustive()
    }
}

impl<T, P> Inner<T, P>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
    P: Send + Sync + 'static,
{
    /// Rewrite the method (and the query/body field for the new method) on
    /// the shared request options, then trigger.
    async fn alias_action(self: &Arc<Self>, method: Method, value: Option<Value>) -> ActionResult<T> {
        {
            let mut request = lock(&self.request);
            request.method = method;
            if let Some(value) = value {
                if method.has_body() {
                    request.data = Some(ValueSource::Literal(value));
                } else {
                    request.params = Some(ValueSource::Literal(value));
                }
            }
        }
        self.action(None).await
    }

    async fn action(self: &Arc<Self>, payload: Option<Arc<P>>) -> ActionResult<T> {
        if self.is_gated() {
            tracing::debug!("trigger filtered out by debounce or in-flight retry/refresh");
            return Ok(None);
        }

        {
            let mut initial = lock(&self.initial_payload);
            if initial.is_none() {
                *initial = payload.clone();
            }
        }
        *lock(&self.last_payload) = payload.clone();

        // A fresh user trigger starts a new retry history.
        self.cancel_retry_schedule();
        self.state.retry_times.set(0);

        if !self.confirmed(payload.as_deref()).await {
            tracing::debug!("confirm dialog declined, action dropped");
            return Ok(None);
        }

        match self.behavior.debounce_mode {
            DebounceMode::FirstPass | DebounceMode::None => {
                let outcome = self.run(payload).await;
                self.settle(outcome)
            }
            DebounceMode::LastPass => {
                let (tx, rx) = oneshot::channel();
                let inner = Arc::clone(self);
                self.debounce.schedule(Box::new(move || {
                    tokio::spawn(async move {
                        let outcome = inner.run(payload).await;
                        let _ = tx.send(inner.settle(outcome));
                    });
                }));
                // A dropped sender means a later trigger superseded this one.
                rx.await.unwrap_or(Ok(None))
            }
        }
    }

    /// Allocate the next attempt ordinal and bump the public counter.
    fn next_ordinal(&self) -> u64 {
        self.state.request_times.update(|times| *times += 1);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `ordinal` still identifies the most recently started attempt.
    fn is_current(&self, ordinal: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ordinal
    }

    fn is_gated(&self) -> bool {
        (self.state.pending.get() && self.behavior.debounce_mode == DebounceMode::FirstPass)
            || self.state.retrying.get()
            || self.state.refreshing.get()
            || self.state.retry_countdown.get() > 0
    }

    async fn confirmed(&self, payload: Option<&P>) -> bool {
        let Some(overlay) = &self.options.confirm_overlay else {
            return true;
        };
        let spec = overlay.resolve(payload);
        match self.client.overlay_implement() {
            Some(implement) => implement.confirm(spec).await,
            None => {
                tracing::warn!("confirm overlay configured but no overlay implementation is set");
                true
            }
        }
    }

    /// One attempt, start to settlement. Callers set `refreshing`/`retrying`
    /// beforehand; the flags are cleared here on finalize.
    async fn run(self: &Arc<Self>, payload: Option<Arc<P>>) -> Attempt<T> {
        self.state.begin_attempt();
        self.arm_loading_timer(payload.clone());

        let key = cache::resolve_key(self.options.cache_key.as_ref(), payload.as_deref());
        if key.is_some() && self.client.cache.is_none() {
            let error =
                OperationError::Config("cache key configured without a cache store".into());
            tracing::warn!(%error, "degrading to no caching");
            if let Some(report) = &self.client.error_report {
                report.report(&error);
            }
        }
        if let (Some(store), Some(key)) = (self.client.cache.as_ref(), key.as_deref()) {
            if let Some(value) = cache::read::<T>(store.as_ref(), key) {
                tracing::debug!(key, "settling from cache");
                self.succeed(&value, payload.as_deref(), None);
                self.finish();
                return Attempt::Data(value);
            }
        }

        let ordinal = self.next_ordinal();
        let token = CancellationToken::new();
        *lock(&self.current_cancel) = Some(token.clone());

        metrics::counter!("operation.attempts").increment(1);
        let future = self.attempt_future(payload.as_deref(), token.clone());

        let outcome = tokio::select! {
            () = token.cancelled() => {
                if self.is_current(ordinal) {
                    metrics::counter!("operation.aborts").increment(1);
                    self.state.aborted.set(true);
                    self.finish();
                }
                return Attempt::Aborted;
            }
            outcome = future => outcome,
        };

        if !self.is_current(ordinal) {
            tracing::debug!(ordinal, "discarding superseded response");
            return Attempt::Stale;
        }

        match outcome {
            Ok(value) => {
                metrics::counter!("operation.successes").increment(1);
                self.state.retry_times.set(0);
                self.succeed(&value, payload.as_deref(), key.as_deref());
                self.finish();
                Attempt::Data(value)
            }
            Err(error) if error.is_aborted() => {
                self.state.aborted.set(true);
                self.finish();
                Attempt::Aborted
            }
            Err(error) => {
                metrics::counter!("operation.failures").increment(1);
                tracing::warn!(%error, "attempt failed");
                self.fail(&error, payload.as_deref());
                self.schedule_auto_retry();
                self.finish();
                Attempt::Failed(error)
            }
        }
    }

    fn attempt_future(
        self: &Arc<Self>,
        payload: Option<&P>,
        token: CancellationToken,
    ) -> BoxFuture<'static, Result<T, OperationError>> {
        if let Some(promise) = &self.options.promise {
            return promise(payload, token);
        }
        let base = self.client.base_descriptor();
        if lock(&self.request).url.is_none() && base.is_none() {
            return Box::pin(async {
                Err(OperationError::Config(
                    "operation has neither a url nor a promise".into(),
                ))
            });
        }
        let descriptor = lock(&self.request).resolve(base.as_ref(), payload);
        let client = Arc::clone(&self.client);
        Box::pin(async move {
            tracing::debug!(url = %descriptor.url, method = %descriptor.method, "dispatching request");
            let raw = client.transport.send(descriptor.clone(), token).await;
            let value = client.settle_raw(raw, &descriptor)?;
            serde_json::from_value(value).map_err(|error| OperationError::Decode(error.to_string()))
        })
    }

    fn arm_loading_timer(self: &Arc<Self>, payload: Option<Arc<P>>) {
        let weak = Arc::downgrade(self);
        let delay = self.behavior.loading_delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else { return };
            if !inner.state.pending.get() {
                return;
            }
            inner.state.loading.set(true);
            let spec = inner
                .options
                .loading_overlay
                .as_ref()
                .and_then(|overlay| overlay.resolve(payload.as_deref()));
            if let (Some(spec), Some(implement)) = (spec, inner.client.overlay_implement()) {
                implement.loading_open(spec);
            }
        });
        if let Some(previous) = lock(&self.loading_timer).replace(timer) {
            previous.abort();
        }
    }

    fn succeed(&self, value: &T, payload: Option<&P>, cache_key: Option<&str>) {
        match &self.options.on_data {
            Some(merge) => merge(&self.state.data, value.clone(), payload),
            None if self.behavior.shallow_observe => {
                self.state
                    .data
                    .mutate_silent(|data| *data = Some(value.clone()));
            }
            None => self.state.data.set(Some(value.clone())),
        }
        self.state.success.set(true);
        self.state.error.set(None);

        if let Some(on_success) = &self.options.on_success {
            on_success(value, payload);
        }
        if let Some(overlay) = &self.options.success_overlay {
            if let Some(implement) = self.client.overlay_implement() {
                implement.success(overlay.resolve(payload, Some(value)));
            }
        }
        if let (Some(store), Some(key)) = (self.client.cache.as_ref(), cache_key) {
            cache::write(store.as_ref(), key, value);
        }
    }

    fn fail(&self, error: &OperationError, payload: Option<&P>) {
        self.state.error.set(Some(error.clone()));
        if let Some(on_error) = &self.options.on_error {
            on_error(error, payload);
        }
        if let Some(overlay) = &self.options.error_overlay {
            if let Some(implement) = self.client.overlay_implement() {
                implement.error(overlay.resolve(payload, Some(error)));
            }
        }
        if let Some(report) = &self.client.error_report {
            report.report(error);
        }
    }

    /// Shared settlement tail for every winning outcome.
    fn finish(&self) {
        if let Some(timer) = lock(&self.loading_timer).take() {
            timer.abort();
        }
        let was_loading = self.state.loading.get();
        self.state.finalize();
        if was_loading && self.options.loading_overlay.is_some() {
            if let Some(implement) = self.client.overlay_implement() {
                implement.loading_close();
            }
        }
        if let Some(on_finally) = &self.options.on_finally {
            // Clone out of the lock: the callback may reach back into the
            // operation.
            let payload = lock(&self.last_payload).clone();
            on_finally(payload.as_deref());
        }
    }

    fn schedule_auto_retry(self: &Arc<Self>) {
        let performed = self.state.retry_times.get();
        if performed >= self.behavior.auto_retry_times {
            return;
        }
        let attempt = performed + 1;
        let countdown =
            retry::backoff_countdown(self.behavior.auto_retry_interval_secs, attempt);
        tracing::debug!(attempt, countdown, "scheduling automatic retry");

        let weak = Arc::downgrade(self);
        let timer = retry::spawn_countdown(self.state.retry_countdown.clone(), countdown, move || {
            if let Some(inner) = weak.upgrade() {
                tokio::spawn(inner.launch_retry());
            }
        });
        if let Some(previous) = lock(&self.retry_timer).replace(timer) {
            previous.abort();
        }
    }

    /// Boxed so the retry cycle (run schedules a timer whose expiry runs
    /// again) does not produce an infinitely sized future type.
    fn launch_retry(self: Arc<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            self.state.retry_times.update(|times| *times += 1);
            metrics::counter!("operation.retries").increment(1);
            self.state.retrying.set(true);
            let payload = lock(&self.last_payload).clone();
            match self.run(payload).await {
                Attempt::Failed(error) => {
                    tracing::debug!(%error, "automatic retry failed");
                }
                Attempt::Data(_) | Attempt::Aborted | Attempt::Stale => {}
            }
        })
    }

    fn cancel_retry_schedule(&self) {
        if let Some(timer) = lock(&self.retry_timer).take() {
            timer.abort();
        }
        self.state.retry_countdown.set(0);
    }

    fn abort(&self) {
        if let Some(token) = lock(&self.current_cancel).take() {
            token.cancel();
        }
        self.cancel_retry_schedule();
        self.state.retrying.set(false);
    }

    fn settle(&self, outcome: Attempt<T>) -> ActionResult<T> {
        match outcome {
            Attempt::Data(value) => Ok(Some(value)),
            Attempt::Aborted | Attempt::Stale => Ok(None),
            Attempt::Failed(error) if self.behavior.throw_on_failure => Err(error),
            Attempt::Failed(_) => Ok(None),
        }
    }
}

impl<T, P> Drop for Inner<T, P> {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.current_cancel).take() {
            token.cancel();
        }
        for slot in [&self.loading_timer, &self.retry_timer, &self.immediate_task] {
            if let Some(task) = lock(slot).take() {
                task.abort();
            }
        }
    }
}
