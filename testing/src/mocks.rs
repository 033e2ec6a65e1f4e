//! Mock implementations of the capability traits.

use futures::future::{self, BoxFuture};
use reqflow_core::capability::{ErrorReport, OverlayImplement, Transport};
use reqflow_core::overlay::{ConfirmSpec, FeedbackSpec, LoadingSpec};
use reqflow_core::request::RequestDescriptor;
use reqflow_core::{OperationError, TransportError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Scripted = (Duration, Result<Value, TransportError>);

/// Transport returning scripted responses in order.
///
/// Each enqueued response can carry a latency; a configurable repeating
/// response serves calls past the end of the script. Calls with an exhausted
/// script and no repeating response resolve with a network error.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    repeating: Mutex<Option<Scripted>>,
    sent: Mutex<Vec<RequestDescriptor>>,
    calls: AtomicU64,
    // Behind an Arc: the returned send future is 'static and outlives &self.
    aborts: Arc<AtomicU64>,
}

impl MockTransport {
    /// An empty transport; enqueue responses before triggering.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an instantaneous successful response.
    pub fn enqueue_ok(&self, value: Value) {
        self.enqueue_ok_after(value, Duration::ZERO);
    }

    /// Enqueue a successful response delivered after `delay`.
    pub fn enqueue_ok_after(&self, value: Value, delay: Duration) {
        lock(&self.script).push_back((delay, Ok(value)));
    }

    /// Enqueue an instantaneous failure.
    pub fn enqueue_err(&self, error: TransportError) {
        self.enqueue_err_after(error, Duration::ZERO);
    }

    /// Enqueue a failure delivered after `delay`.
    pub fn enqueue_err_after(&self, error: TransportError, delay: Duration) {
        lock(&self.script).push_back((delay, Err(error)));
    }

    /// Serve `value` for every call past the end of the script.
    pub fn always_ok(&self, value: Value) {
        *lock(&self.repeating) = Some((Duration::ZERO, Ok(value)));
    }

    /// Serve `error` for every call past the end of the script.
    pub fn always_err(&self, error: TransportError) {
        *lock(&self.repeating) = Some((Duration::ZERO, Err(error)));
    }

    /// Number of send calls observed.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of sends resolved through cancellation.
    #[must_use]
    pub fn aborts(&self) -> u64 {
        self.aborts.load(Ordering::SeqCst)
    }

    /// Every descriptor handed to the transport, in call order.
    #[must_use]
    pub fn sent(&self) -> Vec<RequestDescriptor> {
        lock(&self.sent).clone()
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: RequestDescriptor,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Value, TransportError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.sent).push(request);
        let step = lock(&self.script)
            .pop_front()
            .or_else(|| lock(&self.repeating).clone());
        let aborts = Arc::clone(&self.aborts);
        Box::pin(async move {
            let Some((delay, outcome)) = step else {
                return Err(TransportError::Network("mock script exhausted".into()));
            };
            tokio::select! {
                () = cancel.cancelled() => {
                    aborts.fetch_add(1, Ordering::SeqCst);
                    Err(TransportError::Aborted)
                }
                () = tokio::time::sleep(delay) => outcome,
            }
        })
    }
}

fn lock<'a, G>(mutex: &'a Mutex<G>) -> std::sync::MutexGuard<'a, G> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Overlay implementation recording every dispatch.
#[derive(Debug, Default)]
pub struct RecordingOverlay {
    confirm_verdict: AtomicBool,
    confirms: Mutex<Vec<ConfirmSpec>>,
    loading_opens: Mutex<Vec<LoadingSpec>>,
    loading_closes: AtomicU64,
    successes: Mutex<Vec<FeedbackSpec>>,
    errors: Mutex<Vec<FeedbackSpec>>,
}

impl RecordingOverlay {
    /// An overlay that accepts every confirm dialog.
    #[must_use]
    pub fn accepting() -> Self {
        let overlay = Self::default();
        overlay.confirm_verdict.store(true, Ordering::SeqCst);
        overlay
    }

    /// An overlay that declines every confirm dialog.
    #[must_use]
    pub fn declining() -> Self {
        Self::default()
    }

    /// Change the confirm verdict for subsequent dialogs.
    pub fn set_confirm_verdict(&self, accept: bool) {
        self.confirm_verdict.store(accept, Ordering::SeqCst);
    }

    /// Confirm dialogs shown so far.
    #[must_use]
    pub fn confirms(&self) -> Vec<ConfirmSpec> {
        lock(&self.confirms).clone()
    }

    /// Loading indicators opened so far.
    #[must_use]
    pub fn loading_opens(&self) -> Vec<LoadingSpec> {
        lock(&self.loading_opens).clone()
    }

    /// Number of loading-close calls.
    #[must_use]
    pub fn loading_closes(&self) -> u64 {
        self.loading_closes.load(Ordering::SeqCst)
    }

    /// Success toasts shown so far.
    #[must_use]
    pub fn successes(&self) -> Vec<FeedbackSpec> {
        lock(&self.successes).clone()
    }

    /// Error toasts shown so far.
    #[must_use]
    pub fn errors(&self) -> Vec<FeedbackSpec> {
        lock(&self.errors).clone()
    }
}

impl OverlayImplement for RecordingOverlay {
    fn loading_open(&self, spec: LoadingSpec) {
        lock(&self.loading_opens).push(spec);
    }

    fn loading_close(&self) {
        self.loading_closes.fetch_add(1, Ordering::SeqCst);
    }

    fn confirm(&self, spec: ConfirmSpec) -> BoxFuture<'static, bool> {
        lock(&self.confirms).push(spec);
        Box::pin(future::ready(self.confirm_verdict.load(Ordering::SeqCst)))
    }

    fn success(&self, spec: FeedbackSpec) {
        lock(&self.successes).push(spec);
    }

    fn error(&self, spec: FeedbackSpec) {
        lock(&self.errors).push(spec);
    }
}

/// Error sink collecting every reported error.
#[derive(Debug, Default)]
pub struct RecordingReport {
    reported: Mutex<Vec<OperationError>>,
}

impl RecordingReport {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every reported error, in order.
    #[must_use]
    pub fn reported(&self) -> Vec<OperationError> {
        lock(&self.reported).clone()
    }
}

impl ErrorReport for RecordingReport {
    fn report(&self, error: &OperationError) {
        lock(&self.reported).push(error.clone());
    }
}
