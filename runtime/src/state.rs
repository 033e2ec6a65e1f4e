//! The reactive output of an operation.
//!
//! Every field is an [`Observable`] cell a UI layer can subscribe to. The
//! mutators here are the only places lifecycle flags change, keeping the
//! invariants in one spot: `loading` implies `pending`, `success` and `error`
//! are mutually exclusive after settlement, and `request_times` only grows
//! outside an explicit reset.

use reqflow_core::observable::Observable;
use reqflow_core::OperationError;

/// Observable lifecycle state for one operation.
pub struct OperationState<T> {
    /// An attempt is in flight.
    pub pending: Observable<bool>,
    /// Pending and the loading delay has elapsed.
    pub loading: Observable<bool>,
    /// The last settled attempt succeeded.
    pub success: Observable<bool>,
    /// The last settled attempt's error, if any.
    pub error: Observable<Option<OperationError>>,
    /// A refresh is in flight.
    pub refreshing: Observable<bool>,
    /// At least one refresh has completed.
    pub refreshed: Observable<bool>,
    /// A retry attempt is in flight.
    pub retrying: Observable<bool>,
    /// Retries performed since the last success (manual retries keep
    /// counting past the automatic budget).
    pub retry_times: Observable<u32>,
    /// Seconds until the next automatic retry; 0 when inactive.
    pub retry_countdown: Observable<u32>,
    /// Attempts started over this operation's lifetime.
    pub request_times: Observable<u64>,
    /// The active attempt was aborted.
    pub aborted: Observable<bool>,
    /// Cancellation is available right now (an attempt is pending).
    pub can_abort: Observable<bool>,
    /// Last successful payload, or the initial value.
    pub data: Observable<Option<T>>,
}

impl<T: Clone> OperationState<T> {
    pub(crate) fn new(initial: Option<T>) -> Self {
        Self {
            pending: Observable::new(false),
            loading: Observable::new(false),
            success: Observable::new(false),
            error: Observable::new(None),
            refreshing: Observable::new(false),
            refreshed: Observable::new(false),
            retrying: Observable::new(false),
            retry_times: Observable::new(0),
            retry_countdown: Observable::new(0),
            request_times: Observable::new(0),
            aborted: Observable::new(false),
            can_abort: Observable::new(false),
            data: Observable::new(initial),
        }
    }

    /// An attempt is starting: flag it pending and clear the previous
    /// settlement.
    pub(crate) fn begin_attempt(&self) {
        self.pending.set(true);
        self.aborted.set(false);
        self.can_abort.set(true);
        self.success.set(false);
        self.error.set(None);
    }

    /// A winning attempt settled: clear the in-flight flags.
    pub(crate) fn finalize(&self) {
        self.pending.set(false);
        self.loading.set(false);
        self.can_abort.set(false);
        if self.refreshing.get() {
            self.refreshing.set(false);
            self.refreshed.set(true);
        }
        self.retrying.set(false);
    }

    /// Zero everything back to creation state.
    pub(crate) fn reset(&self, initial: Option<T>) {
        self.pending.set(false);
        self.loading.set(false);
        self.success.set(false);
        self.error.set(None);
        self.refreshing.set(false);
        self.refreshed.set(false);
        self.retrying.set(false);
        self.retry_times.set(0);
        self.retry_countdown.set(0);
        self.request_times.set(0);
        self.aborted.set(false);
        self.can_abort.set(false);
        self.data.set(initial);
    }

    /// A plain copy of every field, for assertions and logging.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot<T> {
        StateSnapshot {
            pending: self.pending.get(),
            loading: self.loading.get(),
            success: self.success.get(),
            error: self.error.get(),
            refreshing: self.refreshing.get(),
            refreshed: self.refreshed.get(),
            retrying: self.retrying.get(),
            retry_times: self.retry_times.get(),
            retry_countdown: self.retry_countdown.get(),
            request_times: self.request_times.get(),
            aborted: self.aborted.get(),
            can_abort: self.can_abort.get(),
            data: self.data.get(),
        }
    }
}

impl<T> Clone for OperationState<T> {
    fn clone(&self) -> Self {
        Self {
            pending: self.pending.clone(),
            loading: self.loading.clone(),
            success: self.success.clone(),
            error: self.error.clone(),
            refreshing: self.refreshing.clone(),
            refreshed: self.refreshed.clone(),
            retrying: self.retrying.clone(),
            retry_times: self.retry_times.clone(),
            retry_countdown: self.retry_countdown.clone(),
            request_times: self.request_times.clone(),
            aborted: self.aborted.clone(),
            can_abort: self.can_abort.clone(),
            data: self.data.clone(),
        }
    }
}

/// A point-in-time copy of [`OperationState`].
#[derive(Debug, Clone)]
pub struct StateSnapshot<T> {
    /// An attempt is in flight.
    pub pending: bool,
    /// Pending and the loading delay has elapsed.
    pub loading: bool,
    /// The last settled attempt succeeded.
    pub success: bool,
    /// The last settled attempt's error, if any.
    pub error: Option<OperationError>,
    /// A refresh is in flight.
    pub refreshing: bool,
    /// At least one refresh has completed.
    pub refreshed: bool,
    /// A retry attempt is in flight.
    pub retrying: bool,
    /// Retries performed since the last success.
    pub retry_times: u32,
    /// Seconds until the next automatic retry.
    pub retry_countdown: u32,
    /// Attempts started over this operation's lifetime.
    pub request_times: u64,
    /// The active attempt was aborted.
    pub aborted: bool,
    /// Cancellation is available right now.
    pub can_abort: bool,
    /// Last successful payload, or the initial value.
    pub data: Option<T>,
}
