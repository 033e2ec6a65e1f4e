//! Per-operation configuration.
//!
//! [`OperationOptions`] is everything a call site supplies when creating an
//! operation: the request fields (or a custom future source), the behavioral
//! knobs, the overlay options, and the lifecycle callbacks. Behavioral fields
//! are optional here; unset fields fall back to the client's rewritable
//! defaults, which fall back to hardcoded defaults.

use crate::client::Defaults;
use futures::future::BoxFuture;
use reqflow_core::observable::Observable;
use reqflow_core::overlay::{ConfirmOverlay, ErrorOverlay, LoadingOverlay, SuccessOverlay};
use reqflow_core::request::RequestOptions;
use reqflow_core::source::ValueSource;
use reqflow_core::OperationError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Policy governing how rapid repeated triggers are filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebounceMode {
    /// Leading edge only: while an attempt is pending, further triggers are
    /// rejected.
    #[default]
    FirstPass,
    /// Trailing edge only: triggers inside the debounce window are coalesced
    /// and only the last one runs.
    LastPass,
    /// Every trigger runs, producing concurrent in-flight attempts.
    None,
}

/// A custom future source replacing the transport call.
///
/// Receives the action payload and the attempt's cancellation token.
pub type PromiseFn<T, P> =
    Arc<dyn Fn(Option<&P>, CancellationToken) -> BoxFuture<'static, Result<T, OperationError>> + Send + Sync>;

/// Merge hook invoked with the data cell, the fresh value, and the payload in
/// place of direct assignment.
pub type OnData<T, P> = Arc<dyn Fn(&Observable<Option<T>>, T, Option<&P>) + Send + Sync>;

/// Success callback.
pub type OnSuccess<T, P> = Arc<dyn Fn(&T, Option<&P>) + Send + Sync>;

/// Error callback.
pub type OnError<P> = Arc<dyn Fn(&OperationError, Option<&P>) + Send + Sync>;

/// Settlement callback, fired exactly once per winning attempt.
pub type OnFinally<P> = Arc<dyn Fn(Option<&P>) + Send + Sync>;

/// Concrete behavioral settings after default resolution.
#[derive(Debug, Clone)]
pub(crate) struct Behavior {
    pub immediate: bool,
    pub shallow_observe: bool,
    pub loading_delay: Duration,
    pub debounce_mode: DebounceMode,
    pub debounce_time: Duration,
    pub auto_retry_times: u32,
    pub auto_retry_interval_secs: u64,
    pub throw_on_failure: bool,
}

/// Caller-supplied configuration for one operation.
///
/// # Example
///
/// ```ignore
/// let options = OperationOptions::<User, u64>::url(ValueSource::compute(
///         |id: Option<&u64>| format!("/users/{}", id.copied().unwrap_or(0)),
///     ))
///     .with_immediate(true)
///     .with_auto_retry(3, 2)
///     .with_loading_overlay(LoadingOverlay::Text("Loading user...".into()));
/// ```
pub struct OperationOptions<T, P = ()> {
    /// Transport-relevant request fields.
    pub request: RequestOptions<P>,
    /// Custom future source; when set, the transport is not consulted.
    pub promise: Option<PromiseFn<T, P>>,
    /// Start an attempt as soon as the operation is created.
    pub immediate: Option<bool>,
    /// Value held in `data` before the first successful attempt.
    pub initial_value: Option<T>,
    /// Skip change notification on data merges; the merge hook triggers
    /// notification manually.
    pub shallow_observe: Option<bool>,
    /// Delay before `loading` flips true on a pending attempt.
    pub loading_delay: Option<Duration>,
    /// Trigger filtering policy.
    pub debounce_mode: Option<DebounceMode>,
    /// Coalescing window for [`DebounceMode::LastPass`].
    pub debounce_time: Option<Duration>,
    /// Automatic retry budget after failures.
    pub auto_retry_times: Option<u32>,
    /// Backoff interval unit in seconds.
    pub auto_retry_interval_secs: Option<u64>,
    /// Cache key; a non-empty resolution enables response caching.
    pub cache_key: Option<ValueSource<String, P>>,
    /// Reject the action future on failure instead of resolving `Ok(None)`.
    pub throw_on_failure: Option<bool>,
    /// Confirm dialog shown before each action.
    pub confirm_overlay: Option<ConfirmOverlay<P>>,
    /// Loading indicator shown after the loading delay.
    pub loading_overlay: Option<LoadingOverlay<P>>,
    /// Success toast.
    pub success_overlay: Option<SuccessOverlay<T, P>>,
    /// Error toast.
    pub error_overlay: Option<ErrorOverlay<P>>,
    /// Data merge hook.
    pub on_data: Option<OnData<T, P>>,
    /// Success callback.
    pub on_success: Option<OnSuccess<T, P>>,
    /// Error callback.
    pub on_error: Option<OnError<P>>,
    /// Settlement callback.
    pub on_finally: Option<OnFinally<P>>,
}

impl<T, P> OperationOptions<T, P> {
    /// Options around a request configuration.
    #[must_use]
    pub fn request(request: RequestOptions<P>) -> Self {
        Self {
            request,
            promise: None,
            immediate: None,
            initial_value: None,
            shallow_observe: None,
            loading_delay: None,
            debounce_mode: None,
            debounce_time: None,
            auto_retry_times: None,
            auto_retry_interval_secs: None,
            cache_key: None,
            throw_on_failure: None,
            confirm_overlay: None,
            loading_overlay: None,
            success_overlay: None,
            error_overlay: None,
            on_data: None,
            on_success: None,
            on_error: None,
            on_finally: None,
        }
    }

    /// Options targeting `url` with defaults everywhere else.
    #[must_use]
    pub fn url(url: impl Into<ValueSource<String, P>>) -> Self {
        Self::request(RequestOptions::url(url))
    }

    /// Options around a custom future source instead of a request.
    #[must_use]
    pub fn promise(
        f: impl Fn(Option<&P>, CancellationToken) -> BoxFuture<'static, Result<T, OperationError>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        let mut options = Self::request(RequestOptions::default());
        options.promise = Some(Arc::new(f));
        options
    }

    /// Set query parameters on the request fields.
    #[must_use]
    pub fn with_params(mut self, params: impl Into<ValueSource<Value, P>>) -> Self {
        self.request = self.request.with_params(params);
        self
    }

    /// Set the request body payload.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<ValueSource<Value, P>>) -> Self {
        self.request = self.request.with_data(data);
        self
    }

    /// Start an attempt as soon as the operation is created.
    #[must_use]
    pub const fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = Some(immediate);
        self
    }

    /// Value held in `data` before the first successful attempt.
    #[must_use]
    pub fn with_initial_value(mut self, value: T) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// Skip change notification on data merges.
    #[must_use]
    pub const fn with_shallow_observe(mut self, shallow: bool) -> Self {
        self.shallow_observe = Some(shallow);
        self
    }

    /// Delay before `loading` flips true.
    #[must_use]
    pub const fn with_loading_delay(mut self, delay: Duration) -> Self {
        self.loading_delay = Some(delay);
        self
    }

    /// Trigger filtering policy.
    #[must_use]
    pub const fn with_debounce_mode(mut self, mode: DebounceMode) -> Self {
        self.debounce_mode = Some(mode);
        self
    }

    /// Coalescing window for [`DebounceMode::LastPass`].
    #[must_use]
    pub const fn with_debounce_time(mut self, window: Duration) -> Self {
        self.debounce_time = Some(window);
        self
    }

    /// Automatic retry budget and backoff interval unit.
    #[must_use]
    pub const fn with_auto_retry(mut self, times: u32, interval_secs: u64) -> Self {
        self.auto_retry_times = Some(times);
        self.auto_retry_interval_secs = Some(interval_secs);
        self
    }

    /// Cache key enabling response caching.
    #[must_use]
    pub fn with_cache_key(mut self, key: impl Into<ValueSource<String, P>>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Reject the action future on failure.
    #[must_use]
    pub const fn with_throw_on_failure(mut self, throw: bool) -> Self {
        self.throw_on_failure = Some(throw);
        self
    }

    /// Confirm dialog shown before each action.
    #[must_use]
    pub fn with_confirm_overlay(mut self, overlay: ConfirmOverlay<P>) -> Self {
        self.confirm_overlay = Some(overlay);
        self
    }

    /// Loading indicator shown after the loading delay.
    #[must_use]
    pub fn with_loading_overlay(mut self, overlay: LoadingOverlay<P>) -> Self {
        self.loading_overlay = Some(overlay);
        self
    }

    /// Success toast.
    #[must_use]
    pub fn with_success_overlay(mut self, overlay: SuccessOverlay<T, P>) -> Self {
        self.success_overlay = Some(overlay);
        self
    }

    /// Error toast.
    #[must_use]
    pub fn with_error_overlay(mut self, overlay: ErrorOverlay<P>) -> Self {
        self.error_overlay = Some(overlay);
        self
    }

    /// Data merge hook replacing direct assignment.
    #[must_use]
    pub fn with_on_data(
        mut self,
        f: impl Fn(&Observable<Option<T>>, T, Option<&P>) + Send + Sync + 'static,
    ) -> Self {
        self.on_data = Some(Arc::new(f));
        self
    }

    /// Success callback.
    #[must_use]
    pub fn with_on_success(mut self, f: impl Fn(&T, Option<&P>) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Error callback.
    #[must_use]
    pub fn with_on_error(
        mut self,
        f: impl Fn(&OperationError, Option<&P>) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Settlement callback, fired once per winning attempt.
    #[must_use]
    pub fn with_on_finally(mut self, f: impl Fn(Option<&P>) + Send + Sync + 'static) -> Self {
        self.on_finally = Some(Arc::new(f));
        self
    }

    /// Resolve behavioral fields against client defaults.
    pub(crate) fn behavior(&self, defaults: &Defaults) -> Behavior {
        Behavior {
            immediate: self.immediate.unwrap_or(defaults.immediate),
            shallow_observe: self.shallow_observe.unwrap_or(defaults.shallow_observe),
            loading_delay: self.loading_delay.unwrap_or(defaults.loading_delay),
            debounce_mode: self.debounce_mode.unwrap_or(defaults.debounce_mode),
            debounce_time: self.debounce_time.unwrap_or(defaults.debounce_time),
            auto_retry_times: self.auto_retry_times.unwrap_or(defaults.auto_retry_times),
            auto_retry_interval_secs: self
                .auto_retry_interval_secs
                .unwrap_or(defaults.auto_retry_interval_secs),
            throw_on_failure: self.throw_on_failure.unwrap_or(defaults.throw_on_failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_site_value_wins_over_defaults() {
        let defaults = Defaults::default().with_loading_delay(Duration::from_millis(100));
        let options = OperationOptions::<u32, ()>::url("/x")
            .with_loading_delay(Duration::from_millis(50))
            .with_auto_retry(2, 3);
        let behavior = options.behavior(&defaults);
        assert_eq!(behavior.loading_delay, Duration::from_millis(50));
        assert_eq!(behavior.auto_retry_times, 2);
        assert_eq!(behavior.auto_retry_interval_secs, 3);
        assert!(!behavior.immediate);
    }

    #[test]
    fn unset_fields_fall_back_to_client_defaults() {
        let defaults = Defaults::default()
            .with_debounce_mode(DebounceMode::LastPass)
            .with_throw_on_failure(true);
        let behavior = OperationOptions::<u32, ()>::url("/x").behavior(&defaults);
        assert_eq!(behavior.debounce_mode, DebounceMode::LastPass);
        assert!(behavior.throw_on_failure);
        assert_eq!(behavior.loading_delay, Duration::from_millis(300));
        assert_eq!(behavior.debounce_time, Duration::from_millis(500));
    }
}
