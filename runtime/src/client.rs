//! Client: the construction-time family an operation belongs to.
//!
//! A [`Client`] bundles the injected capabilities (transport, cache, overlay
//! implementation, error-report sink), the uniform response/error handles,
//! and the rewritable defaults shared by every operation it creates. It also
//! offers a one-shot request surface with method aliases for calls that do
//! not need lifecycle state.

use crate::operation::Operation;
use crate::options::{DebounceMode, OperationOptions};
use reqflow_core::capability::{
    CacheStore, ErrorHandle, ErrorReport, OverlayImplement, ResponseHandle, Transport,
};
use reqflow_core::request::{Method, RequestDescriptor, RequestOptions};
use reqflow_core::{OperationError, TransportError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Source for the client-level base request configuration.
pub type BaseRequestFn = Arc<dyn Fn() -> RequestDescriptor + Send + Sync>;

/// Rewritable per-client defaults.
///
/// Resolution order for every behavioral field: call-site value, then the
/// client default set here, then the hardcoded default.
#[derive(Debug, Clone)]
pub struct Defaults {
    /// Start an attempt on operation creation. Default: `false`.
    pub immediate: bool,
    /// Skip change notification on data merges. Default: `false`.
    pub shallow_observe: bool,
    /// Delay before `loading` flips true. Default: 300ms.
    pub loading_delay: Duration,
    /// Trigger filtering policy. Default: [`DebounceMode::FirstPass`].
    pub debounce_mode: DebounceMode,
    /// Coalescing window for [`DebounceMode::LastPass`]. Default: 500ms.
    pub debounce_time: Duration,
    /// Automatic retry budget. Default: 0.
    pub auto_retry_times: u32,
    /// Backoff interval unit in seconds. Default: 2.
    pub auto_retry_interval_secs: u64,
    /// Reject action futures on failure. Default: `false`.
    pub throw_on_failure: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            immediate: false,
            shallow_observe: false,
            loading_delay: Duration::from_millis(300),
            debounce_mode: DebounceMode::FirstPass,
            debounce_time: Duration::from_millis(500),
            auto_retry_times: 0,
            auto_retry_interval_secs: 2,
            throw_on_failure: false,
        }
    }
}

impl Defaults {
    /// Set the immediate default.
    #[must_use]
    pub const fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Set the shallow-observe default.
    #[must_use]
    pub const fn with_shallow_observe(mut self, shallow: bool) -> Self {
        self.shallow_observe = shallow;
        self
    }

    /// Set the loading-delay default.
    #[must_use]
    pub const fn with_loading_delay(mut self, delay: Duration) -> Self {
        self.loading_delay = delay;
        self
    }

    /// Set the debounce-mode default.
    #[must_use]
    pub const fn with_debounce_mode(mut self, mode: DebounceMode) -> Self {
        self.debounce_mode = mode;
        self
    }

    /// Set the debounce-window default.
    #[must_use]
    pub const fn with_debounce_time(mut self, window: Duration) -> Self {
        self.debounce_time = window;
        self
    }

    /// Set the automatic retry defaults.
    #[must_use]
    pub const fn with_auto_retry(mut self, times: u32, interval_secs: u64) -> Self {
        self.auto_retry_times = times;
        self.auto_retry_interval_secs = interval_secs;
        self
    }

    /// Set the throw-on-failure default.
    #[must_use]
    pub const fn with_throw_on_failure(mut self, throw: bool) -> Self {
        self.throw_on_failure = throw;
        self
    }
}

/// The shared request family: capabilities, handles, and defaults.
pub struct Client {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) base_request: Option<BaseRequestFn>,
    pub(crate) response_handle: Option<ResponseHandle>,
    pub(crate) error_handle: Option<ErrorHandle>,
    pub(crate) cache: Option<Arc<dyn CacheStore>>,
    pub(crate) error_report: Option<Arc<dyn ErrorReport>>,
    pub(crate) overlay: Arc<RwLock<Option<Arc<dyn OverlayImplement>>>>,
    pub(crate) defaults: Defaults,
}

impl Client {
    /// Start building a client around a transport.
    #[must_use]
    pub fn builder(transport: Arc<dyn Transport>) -> ClientBuilder {
        ClientBuilder {
            transport,
            base_request: None,
            response_handle: None,
            error_handle: None,
            cache: None,
            error_report: None,
            overlay: None,
            defaults: Defaults::default(),
        }
    }

    /// The client defaults.
    #[must_use]
    pub const fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Replace the overlay implementation for this family at runtime.
    pub fn set_overlay_implement(&self, implement: Arc<dyn OverlayImplement>) {
        *self
            .overlay
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(implement);
    }

    pub(crate) fn overlay_implement(&self) -> Option<Arc<dyn OverlayImplement>> {
        self.overlay
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn base_descriptor(&self) -> Option<RequestDescriptor> {
        self.base_request.as_ref().map(|f| f())
    }

    /// Create an operation: the observable state machine around one
    /// conceptual request.
    ///
    /// With `immediate` resolved to `true`, a first attempt is spawned right
    /// away (a tokio runtime must be current).
    pub fn operation<T, P>(self: &Arc<Self>, options: OperationOptions<T, P>) -> Operation<T, P>
    where
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
        P: Send + Sync + 'static,
    {
        Operation::create(Arc::clone(self), options)
    }

    /// Issue a one-shot request outside any operation lifecycle.
    ///
    /// The base request configuration and the response/error handles apply,
    /// exactly as they do for operation attempts.
    ///
    /// # Errors
    ///
    /// Returns the transformed transport error, or the response handle's
    /// rejection.
    pub async fn request(&self, options: RequestOptions<()>) -> Result<Value, OperationError> {
        let descriptor = options.resolve(self.base_descriptor().as_ref(), None);
        let raw = self
            .transport
            .send(descriptor.clone(), CancellationToken::new())
            .await;
        self.settle_raw(raw, &descriptor)
    }

    pub(crate) fn settle_raw(
        &self,
        raw: Result<Value, TransportError>,
        descriptor: &RequestDescriptor,
    ) -> Result<Value, OperationError> {
        match raw {
            Ok(value) => match &self.response_handle {
                Some(handle) => handle(value, descriptor),
                None => Ok(value),
            },
            Err(error) => Err(match &self.error_handle {
                Some(handle) => handle(error, descriptor),
                None => OperationError::Transport(error),
            }),
        }
    }

    /// One-shot GET.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn get(&self, url: impl Into<String>) -> Result<Value, OperationError> {
        self.request(RequestOptions::url(url.into())).await
    }

    /// One-shot DELETE.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn delete(&self, url: impl Into<String>) -> Result<Value, OperationError> {
        self.request(RequestOptions::url(url.into()).with_method(Method::Delete))
            .await
    }

    /// One-shot HEAD.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn head(&self, url: impl Into<String>) -> Result<Value, OperationError> {
        self.request(RequestOptions::url(url.into()).with_method(Method::Head))
            .await
    }

    /// One-shot OPTIONS.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn options(&self, url: impl Into<String>) -> Result<Value, OperationError> {
        self.request(RequestOptions::url(url.into()).with_method(Method::Options))
            .await
    }

    /// One-shot POST with a body.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn post(
        &self,
        url: impl Into<String>,
        data: Value,
    ) -> Result<Value, OperationError> {
        self.request(
            RequestOptions::url(url.into())
                .with_method(Method::Post)
                .with_data(data),
        )
        .await
    }

    /// One-shot PUT with a body.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn put(&self, url: impl Into<String>, data: Value) -> Result<Value, OperationError> {
        self.request(
            RequestOptions::url(url.into())
                .with_method(Method::Put)
                .with_data(data),
        )
        .await
    }

    /// One-shot PATCH with a body.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn patch(
        &self,
        url: impl Into<String>,
        data: Value,
    ) -> Result<Value, OperationError> {
        self.request(
            RequestOptions::url(url.into())
                .with_method(Method::Patch)
                .with_data(data),
        )
        .await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("defaults", &self.defaults)
            .field("has_cache", &self.cache.is_some())
            .field("has_error_report", &self.error_report.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    base_request: Option<BaseRequestFn>,
    response_handle: Option<ResponseHandle>,
    error_handle: Option<ErrorHandle>,
    cache: Option<Arc<dyn CacheStore>>,
    error_report: Option<Arc<dyn ErrorReport>>,
    overlay: Option<Arc<dyn OverlayImplement>>,
    defaults: Defaults,
}

impl ClientBuilder {
    /// Base request configuration applied under every per-call option.
    #[must_use]
    pub fn with_base_request(mut self, base: RequestDescriptor) -> Self {
        self.base_request = Some(Arc::new(move || base.clone()));
        self
    }

    /// Base request configuration recomputed per attempt.
    #[must_use]
    pub fn with_base_request_fn(
        mut self,
        f: impl Fn() -> RequestDescriptor + Send + Sync + 'static,
    ) -> Self {
        self.base_request = Some(Arc::new(f));
        self
    }

    /// Uniform hook transforming every successful raw response.
    #[must_use]
    pub fn with_response_handle(
        mut self,
        f: impl Fn(Value, &RequestDescriptor) -> Result<Value, OperationError> + Send + Sync + 'static,
    ) -> Self {
        self.response_handle = Some(Arc::new(f));
        self
    }

    /// Uniform hook transforming every transport error.
    #[must_use]
    pub fn with_error_handle(
        mut self,
        f: impl Fn(TransportError, &RequestDescriptor) -> OperationError + Send + Sync + 'static,
    ) -> Self {
        self.error_handle = Some(Arc::new(f));
        self
    }

    /// Cache capability consulted by operations with a cache key.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fire-and-forget sink for settled errors.
    #[must_use]
    pub fn with_error_report(mut self, sink: Arc<dyn ErrorReport>) -> Self {
        self.error_report = Some(sink);
        self
    }

    /// Initial overlay implementation; swappable later with
    /// [`Client::set_overlay_implement`].
    #[must_use]
    pub fn with_overlay_implement(mut self, implement: Arc<dyn OverlayImplement>) -> Self {
        self.overlay = Some(implement);
        self
    }

    /// Rewritten defaults for this family.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Arc<Client> {
        Arc::new(Client {
            transport: self.transport,
            base_request: self.base_request,
            response_handle: self.response_handle,
            error_handle: self.error_handle,
            cache: self.cache,
            error_report: self.error_report,
            overlay: Arc::new(RwLock::new(self.overlay)),
            defaults: self.defaults,
        })
    }
}
