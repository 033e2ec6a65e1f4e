//! Reactive request orchestration.
//!
//! This crate turns one-off HTTP calls into observable operations: each
//! [`Operation`] owns a reactive [`OperationState`] (pending, loading, data,
//! error, retry countdown, ...) and a trigger surface (`action`, `refresh`,
//! `retry`, `abort`). Attempt filtering, stale-response rejection,
//! loading-delay gating, automatic retry backoff, response caching, and UI
//! overlay dispatch all live here; the external seams (transport, cache,
//! overlay rendering) are injected capabilities from `reqflow-core`.
//!
//! # Example
//!
//! ```ignore
//! use reqflow_runtime::{Client, HttpTransport, OperationOptions};
//! use std::sync::Arc;
//!
//! let client = Client::builder(Arc::new(HttpTransport::new())).build();
//! let users = client.operation::<Vec<User>, ()>(
//!     OperationOptions::url("https://api.example.com/users").with_auto_retry(3, 2),
//! );
//! let fetched = users.action(None).await?;
//! ```

mod cache;
mod client;
mod debounce;
mod operation;
mod options;
mod provider;
mod retry;
mod state;
mod transport;

pub use cache::MemoryCache;
pub use client::{BaseRequestFn, Client, ClientBuilder, Defaults};
pub use operation::{ActionResult, Operation};
pub use options::{
    DebounceMode, OnData, OnError, OnFinally, OnSuccess, OperationOptions, PromiseFn,
};
pub use provider::{Provider, DEFAULT_CLIENT};
pub use retry::backoff_countdown;
pub use state::{OperationState, StateSnapshot};
pub use transport::HttpTransport;

pub use reqflow_core::capability::{
    CacheStore, ErrorHandle, ErrorReport, OverlayImplement, ResponseHandle, Transport,
};
pub use reqflow_core::observable::Observable;
pub use reqflow_core::overlay::{
    ConfirmOverlay, ConfirmSpec, ErrorOverlay, FeedbackSpec, LoadingOverlay, LoadingSpec,
    OverlayValue, SuccessOverlay,
};
pub use reqflow_core::request::{
    ContentType, Headers, Method, RequestDescriptor, RequestOptions,
};
pub use reqflow_core::source::ValueSource;
pub use reqflow_core::{OperationError, TransportError};
