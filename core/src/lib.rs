//! # reqflow core
//!
//! Core types and capability traits for the reqflow request state manager.
//!
//! reqflow wraps an HTTP call (or any async operation) in an observable state
//! object (pending, loading, success, error, retry counters) plus control
//! operations: start, retry, refresh, abort, cache-invalidate. This crate
//! holds the leaf pieces the runtime is built from:
//!
//! - [`observable::Observable`]: reactive cells with change notification
//! - [`source::ValueSource`]: literal, cell, or function-of-payload fields
//!   resolved at invocation time
//! - [`request`]: descriptors, methods, header merging
//! - [`overlay`]: normalization of loose overlay options into canonical
//!   display payloads
//! - [`capability`]: the injected seams (transport, cache, overlay UI,
//!   error reporting)
//! - [`error`]: the transport/operation error taxonomy
//!
//! The state machine itself lives in `reqflow-runtime`.

pub mod capability;
pub mod error;
pub mod observable;
pub mod overlay;
pub mod request;
pub mod source;

pub use capability::{CacheStore, ErrorReport, OverlayImplement, Transport};
pub use error::{OperationError, TransportError};
pub use observable::Observable;
pub use request::{ContentType, Headers, Method, RequestDescriptor, RequestOptions};
pub use source::ValueSource;
