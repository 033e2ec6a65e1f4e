//! Capability traits at the external seams.
//!
//! The runtime never talks to the network, a cache, or a UI directly. Each
//! collaborator is injected behind one of these traits, so orchestration
//! logic stays testable with mocks and any host can bring its own
//! implementations. All traits are dyn-compatible: async methods return
//! [`BoxFuture`]s.

use crate::error::{OperationError, TransportError};
use crate::overlay::{ConfirmSpec, FeedbackSpec, LoadingSpec};
use crate::request::RequestDescriptor;
use futures::future::{self, BoxFuture};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sends a request descriptor and produces a raw payload value.
///
/// Cancellation is cooperative: the transport should observe `cancel` and
/// resolve with [`TransportError::Aborted`], but stopping the request
/// mid-flight at the network layer is best-effort.
pub trait Transport: Send + Sync {
    /// Execute one request.
    fn send(
        &self,
        request: RequestDescriptor,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Value, TransportError>>;
}

/// Synchronous key/value cache capability.
///
/// Values are opaque serialized payloads; the runtime only computes keys and
/// issues get/set/delete. Implementations shared between operations must be
/// safe for concurrent use.
pub trait CacheStore: Send + Sync {
    /// Look up a cached payload.
    fn get(&self, key: &str) -> Option<String>;
    /// Store a serialized payload.
    fn set(&self, key: &str, value: String);
    /// Drop a cached payload.
    fn delete(&self, key: &str);
}

/// UI overlay capability: loading indicators, confirm dialogs, toasts.
///
/// Every method has a no-op default so partial implementations work; an
/// unimplemented `confirm` accepts immediately.
pub trait OverlayImplement: Send + Sync {
    /// Show the loading indicator.
    fn loading_open(&self, spec: LoadingSpec) {
        let _ = spec;
    }

    /// Hide the loading indicator.
    fn loading_close(&self) {}

    /// Ask the user to confirm. Resolving `false` means the user declined.
    fn confirm(&self, spec: ConfirmSpec) -> BoxFuture<'static, bool> {
        let _ = spec;
        Box::pin(future::ready(true))
    }

    /// Show a success toast.
    fn success(&self, spec: FeedbackSpec) {
        let _ = spec;
    }

    /// Show an error toast.
    fn error(&self, spec: FeedbackSpec) {
        let _ = spec;
    }
}

/// Fire-and-forget error sink, invoked on every settled (winning) error
/// regardless of retry scheduling.
pub trait ErrorReport: Send + Sync {
    /// Report one settled error.
    fn report(&self, error: &OperationError);
}

impl<F: Fn(&OperationError) + Send + Sync> ErrorReport for F {
    fn report(&self, error: &OperationError) {
        self(error);
    }
}

/// Construction-time hook transforming every successful raw response.
pub type ResponseHandle =
    Arc<dyn Fn(Value, &RequestDescriptor) -> Result<Value, OperationError> + Send + Sync>;

/// Construction-time hook transforming every transport error.
pub type ErrorHandle =
    Arc<dyn Fn(TransportError, &RequestDescriptor) -> OperationError + Send + Sync>;
