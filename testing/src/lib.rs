//! # reqflow testing
//!
//! Capability mocks and helpers for exercising operations without a network
//! or a UI:
//! - `MockTransport`: scripted responses with optional latency, plus call
//!   and abort counters
//! - `RecordingOverlay`: captures every overlay dispatch and scripts the
//!   confirm verdict
//! - `RecordingReport`: collects settled errors
//! - `test_client`: a client wired to a mock transport in one call
//!
//! ## Example
//!
//! ```ignore
//! use reqflow_testing::mocks::MockTransport;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn fetches_users() {
//!     let transport = Arc::new(MockTransport::new());
//!     transport.enqueue_ok(serde_json::json!([{"id": 1}]));
//!     let client = reqflow_testing::test_client(Arc::clone(&transport));
//!     // create operations against `client` and assert on state
//! }
//! ```

use reqflow_core::capability::Transport;
use reqflow_runtime::Client;
use std::sync::Arc;

pub mod mocks;

/// A client wired to the given transport with default settings.
#[must_use]
pub fn test_client(transport: Arc<dyn Transport>) -> Arc<Client> {
    Client::builder(transport).build()
}

/// Install a compact tracing subscriber honoring `RUST_LOG`, once per
/// process. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .compact()
        .try_init();
}
