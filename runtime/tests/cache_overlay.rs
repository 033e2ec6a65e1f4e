//! Response caching and overlay dispatch.

use reqflow_runtime::{
    Client, ConfirmOverlay, ErrorOverlay, LoadingOverlay, MemoryCache, OperationOptions,
    OverlayValue, SuccessOverlay, TransportError,
};
use reqflow_testing::mocks::{MockTransport, RecordingOverlay};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct User {
    id: u32,
    name: String,
}

fn ada() -> serde_json::Value {
    json!({ "id": 1, "name": "ada" })
}

#[tokio::test]
async fn cache_hit_short_circuits_the_transport() {
    let transport = Arc::new(MockTransport::new());
    transport.always_ok(ada());
    let cache = Arc::new(MemoryCache::new());
    let client = Client::builder(transport.clone())
        .with_cache(cache.clone())
        .build();

    let op = client.operation::<User, ()>(
        OperationOptions::url("/users/1").with_cache_key("user:1"),
    );

    assert!(matches!(op.action(None).await, Ok(Some(_))));
    assert_eq!(transport.calls(), 1);
    assert_eq!(cache.len(), 1);

    // Served from the cache: no transport call, no new attempt ordinal.
    assert!(matches!(op.action(None).await, Ok(Some(_))));
    assert_eq!(transport.calls(), 1);
    assert_eq!(op.state().request_times.get(), 1);
    assert!(op.state().success.get());

    op.delete_cache(None);
    assert!(cache.is_empty());
    assert!(matches!(op.action(None).await, Ok(Some(_))));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn empty_cache_keys_disable_caching() {
    let transport = Arc::new(MockTransport::new());
    transport.always_ok(ada());
    let cache = Arc::new(MemoryCache::new());
    let client = Client::builder(transport.clone())
        .with_cache(cache.clone())
        .build();

    let op = client.operation::<User, ()>(
        OperationOptions::url("/users/1").with_cache_key(""),
    );
    assert!(matches!(op.action(None).await, Ok(Some(_))));
    assert!(matches!(op.action(None).await, Ok(Some(_))));
    assert_eq!(transport.calls(), 2);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn cache_key_without_a_store_degrades_and_reports() {
    let transport = Arc::new(MockTransport::new());
    transport.always_ok(ada());
    let report = Arc::new(reqflow_testing::mocks::RecordingReport::new());
    let client = Client::builder(transport.clone())
        .with_error_report(report.clone())
        .build();

    let op = client.operation::<User, ()>(
        OperationOptions::url("/users/1").with_cache_key("user:1"),
    );
    assert!(matches!(op.action(None).await, Ok(Some(_))));
    assert!(matches!(op.action(None).await, Ok(Some(_))));

    // No store: every attempt hits the transport and the misconfiguration
    // is reported.
    assert_eq!(transport.calls(), 2);
    assert_eq!(report.reported().len(), 2);
}

#[tokio::test]
async fn declined_confirm_drops_the_action() {
    let transport = Arc::new(MockTransport::new());
    transport.always_ok(ada());
    let overlay = Arc::new(RecordingOverlay::declining());
    let client = Client::builder(transport.clone())
        .with_overlay_implement(overlay.clone())
        .build();

    let op = client.operation::<User, ()>(
        OperationOptions::url("/users/1")
            .with_confirm_overlay(ConfirmOverlay::Title("Really fetch?".into())),
    );

    assert!(matches!(op.action(None).await, Ok(None)));
    assert_eq!(transport.calls(), 0);
    assert_eq!(op.state().request_times.get(), 0);
    let confirms = overlay.confirms();
    assert_eq!(confirms.len(), 1);
    assert_eq!(confirms[0].title, "Really fetch?");
    assert_eq!(confirms[0].style, 1);

    overlay.set_confirm_verdict(true);
    assert!(matches!(op.action(None).await, Ok(Some(_))));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn missing_overlay_implement_proceeds_without_confirmation() {
    let transport = Arc::new(MockTransport::new());
    transport.always_ok(ada());
    let client = Client::builder(transport.clone()).build();

    let op = client.operation::<User, ()>(
        OperationOptions::url("/users/1")
            .with_confirm_overlay(ConfirmOverlay::Title("Really?".into())),
    );
    assert!(matches!(op.action(None).await, Ok(Some(_))));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn loading_overlay_opens_after_the_delay_and_closes_on_settle() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue_ok_after(ada(), Duration::from_millis(500));
    let overlay = Arc::new(RecordingOverlay::accepting());
    let client = Client::builder(transport)
        .with_overlay_implement(overlay.clone())
        .build();

    let op = client.operation::<User, ()>(
        OperationOptions::url("/users/1")
            .with_loading_overlay(LoadingOverlay::Text("Fetching user...".into())),
    );
    assert!(matches!(op.action(None).await, Ok(Some(_))));

    let opens = overlay.loading_opens();
    assert_eq!(opens.len(), 1);
    assert_eq!(opens[0].text, "Fetching user...");
    assert_eq!(overlay.loading_closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn disabled_loading_overlay_never_opens() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue_ok_after(ada(), Duration::from_millis(500));
    let overlay = Arc::new(RecordingOverlay::accepting());
    let client = Client::builder(transport)
        .with_overlay_implement(overlay.clone())
        .build();

    let op = client.operation::<User, ()>(
        OperationOptions::url("/users/1").with_loading_overlay(LoadingOverlay::Enabled(false)),
    );
    assert!(matches!(op.action(None).await, Ok(Some(_))));
    assert!(overlay.loading_opens().is_empty());
}

#[tokio::test]
async fn success_toast_sees_payload_and_data() {
    let transport = Arc::new(MockTransport::new());
    transport.always_ok(ada());
    let overlay = Arc::new(RecordingOverlay::accepting());
    let client = Client::builder(transport)
        .with_overlay_implement(overlay.clone())
        .build();

    let op = client.operation::<User, ()>(
        OperationOptions::url("/users/1").with_success_overlay(SuccessOverlay::compute(
            |_, data: Option<&User>| {
                OverlayValue::Title(format!(
                    "Loaded {}",
                    data.map(|u| u.name.as_str()).unwrap_or("nobody")
                ))
            },
        )),
    );
    assert!(matches!(op.action(None).await, Ok(Some(_))));

    let toasts = overlay.successes();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].title, "Loaded ada");
}

#[tokio::test]
async fn error_toast_sees_the_settled_error() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue_err(TransportError::Timeout);
    let overlay = Arc::new(RecordingOverlay::accepting());
    let client = Client::builder(transport)
        .with_overlay_implement(overlay.clone())
        .build();

    let op = client.operation::<User, ()>(
        OperationOptions::url("/users/1").with_error_overlay(ErrorOverlay::compute(
            |_, error| {
                OverlayValue::Title(error.map(ToString::to_string).unwrap_or_default())
            },
        )),
    );
    assert!(matches!(op.action(None).await, Ok(None)));

    let toasts = overlay.errors();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].title, "request timed out");
}
