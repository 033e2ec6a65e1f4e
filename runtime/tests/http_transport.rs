//! The reqwest transport against a local mock server.

use reqflow_runtime::{
    Client, Headers, HttpTransport, OperationError, RequestDescriptor, RequestOptions,
    TransportError,
};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_client(server: &MockServer) -> Arc<Client> {
    Client::builder(Arc::new(HttpTransport::new()))
        .with_base_request(RequestDescriptor::new(server.uri()))
        .build()
}

#[tokio::test]
async fn get_sends_query_pairs_and_decodes_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("page", "2"))
        .and(query_param("q", "ada"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .mount(&server)
        .await;

    let response = http_client(&server)
        .request(RequestOptions::url("/users").with_params(json!({ "page": 2, "q": "ada" })))
        .await;
    assert_eq!(response.ok(), Some(json!([{ "id": 1 }])));
}

#[tokio::test]
async fn post_sends_a_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_json(json!({ "name": "ada" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7 })))
        .mount(&server)
        .await;

    let response = http_client(&server)
        .post("/users", json!({ "name": "ada" }))
        .await;
    assert_eq!(response.ok(), Some(json!({ "id": 7 })));
}

#[tokio::test]
async fn headers_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("x-api-key", "k-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let response = http_client(&server)
        .request(
            RequestOptions::url("/secure")
                .with_headers(Headers::from([("x-api-key".to_owned(), "k-123".to_owned())])),
        )
        .await;
    assert_eq!(response.ok(), Some(json!({ "ok": true })));
}

#[tokio::test]
async fn non_success_statuses_become_status_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&server)
        .await;

    let response = http_client(&server).get("/missing").await;
    assert!(matches!(
        response,
        Err(OperationError::Transport(TransportError::Status { status: 404, ref body }))
            if body == "gone"
    ));
}

#[tokio::test]
async fn empty_bodies_decode_as_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let response = http_client(&server).delete("/users/1").await;
    assert_eq!(response.ok(), Some(Value::Null));
}

#[tokio::test]
async fn non_json_bodies_pass_through_as_strings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&server)
        .await;

    let response = http_client(&server).get("/ping").await;
    assert_eq!(response.ok(), Some(Value::String("pong".into())));
}
