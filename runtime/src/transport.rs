//! HTTP transport over reqwest.
//!
//! Translates a [`RequestDescriptor`] into a reqwest call: query pairs from
//! the params object, body encoding from the content type, per-request
//! timeout, and cooperative cancellation through the attempt's token. Bodies
//! are decoded as JSON when possible and passed through as a raw string
//! otherwise.

use futures::future::BoxFuture;
use reqflow_core::capability::Transport;
use reqflow_core::request::{ContentType, Method, RequestDescriptor};
use reqflow_core::TransportError;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Transport around a default reqwest client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport around a preconfigured reqwest client (proxies, TLS,
    /// connection pools).
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build(&self, request: &RequestDescriptor) -> reqwest::RequestBuilder {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        };
        let mut builder = self.client.request(method, &request.url);

        if let Some(params) = &request.params {
            builder = builder.query(&query_pairs(params));
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(data) = &request.data {
            let encoding = request.content_type.as_ref().unwrap_or(&ContentType::Json);
            builder = match encoding {
                ContentType::Json => builder.json(data),
                ContentType::UrlEncode => builder.form(&query_pairs(data)),
                other => builder
                    .header(reqwest::header::CONTENT_TYPE, other.mime())
                    .body(data.to_string()),
            };
        }
        builder
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: RequestDescriptor,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Value, TransportError>> {
        let builder = self.build(&request);
        Box::pin(async move {
            let response = tokio::select! {
                () = cancel.cancelled() => return Err(TransportError::Aborted),
                response = builder.send() => response.map_err(classify)?,
            };

            let status = response.status();
            let body = tokio::select! {
                () = cancel.cancelled() => return Err(TransportError::Aborted),
                body = response.text() => body.map_err(classify)?,
            };

            if !status.is_success() {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
        })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_decode() {
        TransportError::Decode(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}

/// Flatten a JSON object into query/form pairs. Scalars serialize bare,
/// nested structures serialize as JSON text, non-objects are skipped.
fn query_pairs(value: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = value else {
        tracing::warn!("params/form payload is not an object, skipping");
        return Vec::new();
    };
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let rendered = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), rendered)
        })
        .collect()
}
