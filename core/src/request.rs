//! Request model: methods, content types, descriptors, and per-call options.
//!
//! A [`RequestDescriptor`] is the concrete, immutable value handed to a
//! transport. [`RequestOptions`] is the configurable counterpart: each
//! transport-relevant field may be a literal, a reactive cell, or a function
//! of the action payload, and is resolved fresh per attempt. Behavioral
//! options (debounce, cache, overlays, callbacks) live elsewhere by
//! construction, so a transport can never observe them.

use crate::source::ValueSource;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Request headers, ordered by name.
pub type Headers = BTreeMap<String, String>;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl Method {
    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Whether requests with this method conventionally carry a body.
    #[must_use]
    pub const fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body encoding for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    /// `application/x-www-form-urlencoded`
    UrlEncode,
    /// `application/json`
    Json,
    /// `multipart/form-data`
    FormData,
    /// Any other MIME type, passed through verbatim.
    Other(String),
}

impl ContentType {
    /// The MIME type sent in the `Content-Type` header.
    #[must_use]
    pub fn mime(&self) -> &str {
        match self {
            Self::UrlEncode => "application/x-www-form-urlencoded",
            Self::Json => "application/json",
            Self::FormData => "multipart/form-data",
            Self::Other(mime) => mime,
        }
    }
}

/// The concrete request handed to a transport.
///
/// Built fresh per attempt by [`RequestOptions::resolve`]; never mutated
/// afterwards. Cancellation travels separately, as a token argument on the
/// transport call.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    /// Absolute URL, or a path resolved against a client base descriptor.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Query parameters.
    pub params: Option<Value>,
    /// Request body payload.
    pub data: Option<Value>,
    /// Merged headers, including the derived `Content-Type`.
    pub headers: Headers,
    /// Body encoding.
    pub content_type: Option<ContentType>,
    /// Transport-level timeout, delegated entirely to the transport.
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// Create a descriptor for `url` with defaults everywhere else.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Per-call request configuration with invocation-time resolution.
pub struct RequestOptions<P = ()> {
    /// Target URL or path.
    pub url: Option<ValueSource<String, P>>,
    /// HTTP method.
    pub method: Method,
    /// Query parameters.
    pub params: Option<ValueSource<Value, P>>,
    /// Request body payload.
    pub data: Option<ValueSource<Value, P>>,
    /// Body encoding.
    pub content_type: Option<ValueSource<ContentType, P>>,
    /// Extra headers merged over the client base headers.
    pub headers: Option<ValueSource<Headers, P>>,
    /// Transport-level timeout.
    pub timeout: Option<Duration>,
}

impl<P> std::fmt::Debug for RequestOptions<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOptions")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<P> Clone for RequestOptions<P> {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            method: self.method,
            params: self.params.clone(),
            data: self.data.clone(),
            content_type: self.content_type.clone(),
            headers: self.headers.clone(),
            timeout: self.timeout,
        }
    }
}

impl<P> Default for RequestOptions<P> {
    fn default() -> Self {
        Self {
            url: None,
            method: Method::Get,
            params: None,
            data: None,
            content_type: None,
            headers: None,
            timeout: None,
        }
    }
}

impl<P> RequestOptions<P> {
    /// Options targeting `url` with defaults everywhere else.
    #[must_use]
    pub fn url(url: impl Into<ValueSource<String, P>>) -> Self {
        Self {
            url: Some(url.into()),
            method: Method::Get,
            params: None,
            data: None,
            content_type: None,
            headers: None,
            timeout: None,
        }
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set query parameters.
    #[must_use]
    pub fn with_params(mut self, params: impl Into<ValueSource<Value, P>>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Set the request body payload.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<ValueSource<Value, P>>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the body encoding.
    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(ValueSource::Literal(content_type));
        self
    }

    /// Set extra headers.
    #[must_use]
    pub fn with_headers(mut self, headers: impl Into<ValueSource<Headers, P>>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    /// Set the transport-level timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the concrete descriptor for this invocation.
    ///
    /// Fields resolve against the optional client base descriptor: a relative
    /// per-call URL is joined onto the base URL, headers merge base-first so
    /// per-call entries win, and a resolved content type contributes the
    /// final `Content-Type` header.
    #[must_use]
    pub fn resolve(&self, base: Option<&RequestDescriptor>, payload: Option<&P>) -> RequestDescriptor {
        let url = self.url.as_ref().map(|source| source.resolve(payload));
        let content_type = self
            .content_type
            .as_ref()
            .map(|source| source.resolve(payload));

        let mut descriptor = RequestDescriptor {
            url: join_url(base.map(|b| b.url.as_str()), url.as_deref()),
            method: self.method,
            params: self
                .params
                .as_ref()
                .map(|source| source.resolve(payload))
                .or_else(|| base.and_then(|b| b.params.clone())),
            data: self
                .data
                .as_ref()
                .map(|source| source.resolve(payload))
                .or_else(|| base.and_then(|b| b.data.clone())),
            headers: Headers::new(),
            content_type: content_type.clone().or_else(|| base.and_then(|b| b.content_type.clone())),
            timeout: self.timeout.or_else(|| base.and_then(|b| b.timeout)),
        };

        descriptor.headers = merge_headers(
            base.map(|b| &b.headers),
            self.headers
                .as_ref()
                .map(|source| source.resolve(payload))
                .as_ref(),
            descriptor.content_type.as_ref(),
        );
        descriptor
    }
}

/// Join a per-call URL onto an optional base URL.
///
/// An absolute per-call URL replaces the base; a relative one is appended
/// with exactly one separating slash.
#[must_use]
pub fn join_url(base: Option<&str>, url: Option<&str>) -> String {
    match (base.filter(|b| !b.is_empty()), url) {
        (_, Some(url)) if url.starts_with("http://") || url.starts_with("https://") => {
            url.to_owned()
        }
        (Some(base), Some(url)) => {
            format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
        }
        (Some(base), None) => base.to_owned(),
        (None, Some(url)) => url.to_owned(),
        (None, None) => String::new(),
    }
}

/// Merge base headers, per-call headers, and the derived `Content-Type`.
///
/// Later sources win on name collisions; the content type always has the
/// final say on `Content-Type`.
#[must_use]
pub fn merge_headers(
    base: Option<&Headers>,
    extra: Option<&Headers>,
    content_type: Option<&ContentType>,
) -> Headers {
    let mut merged = base.cloned().unwrap_or_default();
    if let Some(extra) = extra {
        for (name, value) in extra {
            merged.insert(name.clone(), value.clone());
        }
    }
    if let Some(ct) = content_type {
        merged.insert("Content-Type".to_owned(), ct.mime().to_owned());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn join_url_appends_relative_paths() {
        assert_eq!(
            join_url(Some("https://api.example.com/"), Some("/users")),
            "https://api.example.com/users"
        );
        assert_eq!(join_url(None, Some("/users")), "/users");
        assert_eq!(join_url(Some("https://api.example.com"), None), "https://api.example.com");
    }

    #[test]
    fn join_url_keeps_absolute_urls() {
        assert_eq!(
            join_url(Some("https://api.example.com"), Some("https://other.example.com/x")),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn merge_headers_later_sources_win() {
        let merged = merge_headers(
            Some(&headers(&[("X-Base", "1"), ("X-Both", "base")])),
            Some(&headers(&[("X-Both", "call")])),
            Some(&ContentType::Json),
        );
        assert_eq!(merged.get("X-Base").map(String::as_str), Some("1"));
        assert_eq!(merged.get("X-Both").map(String::as_str), Some("call"));
        assert_eq!(
            merged.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn resolve_merges_base_descriptor() {
        let base = RequestDescriptor {
            url: "https://api.example.com".to_owned(),
            headers: headers(&[("Authorization", "Bearer t")]),
            ..RequestDescriptor::default()
        };
        let options: RequestOptions<u32> = RequestOptions::url(ValueSource::compute(
            |id: Option<&u32>| format!("/users/{}", id.copied().unwrap_or(0)),
        ))
        .with_params(ValueSource::compute(|id: Option<&u32>| json!({ "id": id.copied() })))
        .with_content_type(ContentType::Json);

        let descriptor = options.resolve(Some(&base), Some(&3));
        assert_eq!(descriptor.url, "https://api.example.com/users/3");
        assert_eq!(descriptor.params, Some(json!({ "id": 3 })));
        assert_eq!(
            descriptor.headers.get("Authorization").map(String::as_str),
            Some("Bearer t")
        );
        assert_eq!(
            descriptor.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn content_type_mime_mapping() {
        assert_eq!(ContentType::UrlEncode.mime(), "application/x-www-form-urlencoded");
        assert_eq!(ContentType::FormData.mime(), "multipart/form-data");
        assert_eq!(ContentType::Other("text/csv".into()).mime(), "text/csv");
    }
}
