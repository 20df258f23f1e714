//! Transient request / response values for a single forwarding operation.
//!
//! Headers use [`http::HeaderMap`], so names are case-insensitive and a
//! name may carry several values.  Bodies are [`Bytes`] so handing a body
//! from the inbound side to the outbound client never copies it.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// An inbound request captured by the gateway facade for forwarding.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    /// Correlation id, propagated to the backend as `x-request-id`.
    pub id: String,
    pub method: Method,
    /// Original request path, including the public prefix.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyRequest {
    /// Construct a minimal request with the given id, method, and path.
    pub fn new(id: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Builder helper: set the query string.
    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query.filter(|q| !q.is_empty()).map(str::to_string);
        self
    }

    /// Builder helper: append a header value (existing values are kept).
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Builder helper: replace the whole header map.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Path plus `?query` when a query string is present.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────────────────────────────────────

/// A backend response relayed back through the gateway.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Capability name of the route that produced this response.
    pub backend: String,
    /// Round-trip latency in milliseconds (gateway → backend → gateway).
    pub latency_ms: u64,
}

impl ProxyResponse {
    /// Construct a minimal response.
    pub fn new(status: StatusCode, backend: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            backend: backend.into(),
            latency_ms: 0,
        }
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}
