//! Request forwarder.
//!
//! [`Forwarder`] re-issues an authorized inbound request against the route's
//! backend and relays the backend's status, headers, and body.
//!
//! The proxy is path-preserving: the target is `{backend}{original path}`,
//! the public prefix included.  Bodies are buffered in both directions.

use crate::config::ServerSettings;
use crate::error::ForwardError;
use crate::router::Route;
use apiman_kernel::gateway::{Identity, ProxyRequest, ProxyResponse};
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Correlation header set on every outbound request and relayed response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Connection-scoped headers that must not cross the proxy, plus the ones
/// the HTTP client recomputes.
static SKIPPED_HEADERS: [HeaderName; 10] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
    header::CONTENT_LENGTH,
];

/// Shared outbound client.  One instance serves every route.
pub struct Forwarder {
    client: Client,
    timeout_ms: u64,
    relay_upstream_errors: bool,
}

impl Forwarder {
    pub fn new(settings: &ServerSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            timeout_ms: settings.request_timeout_ms,
            relay_upstream_errors: settings.relay_upstream_errors,
        })
    }

    /// Forward `incoming` to `route`.  The caller has already authorized
    /// `identity` for `route.capability`.
    #[instrument(
        skip_all,
        fields(
            request_id = %incoming.id,
            capability = %route.capability,
            user       = %identity.username,
        )
    )]
    pub async fn forward(
        &self,
        route: &Route,
        incoming: ProxyRequest,
        identity: &Identity,
    ) -> Result<ProxyResponse, ForwardError> {
        let url = route.target_url(&incoming.path_and_query());
        debug!(method = %incoming.method, url = %url, "forwarding to backend");

        let start = Instant::now();
        let request_id = HeaderValue::from_str(&incoming.id).ok();

        let mut headers = relayable(&incoming.headers);
        if let Some(id) = &request_id {
            headers.insert(REQUEST_ID_HEADER, id.clone());
        }

        let mut builder = self
            .client
            .request(incoming.method.clone(), &url)
            .headers(headers);
        if !incoming.body.is_empty() {
            builder = builder.body(incoming.body);
        }

        let upstream = builder
            .send()
            .await
            .map_err(|e| self.classify(route, e))?;

        let status = upstream.status();
        let mut response_headers = relayable(upstream.headers());
        let body = upstream.bytes().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout(route)
            } else {
                ForwardError::BackendError {
                    backend: route.capability.clone(),
                    status: Some(status.as_u16()),
                    message: format!("failed to read response body: {e}"),
                }
            }
        })?;

        if status.is_server_error() && !self.relay_upstream_errors {
            warn!(status = status.as_u16(), "backend returned a server error");
            return Err(ForwardError::BackendError {
                backend: route.capability.clone(),
                status: Some(status.as_u16()),
                message: format!(
                    "backend responded with {status}: {}",
                    String::from_utf8_lossy(&body)
                ),
            });
        }

        if let Some(id) = request_id {
            response_headers.insert(REQUEST_ID_HEADER, id);
        }

        let mut resp = ProxyResponse::new(status, route.capability.clone()).with_body(body);
        resp.headers = response_headers;
        resp.latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(resp)
    }

    fn classify(&self, route: &Route, err: reqwest::Error) -> ForwardError {
        if err.is_timeout() {
            self.timeout(route)
        } else {
            ForwardError::BackendUnreachable {
                backend: route.capability.clone(),
                source: err,
            }
        }
    }

    fn timeout(&self, route: &Route) -> ForwardError {
        ForwardError::BackendTimeout {
            backend: route.capability.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

/// Copy `headers`, dropping hop-by-hop and client-managed entries, plus any
/// header the `Connection` header names.  Multi-valued headers keep all
/// their values.
fn relayable(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if SKIPPED_HEADERS.contains(name) || listed.contains(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}
