//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] registers the configured endpoints, installs one handler
//! per route, and serves them next to the liveness route.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Liveness — always `200 OK`, no auth. |
//! | `GET` `POST` `PUT` `DELETE` | `/{prefix}`, `/{prefix}/`, `/{prefix}/{*rest}` | Bearer auth → capability check → forward to the route's backend. |
//!
//! Every proxied request walks
//! `Received → Identity Resolved → Authorized → Forwarded → Responded`,
//! leaving early with `401`, `403`, or `502`/`504`.

use crate::auth::{RoleTable, StaticTokenResolver, bearer_credential};
use crate::backend::{DescriptorProbe, Forwarder, REQUEST_ID_HEADER};
use crate::config::ApimanConfig;
use crate::error::{GatewayError, GatewayResult, StartupError};
use crate::router::{Registration, Route, RouteRegistrar, RouteTable};
use apiman_kernel::gateway::{IdentityResolver, PermissionGate, ProxyRequest, ProxyResponse};
use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{Request, State},
    response::{IntoResponse, Response},
    routing::{MethodRouter, get},
};
use http_body_util::LengthLimitError;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const WELCOME_MESSAGE: &str = "Welcome to the API Manager!";

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state injected into every handler.  Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    resolver: Arc<dyn IdentityResolver>,
    gate: Arc<dyn PermissionGate>,
    forwarder: Arc<Forwarder>,
    max_body_bytes: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

/// A built application: the axum router plus the registration report it was
/// built from.
pub struct GatewayApp {
    pub router: Router,
    pub registration: Registration,
}

pub struct GatewayServer {
    config: ApimanConfig,
    resolver: Arc<dyn IdentityResolver>,
    gate: Arc<dyn PermissionGate>,
}

impl GatewayServer {
    /// Create a server whose identity and role tables come from
    /// `config.auth`.
    pub fn new(config: ApimanConfig) -> Self {
        let resolver = Arc::new(StaticTokenResolver::new(config.auth.tokens.clone()));
        let gate = Arc::new(RoleTable::new(&config.auth.roles));
        Self {
            config,
            resolver,
            gate,
        }
    }

    /// Replace the identity resolver (e.g. with a verifying token scheme).
    pub fn with_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the permission gate.
    pub fn with_permission_gate(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &ApimanConfig {
        &self.config
    }

    /// Register the configured endpoints and build the axum [`Router`].
    ///
    /// Malformed or duplicate descriptors are skipped and listed in
    /// [`GatewayApp::registration`]; they never fail the build.
    pub fn build_app(&self) -> Result<GatewayApp, StartupError> {
        self.config.server.validate()?;

        let registration = RouteRegistrar::new().register(&self.config.endpoints);
        let state = AppState {
            resolver: Arc::clone(&self.resolver),
            gate: Arc::clone(&self.gate),
            forwarder: Arc::new(Forwarder::new(&self.config.server)?),
            max_body_bytes: self.config.server.max_body_bytes,
        };

        let router = install_routes(
            Router::new().route("/", get(welcome_handler)),
            &registration.table,
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

        Ok(GatewayApp {
            router,
            registration,
        })
    }

    /// Bind `server.host:server.port` and serve until Ctrl-C / SIGTERM.
    pub async fn start(self) -> Result<(), StartupError> {
        let app = self.build_app()?;
        let table = &app.registration.table;

        if !app.registration.rejected.is_empty() {
            warn!(
                rejected = app.registration.rejected.len(),
                "some endpoints were not registered"
            );
        }
        if table.is_empty() {
            warn!("no routes registered; only the liveness route is served");
        }

        // Dropping the set on return aborts probes that are still running.
        let _probes = if self.config.server.probe_descriptors {
            Some(Arc::new(DescriptorProbe::with_default_client()?).spawn_all(table))
        } else {
            None
        };

        let addr = self.config.server.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| StartupError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!(addr = %addr, routes = table.len(), "apiman gateway listening");

        axum::serve(listener, app.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(StartupError::Serve)?;

        info!("apiman gateway stopped");
        Ok(())
    }
}

/// Install `GET/POST/PUT/DELETE` handlers for every route.
fn install_routes(mut router: Router<AppState>, table: &RouteTable) -> Router<AppState> {
    for route in table.iter() {
        let methods = route_methods(Arc::clone(route));
        router = router
            .route(&route.mount_path(), methods.clone())
            .route(&route.trailing_slash_path(), methods.clone())
            .route(&route.subtree_path(), methods);
    }
    router
}

/// Handler set bound to exactly one route.  The closure owns its own
/// `Arc<Route>`, so no two routes share descriptor state.
fn route_methods(route: Arc<Route>) -> MethodRouter<AppState> {
    let handler = move |State(state): State<AppState>, request: Request| {
        let route = Arc::clone(&route);
        async move { proxy_handler(state, route, request).await }
    };
    get(handler.clone())
        .post(handler.clone())
        .put(handler.clone())
        .delete(handler)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /` — liveness probe.
async fn welcome_handler() -> impl IntoResponse {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

async fn proxy_handler(state: AppState, route: Arc<Route>, request: Request) -> Response {
    match dispatch(&state, &route, request).await {
        Ok(resp) => build_axum_response(resp),
        Err(err) => err.into_response(),
    }
}

/// Resolve identity, check the capability, then forward.  Stops at the
/// first failure.
async fn dispatch(
    state: &AppState,
    route: &Route,
    request: Request,
) -> GatewayResult<ProxyResponse> {
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

    let identity = state
        .resolver
        .resolve(bearer_credential(&parts.headers))
        .await
        .inspect_err(|e| {
            warn!(
                request_id = %request_id,
                capability = %route.capability,
                resolver   = state.resolver.name(),
                error      = %e,
                "rejected request: unauthenticated"
            );
        })?;

    state
        .gate
        .authorize(&identity.role, &route.capability)
        .into_result(&identity.role, &route.capability)
        .inspect_err(|e| {
            warn!(
                request_id = %request_id,
                user       = %identity.username,
                error      = %e,
                "rejected request: permission denied"
            );
        })?;

    let body = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| body_error(e, state.max_body_bytes))?;

    let incoming = ProxyRequest::new(request_id.clone(), parts.method, parts.uri.path())
        .with_query(parts.uri.query())
        .with_headers(parts.headers)
        .with_body(body);

    let resp = state
        .forwarder
        .forward(route, incoming, &identity)
        .await
        .inspect_err(|e| {
            error!(
                request_id = %request_id,
                route      = route.index,
                capability = %route.capability,
                error      = %e,
                "forwarding failed"
            );
        })?;

    info!(
        request_id = %request_id,
        route      = route.index,
        backend    = %resp.backend,
        status     = resp.status.as_u16(),
        latency_ms = resp.latency_ms,
        "← relayed backend response"
    );
    Ok(resp)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn body_error(err: axum::Error, limit: usize) -> GatewayError {
    let inner = err.into_inner();
    if inner.downcast_ref::<LengthLimitError>().is_some() {
        GatewayError::PayloadTooLarge { limit }
    } else {
        GatewayError::InvalidRequest(format!("failed to read request body: {inner}"))
    }
}

fn build_axum_response(resp: ProxyResponse) -> Response {
    let mut out = Response::new(Body::from(resp.body));
    *out.status_mut() = resp.status;
    *out.headers_mut() = resp.headers;
    out
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, draining in-flight requests");
        }
        () = terminate => {
            info!("Received SIGTERM, draining in-flight requests");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
