//! End-to-end tests: gateway router in front of real loopback backends.

use apiman_gateway::config::{ApimanConfig, TokenGrant};
use apiman_gateway::gateway::EndpointSpec;
use apiman_gateway::server::{GatewayApp, GatewayServer};
use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::Request,
    http::{self, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::any,
};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

/// Start a backend that echoes what it received as JSON.
///
/// Paths containing `/slow` sleep for two seconds, `/fail` answers `503`, and
/// `/created` answers `201` with a `location` header.
async fn spawn_echo(label: &'static str) -> String {
    let app = Router::new().route(
        "/{*path}",
        any(move |req: Request| async move { echo(label, req).await }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn echo(label: &'static str, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap();
    let path = parts.uri.path().to_string();
    let header_str = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    if path.contains("/slow") {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    if path.contains("/fail") {
        return (StatusCode::SERVICE_UNAVAILABLE, "overloaded").into_response();
    }

    let payload = Json(json!({
        "backend": label,
        "method": parts.method.as_str(),
        "path": path,
        "query": parts.uri.query(),
        "authorization": header_str("authorization"),
        "request_id": header_str("x-request-id"),
        "proxy_authorization": header_str("proxy-authorization"),
        "body": String::from_utf8_lossy(&body),
    }));

    let mut resp = payload.into_response();
    let headers = resp.headers_mut();
    headers.insert("x-backend", HeaderValue::from_static(label));
    headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
    headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
    if path.contains("/created") {
        *resp.status_mut() = StatusCode::CREATED;
        resp.headers_mut()
            .insert(header::LOCATION, HeaderValue::from_static("/items/7"));
    }
    resp
}

async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn gateway_with(config: ApimanConfig) -> GatewayApp {
    let mut config = config;
    config.server.probe_descriptors = false;
    GatewayServer::new(config).build_app().unwrap()
}

/// The three reference services, each on its own backend.
async fn reference_gateway() -> GatewayApp {
    let ocr = spawn_echo("ocr-backend").await;
    let ner = spawn_echo("ner-backend").await;
    let cfg = spawn_echo("cfg-backend").await;
    gateway_with(ApimanConfig::with_endpoints(vec![
        EndpointSpec::new("ocr", "ocr-svc", ocr),
        EndpointSpec::new("ner", "ner-svc", ner),
        EndpointSpec::new("config", "cfg-svc", cfg),
    ]))
}

fn call(method: Method, uri: &str, token: Option<&str>, body: &'static str) -> Request {
    let mut builder = http::Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

async fn send(app: &GatewayApp, req: Request) -> Response {
    app.router.clone().oneshot(req).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Access control
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_reaches_ocr_with_original_path_and_body() {
    let app = reference_gateway().await;
    let resp = send(
        &app,
        call(Method::POST, "/ocr-svc/x", Some("user_token"), "scan me"),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let echoed = json_body(resp).await;
    assert_eq!(echoed["backend"], "ocr-backend");
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["path"], "/ocr-svc/x");
    assert_eq!(echoed["body"], "scan me");
    assert_eq!(echoed["authorization"], "Bearer user_token");
}

#[tokio::test]
async fn user_is_denied_config_but_admin_is_not() {
    let app = reference_gateway().await;

    let denied = send(&app, call(Method::POST, "/cfg-svc/x", Some("user_token"), "")).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    let err = json_body(denied).await;
    assert_eq!(err["error"]["code"], "PERMISSION_DENIED");

    let allowed = send(&app, call(Method::POST, "/cfg-svc/x", Some("admin_token"), "")).await;
    assert_eq!(allowed.status(), StatusCode::OK);
    assert_eq!(json_body(allowed).await["backend"], "cfg-backend");
}

#[tokio::test]
async fn missing_or_unknown_credential_is_unauthorized() {
    let app = reference_gateway().await;

    for token in [None, Some("nope")] {
        let resp = send(&app, call(Method::GET, "/ner-svc/entities", token, "")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "token {token:?}");
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
        assert_eq!(json_body(resp).await["error"]["code"], "UNAUTHORIZED");
    }

    // Wrong scheme carries no bearer credential.
    let basic = http::Request::builder()
        .uri("/ner-svc/entities")
        .header(header::AUTHORIZATION, "Basic dXNlcjp1c2Vy")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, basic).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn configured_tokens_and_roles_replace_the_seed() {
    let url = spawn_echo("ocr-backend").await;
    let mut config = ApimanConfig::with_endpoints(vec![EndpointSpec::new("ocr", "ocr-svc", url)]);
    config.auth.tokens = vec![TokenGrant::new("ops-secret", "ops", "operator")];
    config.auth.roles = [("operator".to_string(), vec!["ocr".to_string()])].into();
    let app = gateway_with(config);

    let ok = send(&app, call(Method::GET, "/ocr-svc", Some("ops-secret"), "")).await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(json_body(ok).await["path"], "/ocr-svc");

    let stale = send(&app, call(Method::GET, "/ocr-svc", Some("user_token"), "")).await;
    assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);
}

// ─────────────────────────────────────────────────────────────────────────────
// Routing
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_route_keeps_its_own_backend_and_capability() {
    let app = reference_gateway().await;

    for (path, backend) in [
        ("/ocr-svc/a", "ocr-backend"),
        ("/ner-svc/b", "ner-backend"),
        ("/cfg-svc/c", "cfg-backend"),
    ] {
        let resp = send(&app, call(Method::GET, path, Some("admin_token"), "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-backend"], backend);
        assert_eq!(json_body(resp).await["path"], path);
    }

    // The last registered route's capability does not leak into the others.
    let ner = send(&app, call(Method::GET, "/ner-svc/b", Some("user_token"), "")).await;
    assert_eq!(ner.status(), StatusCode::OK);
}

#[tokio::test]
async fn all_four_methods_are_forwarded_and_others_rejected() {
    let app = reference_gateway().await;

    for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE] {
        let resp = send(&app, call(method.clone(), "/ocr-svc/doc/1", Some("user_token"), "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["method"], method.as_str());
    }

    let patch = send(&app, call(Method::PATCH, "/ocr-svc/doc/1", Some("user_token"), "")).await;
    assert_eq!(patch.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn query_string_is_preserved() {
    let app = reference_gateway().await;
    let resp = send(
        &app,
        call(Method::GET, "/ner-svc/search?q=rust&lang=en", Some("user_token"), ""),
    )
    .await;
    let echoed = json_body(resp).await;
    assert_eq!(echoed["path"], "/ner-svc/search");
    assert_eq!(echoed["query"], "q=rust&lang=en");
}

#[tokio::test]
async fn trailing_slash_is_forwarded_verbatim() {
    let app = reference_gateway().await;
    let resp = send(&app, call(Method::GET, "/ocr-svc/", Some("user_token"), "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["path"], "/ocr-svc/");
}

#[tokio::test]
async fn duplicate_prefix_keeps_the_first_descriptor() {
    let first = spawn_echo("first").await;
    let second = spawn_echo("second").await;
    let app = gateway_with(ApimanConfig::with_endpoints(vec![
        EndpointSpec::new("ocr", "ocr-svc", first),
        EndpointSpec::new("config", "/ocr-svc/", second),
    ]));
    assert_eq!(app.registration.table.len(), 1);
    assert_eq!(app.registration.rejected.len(), 1);

    // Still gated by `ocr`, still served by the first backend.
    let resp = send(&app, call(Method::GET, "/ocr-svc/x", Some("user_token"), "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-backend"], "first");
}

// ─────────────────────────────────────────────────────────────────────────────
// Relay
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_and_headers_are_relayed() {
    let app = reference_gateway().await;
    let resp = send(&app, call(Method::POST, "/ocr-svc/created", Some("user_token"), "")).await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.headers()[header::LOCATION], "/items/7");
    assert_eq!(resp.headers().get_all(header::SET_COOKIE).iter().count(), 2);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
}

#[tokio::test]
async fn hop_by_hop_request_headers_are_not_forwarded() {
    let app = reference_gateway().await;
    let req = http::Request::builder()
        .uri("/ocr-svc/x")
        .header(header::AUTHORIZATION, "Bearer user_token")
        .header(header::PROXY_AUTHORIZATION, "Basic c2VjcmV0")
        .body(Body::empty())
        .unwrap();
    let echoed = json_body(send(&app, req).await).await;
    assert_eq!(echoed["proxy_authorization"], Value::Null);
}

#[tokio::test]
async fn request_id_is_propagated_and_echoed() {
    let app = reference_gateway().await;

    let req = http::Request::builder()
        .uri("/ocr-svc/x")
        .header(header::AUTHORIZATION, "Bearer user_token")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.headers()["x-request-id"], "req-42");
    assert_eq!(json_body(resp).await["request_id"], "req-42");

    // Without one, the gateway mints an id and uses it on both legs.
    let resp = send(&app, call(Method::GET, "/ocr-svc/x", Some("user_token"), "")).await;
    let minted = resp.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(!minted.is_empty());
    assert_eq!(json_body(resp).await["request_id"], minted.as_str());
}

#[tokio::test]
async fn repeated_gets_are_identical() {
    let app = reference_gateway().await;
    let get = || {
        http::Request::builder()
            .uri("/ner-svc/entities?id=3")
            .header(header::AUTHORIZATION, "Bearer user_token")
            .header("x-request-id", "same")
            .body(Body::empty())
            .unwrap()
    };

    let a = send(&app, get()).await;
    let b = send(&app, get()).await;
    assert_eq!(a.status(), b.status());
    assert_eq!(json_body(a).await, json_body(b).await);
}

#[tokio::test]
async fn backend_server_errors_pass_through_by_default() {
    let app = reference_gateway().await;
    let resp = send(&app, call(Method::GET, "/ocr-svc/fail", Some("user_token"), "")).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"overloaded");
}

#[tokio::test]
async fn backend_server_errors_can_be_normalized() {
    let url = spawn_echo("ocr-backend").await;
    let mut config = ApimanConfig::with_endpoints(vec![EndpointSpec::new("ocr", "ocr-svc", url)]);
    config.server.relay_upstream_errors = false;
    let app = gateway_with(config);

    let resp = send(&app, call(Method::GET, "/ocr-svc/fail", Some("user_token"), "")).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(resp).await["error"]["code"], "BACKEND_ERROR");
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unreachable_backend_is_502() {
    let down = closed_port_url().await;
    let app = gateway_with(ApimanConfig::with_endpoints(vec![EndpointSpec::new(
        "ocr", "ocr-svc", down,
    )]));

    let resp = send(&app, call(Method::POST, "/ocr-svc/x", Some("user_token"), "")).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(resp).await["error"]["code"], "BACKEND_UNREACHABLE");
}

#[tokio::test]
async fn slow_backend_is_504() {
    let url = spawn_echo("ocr-backend").await;
    let mut config = ApimanConfig::with_endpoints(vec![EndpointSpec::new("ocr", "ocr-svc", url)]);
    config.server.request_timeout_ms = 200;
    let app = gateway_with(config);

    let resp = send(&app, call(Method::GET, "/ocr-svc/slow", Some("user_token"), "")).await;
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json_body(resp).await["error"]["code"], "BACKEND_TIMEOUT");
}

#[tokio::test]
async fn denied_requests_never_reach_the_backend() {
    // Even an unreachable backend answers 403 first: the gate runs before
    // any outbound call.
    let down = closed_port_url().await;
    let app = gateway_with(ApimanConfig::with_endpoints(vec![EndpointSpec::new(
        "config", "cfg-svc", down,
    )]));
    let resp = send(&app, call(Method::GET, "/cfg-svc", Some("user_token"), "")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
