//! `apiman-gateway` — role-gated HTTP API gateway.
//!
//! This crate implements the contracts defined in `apiman-kernel::gateway`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`IdentityResolver`](gateway::IdentityResolver) | [`auth::StaticTokenResolver`] |
//! | [`PermissionGate`](gateway::PermissionGate) | [`auth::RoleTable`] |
//!
//! [`router::RouteRegistrar`] turns the configured endpoint list into routes,
//! [`backend::Forwarder`] relays authorized requests, and
//! [`server::GatewayServer`] wires everything into an axum HTTP service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use apiman_gateway::config::ApimanConfig;
//! use apiman_gateway::gateway::EndpointSpec;
//! use apiman_gateway::server::GatewayServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ApimanConfig::with_endpoints(vec![
//!         EndpointSpec::new("ocr", "ocr-svc", "http://localhost:9001"),
//!         EndpointSpec::new("config", "cfg-svc", "http://localhost:9002"),
//!     ]);
//!
//!     GatewayServer::new(config).start().await.unwrap();
//! }
//! ```

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod router;
pub mod server;

// Re-export the kernel gateway types for convenience.
pub use apiman_kernel::gateway;
