//! Gateway kernel contract.
//!
//! This module defines the *data model, trait seams and error taxonomy* of the
//! apiman gateway.  No concrete implementations live here — those belong in
//! `apiman-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              apiman-kernel  (this module)                   │
//! │  EndpointSpec + validate()   Identity   ProxyRequest/Resp   │
//! │  IdentityResolver trait      PermissionGate trait           │
//! │  AuthError                   RegistrationError              │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              apiman-gateway  (runtime crate)                │
//! │  StaticTokenResolver: impl IdentityResolver                 │
//! │  RoleTable: impl PermissionGate                             │
//! │  RouteRegistrar / RouteTable                                │
//! │  Forwarder (reqwest)   DescriptorProbe                      │
//! │  GatewayServer  (axum HTTP facade)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use apiman_kernel::gateway::{EndpointSpec, Decision};
//!
//! let ocr = EndpointSpec::new("ocr", "ocr-svc", "http://localhost:9001");
//! assert!(ocr.validate(0).is_ok());
//! assert_eq!(ocr.normalized_prefix(), "ocr-svc");
//! assert!(Decision::Allowed.is_allowed());
//! ```

pub mod auth;
pub mod endpoint;
pub mod error;
pub mod types;

pub use auth::{Decision, Identity, IdentityResolver, PermissionGate};
pub use endpoint::EndpointSpec;
pub use error::{AuthError, RegistrationError};
pub use types::{ProxyRequest, ProxyResponse};
