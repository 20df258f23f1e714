//! `apiman-kernel` — contract crate for the apiman API gateway.
//!
//! Holds the data model shared by every gateway component (endpoint
//! descriptors, identities, proxy request/response values), the
//! [`IdentityResolver`](gateway::IdentityResolver) and
//! [`PermissionGate`](gateway::PermissionGate) seams, the kernel error
//! taxonomy, and the multi-format configuration loader.
//!
//! Nothing in this crate performs network I/O; concrete resolvers, the route
//! registrar, the forwarder and the HTTP facade live in `apiman-gateway`.

// gateway contract module
pub mod gateway;

// config module
#[cfg(feature = "config")]
pub mod config;
