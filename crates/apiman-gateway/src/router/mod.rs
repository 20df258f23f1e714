//! Route registration.
//!
//! [`RouteRegistrar`] turns the configured endpoint list into an immutable
//! [`RouteTable`].  Each [`Route`] owns its own copy of its descriptor behind
//! an `Arc`, so the handler installed for one prefix can never observe
//! another endpoint's capability or backend.

mod registrar;

pub use registrar::{Registration, Route, RouteRegistrar, RouteTable};
