//! Endpoint list → route table.
//!
//! Descriptors are processed in input order.  A malformed descriptor, or one
//! whose prefix an earlier descriptor already claimed, is reported and
//! skipped; the remaining descriptors still register.

use apiman_kernel::gateway::{EndpointSpec, RegistrationError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Route
// ─────────────────────────────────────────────────────────────────────────────

/// A registered endpoint, bound once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Position of the descriptor in the configured list.
    pub index: usize,
    /// Capability required to use this route (the descriptor's `name`).
    pub capability: String,
    /// Normalized prefix, without leading or trailing `/`.
    pub prefix: String,
    /// Backend base URL without trailing `/`.
    pub backend_url: String,
    /// The descriptor as configured.
    pub spec: EndpointSpec,
}

impl Route {
    fn from_spec(index: usize, spec: &EndpointSpec) -> Self {
        Self {
            index,
            capability: spec.name.clone(),
            prefix: spec.normalized_prefix().to_string(),
            backend_url: spec.backend_base().to_string(),
            spec: spec.clone(),
        }
    }

    /// Exact mount path, e.g. `/ocr-svc`.
    pub fn mount_path(&self) -> String {
        format!("/{}", self.prefix)
    }

    /// Prefix with a trailing slash, e.g. `/ocr-svc/`.  The catch-all
    /// below does not match an empty remainder.
    pub fn trailing_slash_path(&self) -> String {
        format!("/{}/", self.prefix)
    }

    /// Catch-all mount path for everything below the prefix, e.g.
    /// `/ocr-svc/{*rest}`.
    pub fn subtree_path(&self) -> String {
        format!("/{}/{{*rest}}", self.prefix)
    }

    /// Backend URL for an inbound `path_and_query`.  The path is appended
    /// as-is; the public prefix is not stripped.
    pub fn target_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.backend_url, path_and_query)
    }

    /// `{backend}/openapi.json`, probed at startup.
    pub fn descriptor_url(&self) -> String {
        format!("{}/openapi.json", self.backend_url)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RouteTable
// ─────────────────────────────────────────────────────────────────────────────

/// Routes in registration order, keyed by prefix.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    by_prefix: HashMap<String, usize>,
}

impl RouteTable {
    pub fn get(&self, prefix: &str) -> Option<&Arc<Route>> {
        self.by_prefix
            .get(prefix.trim_matches('/'))
            .map(|&slot| &self.routes[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn push(&mut self, route: Route) {
        self.by_prefix.insert(route.prefix.clone(), self.routes.len());
        self.routes.push(Arc::new(route));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RouteRegistrar
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a registration pass.
#[derive(Debug, Default)]
pub struct Registration {
    pub table: RouteTable,
    /// One entry per skipped descriptor, in input order.
    pub rejected: Vec<RegistrationError>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RouteRegistrar;

impl RouteRegistrar {
    pub fn new() -> Self {
        Self
    }

    /// Register `endpoints` in order.  First descriptor to claim a prefix
    /// wins.
    pub fn register(&self, endpoints: &[EndpointSpec]) -> Registration {
        let mut registration = Registration::default();

        for (index, spec) in endpoints.iter().enumerate() {
            if let Err(err) = spec.validate(index) {
                warn!(index, name = %spec.name, error = %err, "skipping malformed endpoint");
                registration.rejected.push(err);
                continue;
            }

            let prefix = spec.normalized_prefix();
            if let Some(existing) = registration.table.get(prefix) {
                let err = RegistrationError::DuplicatePrefix {
                    index,
                    name: spec.name.clone(),
                    prefix: prefix.to_string(),
                    claimed_by: existing.capability.clone(),
                };
                warn!(index, name = %spec.name, error = %err, "skipping duplicate prefix");
                registration.rejected.push(err);
                continue;
            }

            let route = Route::from_spec(index, spec);
            info!(
                index,
                capability = %route.capability,
                prefix     = %route.mount_path(),
                backend    = %route.backend_url,
                "registered route"
            );
            registration.table.push(route);
        }

        registration
    }
}

// =============================================================================
// Tests
// =============================================================================
