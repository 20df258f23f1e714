//! Identity and permission seams.
//!
//! The gateway handler calls an [`IdentityResolver`] and then a
//! [`PermissionGate`] before anything is forwarded.  Both are traits so the
//! built-in fixed tables can be replaced by a verifying token scheme without
//! touching callers.

use super::error::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Caller identity derived from a bearer credential.
///
/// Created per request and dropped when the request completes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub role: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of a permission check.  `Denied` is a normal result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// Convert into a `Result`, producing [`AuthError::Denied`] on denial.
    pub fn into_result(self, role: &str, capability: &str) -> Result<(), AuthError> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied => Err(AuthError::Denied {
                role: role.to_string(),
                capability: capability.to_string(),
            }),
        }
    }
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Decision::Allowed
        } else {
            Decision::Denied
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Kernel contract for turning a bearer credential into an [`Identity`].
///
/// Async so that implementations backed by a remote verifier can do I/O.
/// Implementations must be `Send + Sync`; one instance is shared by every
/// request handler.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Stable, human-readable identifier (used in logs).
    fn name(&self) -> &str;

    /// Resolve `credential` (already stripped of its `Bearer ` scheme).
    ///
    /// `None` means the request carried no bearer credential at all and must
    /// fail with [`AuthError::Unauthorized`].
    async fn resolve(&self, credential: Option<&str>) -> Result<Identity, AuthError>;
}

/// Kernel contract for the role → capability check.
///
/// The check is exact-string membership; unknown roles are always denied.
pub trait PermissionGate: Send + Sync {
    fn authorize(&self, role: &str, capability: &str) -> Decision;
}
