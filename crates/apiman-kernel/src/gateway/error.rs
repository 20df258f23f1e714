//! Gateway error types for `apiman-kernel`.
//!
//! [`AuthError`] covers the per-request identity and permission failures, and
//! [`RegistrationError`] covers every defect that can be detected in an
//! endpoint descriptor *before* any network I/O occurs.  Runtime forwarding
//! failures (connection refused, upstream timeout, …) belong in the gateway
//! implementation crate (`apiman-gateway`).

use thiserror::Error;

/// Authentication / authorization failure for a single request.
///
/// Both variants are terminal for the request: `Unauthorized` maps to
/// `401`, `Denied` to `403`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    /// No credential was presented, or the credential is not recognised.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller's role does not carry the capability the route requires.
    #[error("permission denied: role '{role}' lacks capability '{capability}'")]
    Denied { role: String, capability: String },
}

impl AuthError {
    /// Shorthand for the "no credential presented" case.
    pub fn missing_credential() -> Self {
        AuthError::Unauthorized("missing bearer credential".to_string())
    }

    /// Shorthand for the "credential not recognised" case.
    pub fn invalid_credential() -> Self {
        AuthError::Unauthorized("invalid bearer credential".to_string())
    }
}

/// Defect in a single endpoint descriptor found during route registration.
///
/// A registration error never aborts registration of the other descriptors;
/// the registrar reports it and skips the offending entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistrationError {
    /// A required field is missing or syntactically invalid.
    #[error("endpoint #{index} ('{name}') is malformed: {reason}")]
    MalformedEndpoint {
        index: usize,
        name: String,
        reason: String,
    },

    /// The descriptor's prefix is already claimed by an earlier descriptor.
    #[error("endpoint #{index} ('{name}') reuses prefix '/{prefix}' already claimed by '{claimed_by}'")]
    DuplicatePrefix {
        index: usize,
        name: String,
        prefix: String,
        claimed_by: String,
    },
}

impl RegistrationError {
    /// Position of the offending descriptor in the configured list.
    pub fn index(&self) -> usize {
        match self {
            RegistrationError::MalformedEndpoint { index, .. }
            | RegistrationError::DuplicatePrefix { index, .. } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_message_names_role_and_capability() {
        let err = AuthError::Denied {
            role: "user".to_string(),
            capability: "config".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "permission denied: role 'user' lacks capability 'config'"
        );
    }

    #[test]
    fn registration_error_reports_index() {
        let err = RegistrationError::DuplicatePrefix {
            index: 3,
            name: "ner".to_string(),
            prefix: "svc".to_string(),
            claimed_by: "ocr".to_string(),
        };
        assert_eq!(err.index(), 3);
        assert!(err.to_string().contains("'/svc'"));
    }
}
