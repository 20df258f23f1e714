//! Identity resolution and permission checks.

mod roles;
mod tokens;

pub use roles::RoleTable;
pub use tokens::StaticTokenResolver;

use axum::http::{HeaderMap, header};

/// Extract the credential from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively.  Returns `None` when the header
/// is absent, not valid UTF-8, uses another scheme, or carries an empty token.
pub fn bearer_credential(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
