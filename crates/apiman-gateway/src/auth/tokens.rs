//! Fixed bearer-token identity table.
//!
//! Resolves a bearer token by exact lookup in a table loaded at startup.
//! The default table recognises `admin_token` and `user_token`; anything
//! else, including a missing credential, is `401 Unauthorized`.

use crate::config::TokenGrant;
use apiman_kernel::gateway::{AuthError, Identity, IdentityResolver};
use async_trait::async_trait;
use std::collections::HashMap;

/// [`IdentityResolver`] backed by an immutable token → identity map.
pub struct StaticTokenResolver {
    identities: HashMap<String, Identity>,
}

impl StaticTokenResolver {
    /// Build the resolver from configured grants.  A token listed twice keeps
    /// its last grant.
    pub fn new(grants: impl IntoIterator<Item = TokenGrant>) -> Self {
        Self {
            identities: grants
                .into_iter()
                .map(|g| (g.token, Identity::new(g.username, g.role)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl Default for StaticTokenResolver {
    /// The reference table: `admin_token` → admin, `user_token` → user.
    fn default() -> Self {
        Self::new(crate::config::AuthSettings::default().tokens)
    }
}

#[async_trait]
impl IdentityResolver for StaticTokenResolver {
    fn name(&self) -> &str {
        "static-token"
    }

    async fn resolve(&self, credential: Option<&str>) -> Result<Identity, AuthError> {
        let token = credential.ok_or_else(AuthError::missing_credential)?;
        self.identities
            .get(token)
            .cloned()
            .ok_or_else(AuthError::invalid_credential)
    }
}
