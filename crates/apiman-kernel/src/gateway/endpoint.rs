//! Endpoint descriptors.
//!
//! An [`EndpointSpec`] is one configured backend: the capability that guards
//! it, the public path prefix it is exposed under, and the backend base URL
//! requests are forwarded to.

use super::error::RegistrationError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Characters that would be interpreted by the route template syntax or that
/// cannot appear in a literal path segment.
const RESERVED_PREFIX_CHARS: &[char] = &['{', '}', '*', '?', '#', '%'];

/// One configured backend, as read from the `endpoints` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Capability identifier; the route is only reachable by roles that
    /// carry exactly this name.
    pub name: String,
    /// Public path segment(s), e.g. `ocr-svc` → `/ocr-svc`.
    pub prefix: String,
    /// Backend base URL, e.g. `http://ocr.internal:9001`.
    pub url: String,
}

impl EndpointSpec {
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            url: url.into(),
        }
    }

    /// Prefix without leading or trailing slashes.
    pub fn normalized_prefix(&self) -> &str {
        self.prefix.trim().trim_matches('/')
    }

    /// Backend base URL without a trailing slash, ready for `base + path`.
    pub fn backend_base(&self) -> &str {
        self.url.trim().trim_end_matches('/')
    }

    /// Structural checks run by the route registrar.
    ///
    /// `index` is the descriptor's position in the configured list and is
    /// carried in the returned error for diagnostics.
    pub fn validate(&self, index: usize) -> Result<(), RegistrationError> {
        let malformed = |reason: String| RegistrationError::MalformedEndpoint {
            index,
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(malformed("name cannot be empty".to_string()));
        }
        if self.name.trim() != self.name {
            return Err(malformed(format!(
                "name '{}' must not carry surrounding whitespace",
                self.name
            )));
        }

        let prefix = self.normalized_prefix();
        if prefix.is_empty() {
            return Err(malformed("prefix cannot be empty".to_string()));
        }
        if prefix
            .chars()
            .any(|c| c.is_whitespace() || RESERVED_PREFIX_CHARS.contains(&c))
        {
            return Err(malformed(format!(
                "prefix '{}' contains whitespace or reserved characters",
                self.prefix
            )));
        }
        if prefix.split('/').any(str::is_empty) {
            return Err(malformed(format!(
                "prefix '{}' contains an empty path segment",
                self.prefix
            )));
        }
        if prefix.split('/').any(|seg| seg.starts_with(':')) {
            return Err(malformed(format!(
                "prefix '{}' has a segment starting with ':'",
                self.prefix
            )));
        }

        if self.url.trim().is_empty() {
            return Err(malformed("url cannot be empty".to_string()));
        }
        let parsed = Url::parse(self.backend_base())
            .map_err(|e| malformed(format!("url '{}' is not a valid URL: {e}", self.url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(malformed(format!(
                "url '{}' must start with http:// or https://",
                self.url
            )));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(malformed(format!("url '{}' has no host", self.url)));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(malformed(format!(
                "url '{}' must not carry a query string or fragment",
                self.url
            )));
        }
        Ok(())
    }
}
