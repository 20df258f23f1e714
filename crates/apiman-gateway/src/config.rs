//! Gateway configuration file.
//!
//! ```yaml
//! endpoints:
//!   - name: ocr
//!     prefix: ocr-svc
//!     url: http://localhost:9001
//! server:
//!   port: 8000
//! ```
//!
//! Only `endpoints` is required.  `server` and `auth` fall back to
//! [`ServerSettings::default()`] and [`AuthSettings::default()`]; the latter
//! is the built-in `admin_token` / `user_token` seed.

use crate::error::StartupError;
use apiman_kernel::config::{ConfigResult, load_with_env};
use apiman_kernel::gateway::EndpointSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Prefix for environment overrides, e.g. `APIMAN_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "APIMAN";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApimanConfig {
    pub endpoints: Vec<EndpointSpec>,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

impl ApimanConfig {
    /// Load from `path` (format picked by extension), applying `${VAR}`
    /// substitution and `APIMAN_*` overrides.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        load_with_env(path, ENV_PREFIX)
    }

    /// Build a config in code, with default server and auth settings.
    pub fn with_endpoints(endpoints: Vec<EndpointSpec>) -> Self {
        Self {
            endpoints,
            server: ServerSettings::default(),
            auth: AuthSettings::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server settings
// ─────────────────────────────────────────────────────────────────────────────

/// Listener and forwarding knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound for a whole backend call, connect included.
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Inbound bodies larger than this are rejected with `413`.
    pub max_body_bytes: usize,
    /// Relay backend 5xx responses verbatim.  When `false` they surface as
    /// `BACKEND_ERROR`.
    pub relay_upstream_errors: bool,
    /// Fetch `{url}/openapi.json` from every backend after startup and log
    /// the outcome.
    pub probe_descriptors: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            max_body_bytes: 10 * 1024 * 1024,
            relay_upstream_errors: true,
            probe_descriptors: true,
        }
    }
}

impl ServerSettings {
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.request_timeout_ms == 0 {
            return Err(StartupError::Settings(
                "request_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(StartupError::Settings(
                "connect_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(StartupError::Settings(
                "max_body_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth settings
// ─────────────────────────────────────────────────────────────────────────────

/// One recognised bearer token and the identity it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub token: String,
    pub username: String,
    pub role: String,
}

impl TokenGrant {
    pub fn new(
        token: impl Into<String>,
        username: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
            role: role.into(),
        }
    }
}

/// Identity and role tables, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_tokens")]
    pub tokens: Vec<TokenGrant>,
    #[serde(default = "default_roles")]
    pub roles: BTreeMap<String, Vec<String>>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            tokens: default_tokens(),
            roles: default_roles(),
        }
    }
}

fn default_tokens() -> Vec<TokenGrant> {
    vec![
        TokenGrant::new("admin_token", "admin", "admin"),
        TokenGrant::new("user_token", "user", "user"),
    ]
}

fn default_roles() -> BTreeMap<String, Vec<String>> {
    let caps = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
    BTreeMap::from([
        ("user".to_string(), caps(&["ocr", "ner"])),
        ("admin".to_string(), caps(&["ocr", "ner", "config"])),
    ])
}
