//! Best-effort backend descriptor probe.
//!
//! After startup every backend is asked for `{url}/openapi.json`.  The
//! outcome is only logged: a missing or broken descriptor never prevents a
//! route from serving.

use crate::router::{Route, RouteTable};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of probing one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The backend served a JSON descriptor with this many `paths`.
    Described { paths: usize },
    /// The descriptor could not be fetched or decoded.
    Unavailable(String),
}

pub struct DescriptorProbe {
    client: Client,
}

impl DescriptorProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Probe client with a short fixed timeout.
    pub fn with_default_client() -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self::new(client))
    }

    #[instrument(skip_all, fields(capability = %route.capability, url = %route.descriptor_url()))]
    pub async fn probe(&self, route: &Route) -> ProbeOutcome {
        let outcome = match self.fetch(route).await {
            Ok(descriptor) => ProbeOutcome::Described {
                paths: descriptor
                    .get("paths")
                    .and_then(Value::as_object)
                    .map_or(0, |p| p.len()),
            },
            Err(e) => ProbeOutcome::Unavailable(e.to_string()),
        };

        match &outcome {
            ProbeOutcome::Described { paths } => {
                info!(paths, "backend descriptor fetched");
            }
            ProbeOutcome::Unavailable(reason) => {
                warn!(reason = %reason, "backend descriptor unavailable (route stays registered)");
            }
        }
        outcome
    }

    async fn fetch(&self, route: &Route) -> Result<Value, reqwest::Error> {
        self.client
            .get(route.descriptor_url())
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }

    /// Probe every route on its own task.  Dropping the returned set aborts
    /// any probe still in flight.
    pub fn spawn_all(self: Arc<Self>, table: &RouteTable) -> JoinSet<(Arc<Route>, ProbeOutcome)> {
        let mut set = JoinSet::new();
        for route in table.iter() {
            let probe = Arc::clone(&self);
            let route = Arc::clone(route);
            set.spawn(async move {
                let outcome = probe.probe(&route).await;
                (route, outcome)
            });
        }
        set
    }
}
