//! Outbound client for the external OSRM-style routing endpoint.
//!
//! `GET {base_url}/route?pairs=lat,lng;lat,lng|...` returning `[{km, min}, ...]`.
//! Plain blocking HTTP via `ureq` — there is no async runtime dependency
//! here; routing is a per-request call with its own deadline, not a
//! streamed protocol.

use anyhow::{anyhow, Context, Result};
use cdst_core::solver::LatLng;
use serde::Deserialize;
use std::time::Duration;

/// A client capable of resolving a batch of (origin, destination) pairs
/// against the external routing endpoint. Exists as a trait so tests can
/// substitute a fake that never makes a network call.
pub trait RoutingClient: Send + Sync {
    fn route_batch(&self, pairs: &[(LatLng, LatLng)]) -> Result<Vec<RoutedLeg>>;
}

/// One routed leg as returned by the external endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RoutedLeg {
    pub km: f64,
    pub min: f64,
}

/// Blocking HTTP client against an OSRM-style `/route` endpoint.
pub struct HttpRoutingClient {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpRoutingClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self {
            base_url: base_url.into(),
            agent,
        }
    }

    fn build_query(pairs: &[(LatLng, LatLng)]) -> String {
        pairs
            .iter()
            .map(|(o, d)| format!("{},{};{},{}", o.lat, o.lng, d.lat, d.lng))
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl RoutingClient for HttpRoutingClient {
    fn route_batch(&self, pairs: &[(LatLng, LatLng)]) -> Result<Vec<RoutedLeg>> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }
        let query = Self::build_query(pairs);
        let url = format!("{}/route", self.base_url);
        let response = self
            .agent
            .get(&url)
            .query("pairs", &query)
            .call()
            .context("routing request failed")?;
        if response.status() < 200 || response.status() >= 300 {
            return Err(anyhow!(
                "routing endpoint returned non-2xx status {}",
                response.status()
            ));
        }
        let legs: Vec<RoutedLeg> = response
            .into_json()
            .context("routing response was not valid JSON")?;
        if legs.len() != pairs.len() {
            return Err(anyhow!(
                "routing endpoint returned {} legs for {} pairs",
                legs.len(),
                pairs.len()
            ));
        }
        Ok(legs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_query_joins_pairs_with_pipe() {
        let pairs = vec![
            (LatLng::new(1.0, 2.0), LatLng::new(3.0, 4.0)),
            (LatLng::new(5.0, 6.0), LatLng::new(7.0, 8.0)),
        ];
        let query = HttpRoutingClient::build_query(&pairs);
        assert_eq!(query, "1,2;3,4|5,6;7,8");
    }
}
