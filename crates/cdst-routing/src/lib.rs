//! # cdst-routing: Distance Provider
//!
//! Resolves `(origin, destination) -> (km, minutes, source)` with a
//! process-wide, sharded, TTL-expiring cache, falling back from an external
//! OSRM-style routing endpoint to haversine great-circle distance on
//! timeout, HTTP error, or malformed response.

pub mod cache;
pub mod client;
pub mod provider;

pub use client::{HttpRoutingClient, RoutedLeg, RoutingClient};
pub use provider::{Provider, ProviderConfig, RoutedDistance, DEFAULT_CACHE_TTL, DEFAULT_MAX_OUTSTANDING};
