//! Distance-estimation backends.
//!
//! This is the one piece of "how far apart are two points" logic that is
//! small enough, and general enough, to live in `cdst-core` rather than in
//! `cdst-routing`: these estimators are pure math with no I/O, so any
//! crate can build and use one without pulling in an HTTP client. The
//! Distance Provider in `cdst-routing` picks its fallback estimator from
//! the table in [`super::registry`].

use anyhow::Result;

/// A point on the WGS84 ellipsoid, decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Round to 6 decimal places, the cache-key precision used throughout
    /// (~11cm at the equator).
    pub fn rounded(&self) -> (i64, i64) {
        ((self.lat * 1e6).round() as i64, (self.lng * 1e6).round() as i64)
    }

    pub fn in_bounds(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A distance/time estimate and where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceEstimate {
    pub km: f64,
    pub minutes: f64,
    pub source: EstimateSource,
}

/// Provenance of a [`DistanceEstimate`], surfaced in Problem metadata so a
/// caller can tell when a run leaned on the haversine fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateSource {
    Routed,
    Fallback,
}

/// Trait for estimating travel distance/time between two points.
///
/// This is for point-to-point distance estimation, not the batched,
/// cached, rate-limited Distance Provider — see `cdst_routing::Provider`
/// for that.
pub trait DistanceBackend: Send + Sync {
    fn estimate(&self, origin: LatLng, dest: LatLng) -> Result<DistanceEstimate>;
}

/// Great-circle (haversine) distance with an assumed average travel speed.
///
/// Always available; never fails except on out-of-range coordinates.
#[derive(Debug, Clone)]
pub struct HaversineBackend {
    /// Assumed average road speed in km/h, used to synthesize travel time.
    pub assumed_speed_kmh: f64,
}

impl Default for HaversineBackend {
    fn default() -> Self {
        Self {
            assumed_speed_kmh: 40.0,
        }
    }
}

const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Travel time synthesized from distance at an assumed average road speed.
fn synthesized_minutes(km: f64, assumed_speed_kmh: f64) -> f64 {
    if assumed_speed_kmh > 0.0 {
        km / assumed_speed_kmh * 60.0
    } else {
        0.0
    }
}

fn check_bounds(origin: LatLng, dest: LatLng) -> Result<()> {
    if !origin.in_bounds() || !dest.in_bounds() {
        return Err(anyhow::anyhow!(
            "coordinate out of WGS84 bounds: {:?} / {:?}",
            origin,
            dest
        ));
    }
    Ok(())
}

impl DistanceBackend for HaversineBackend {
    fn estimate(&self, origin: LatLng, dest: LatLng) -> Result<DistanceEstimate> {
        check_bounds(origin, dest)?;
        let km = haversine_km(origin, dest);
        Ok(DistanceEstimate {
            km,
            minutes: synthesized_minutes(km, self.assumed_speed_kmh),
            source: EstimateSource::Fallback,
        })
    }
}

/// Flat-projection estimator: longitudes scaled by the cosine of the mean
/// latitude, then the pair treated as planar. Within the tens-of-kilometer
/// extent of a typical service region it tracks haversine to well under a
/// percent, with less trigonometry per pair.
#[derive(Debug, Clone)]
pub struct EquirectangularBackend {
    /// Assumed average road speed in km/h, used to synthesize travel time.
    pub assumed_speed_kmh: f64,
}

impl Default for EquirectangularBackend {
    fn default() -> Self {
        Self {
            assumed_speed_kmh: 40.0,
        }
    }
}

impl DistanceBackend for EquirectangularBackend {
    fn estimate(&self, origin: LatLng, dest: LatLng) -> Result<DistanceEstimate> {
        check_bounds(origin, dest)?;
        let km = equirectangular_km(origin, dest);
        Ok(DistanceEstimate {
            km,
            minutes: synthesized_minutes(km, self.assumed_speed_kmh),
            source: EstimateSource::Fallback,
        })
    }
}

/// Haversine great-circle distance in kilometers.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Equirectangular (flat-projection) distance in kilometers.
pub fn equirectangular_km(a: LatLng, b: LatLng) -> f64 {
    let mean_lat = ((a.lat + b.lat) / 2.0).to_radians();
    let x = (b.lng - a.lng).to_radians() * mean_lat.cos();
    let y = (b.lat - a.lat).to_radians();
    EARTH_RADIUS_KM * (x * x + y * y).sqrt()
}
