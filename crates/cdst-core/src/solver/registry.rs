//! Named offline distance estimators.
//!
//! Every estimator that isn't backed by a real road router shares one
//! degree of freedom: the average road speed used to turn kilometers into
//! minutes. The table therefore holds speed-parameterized constructors,
//! and [`DistanceBackendKind::build_at`] threads the configured speed
//! through whichever estimator was selected. Estimators are addressable by
//! canonical name or alias ("great-circle" and "default" both resolve to
//! haversine), so the Distance Provider's fallback can be switched by
//! configuration without touching provider code.

use super::backend::{DistanceBackend, EquirectangularBackend, HaversineBackend};
use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use std::{
    fmt,
    str::FromStr,
    sync::{Arc, RwLock},
};

/// Assumed average road speed when no configuration supplies one.
pub const DEFAULT_ASSUMED_SPEED_KMH: f64 = 40.0;

type BackendConstructor = fn(assumed_speed_kmh: f64) -> Arc<dyn DistanceBackend>;

struct EstimatorEntry {
    canonical: &'static str,
    aliases: &'static [&'static str],
    constructor: BackendConstructor,
}

impl EstimatorEntry {
    fn answers_to(&self, name: &str) -> bool {
        self.canonical.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

struct EstimatorTable {
    entries: Vec<EstimatorEntry>,
}

impl EstimatorTable {
    fn lookup(&self, name: &str) -> Option<&EstimatorEntry> {
        let wanted = name.trim();
        self.entries.iter().find(|entry| entry.answers_to(wanted))
    }

    /// Adds an estimator unless its canonical name or any alias collides
    /// with one already present; a collision leaves the table unchanged.
    fn register(
        &mut self,
        canonical: &'static str,
        aliases: &'static [&'static str],
        constructor: BackendConstructor,
    ) -> bool {
        let collides = self.lookup(canonical).is_some()
            || aliases.iter().any(|alias| self.lookup(alias).is_some());
        if collides {
            return false;
        }
        self.entries.push(EstimatorEntry {
            canonical,
            aliases,
            constructor,
        });
        true
    }

    /// Canonical names in registration order (built-ins first).
    fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.canonical).collect()
    }
}

static ESTIMATORS: Lazy<RwLock<EstimatorTable>> = Lazy::new(|| {
    let mut table = EstimatorTable { entries: Vec::new() };
    table.register("haversine", &["default", "great-circle"], |speed| {
        Arc::new(HaversineBackend {
            assumed_speed_kmh: speed,
        })
    });
    table.register("equirectangular", &["flat"], |speed| {
        Arc::new(EquirectangularBackend {
            assumed_speed_kmh: speed,
        })
    });
    RwLock::new(table)
});

/// Register an additional estimator under a canonical name plus aliases.
/// Returns `false` (and leaves the table unchanged) if any of those names
/// is already taken.
pub fn register_backend(
    canonical: &'static str,
    aliases: &'static [&'static str],
    constructor: BackendConstructor,
) -> bool {
    ESTIMATORS
        .write()
        .expect("distance estimator table lock poisoned")
        .register(canonical, aliases, constructor)
}

/// A validated handle to a registered estimator; parsing accepts canonical
/// names and aliases, and the handle always carries the canonical name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistanceBackendKind(&'static str);

impl DistanceBackendKind {
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn available() -> Vec<&'static str> {
        ESTIMATORS
            .read()
            .expect("distance estimator table lock poisoned")
            .names()
    }

    /// Build this estimator at the default assumed road speed.
    pub fn build(&self) -> Arc<dyn DistanceBackend> {
        self.build_at(DEFAULT_ASSUMED_SPEED_KMH)
    }

    /// Build this estimator with a caller-supplied average road speed,
    /// used to synthesize travel minutes from estimated kilometers.
    pub fn build_at(&self, assumed_speed_kmh: f64) -> Arc<dyn DistanceBackend> {
        let table = ESTIMATORS
            .read()
            .expect("distance estimator table lock poisoned");
        let entry = table
            .lookup(self.0)
            .expect("estimator missing for already-validated kind");
        (entry.constructor)(assumed_speed_kmh)
    }
}

impl Default for DistanceBackendKind {
    fn default() -> Self {
        DistanceBackendKind("haversine")
    }
}

impl fmt::Display for DistanceBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl FromStr for DistanceBackendKind {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        let table = ESTIMATORS
            .read()
            .expect("distance estimator table lock poisoned");
        match table.lookup(input) {
            Some(entry) => Ok(DistanceBackendKind(entry.canonical)),
            None => Err(anyhow!(
                "no distance estimator named '{}' (registered: {})",
                input.trim(),
                table.names().join(", ")
            )),
        }
    }
}
