//! Newtype identifiers and 0-based dense indices for the allocation model.
//!
//! External IDs (whatever a network/lab/test type is keyed by upstream) are
//! resolved once, at Problem-build time, into dense 0-based indices so the
//! solver's inner loops never hash a string or walk a map.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! dense_index {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub usize);

        impl $name {
            /// Wrap a raw 0-based index.
            pub fn new(index: usize) -> Self {
                Self(index)
            }

            /// The raw 0-based index.
            pub fn index(&self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<usize> for $name {
            fn from(index: usize) -> Self {
                Self(index)
            }
        }
    };
}

dense_index!(AreaIndex, "0-based index of a service area within a Problem.");
dense_index!(LabIndex, "0-based index of a laboratory within a Problem.");
dense_index!(TestIndex, "0-based index of a test type within a Problem.");

/// External, upstream-assigned identifier for a service area, lab, or test
/// type (opaque string; the Problem Builder never interprets it).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExternalId(pub String);

impl ExternalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExternalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Unique identifier for a scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioId(pub String);

impl ScenarioId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies the user who submitted a scenario, for the scheduler's
/// per-user concurrency cap and admission fairness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_index_roundtrip() {
        let idx: AreaIndex = 3usize.into();
        assert_eq!(idx.index(), 3);
        assert_eq!(idx, AreaIndex::new(3));
    }

    #[test]
    fn external_id_display() {
        let id = ExternalId::from("lab-42");
        assert_eq!(id.to_string(), "lab-42");
    }
}
