//! # cdst-core: CDST Allocation Engine — Shared Foundations
//!
//! Provides the identifiers, unified error type, and distance-backend
//! registry shared by every other crate in the workspace:
//!
//! - [`ids`] — newtype 0-based indices (`AreaIndex`, `LabIndex`,
//!   `TestIndex`) and opaque external/scenario identifiers.
//! - [`error`] — [`CdstError`], the error type crossing crate boundaries.
//! - [`solver`] — offline distance estimators (haversine, equirectangular)
//!   and the named-estimator table `cdst-routing` picks its fallback from.

pub mod error;
pub mod ids;
pub mod solver;

pub use error::{CdstError, CdstErrorKind, CdstResult};
pub use ids::{AreaIndex, ExternalId, LabIndex, OwnerId, ScenarioId, TestIndex};
