//! Unified error type for the CDST allocation engine.
//!
//! Each terminal error kind maps to exactly one [`CdstErrorKind`] variant
//! so callers (the scheduler, in particular) can pattern-match on
//! disposition rather than parsing messages.

use thiserror::Error;

/// A terminal error's disposition: what a caller should do about it.
/// See the scenario scheduler for how each kind is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdstErrorKind {
    /// Problem Builder rejected the network snapshot.
    InvalidNetwork,
    /// Parameter validator rejected the request before submission.
    InvalidParameters,
    /// Scheduler admission queue is full for this user or globally.
    RateLimitExceeded,
    /// Distance Provider degraded to the haversine fallback (non-fatal).
    RoutingUnavailable,
    /// A single individual's fitness evaluation failed (non-fatal, penalized).
    EvaluationFailure,
    /// Checkpoint write failed (non-fatal, evolution continues).
    CheckpointFailed,
    /// Scenario was cancelled by its owner or a timeout.
    Cancelled,
    /// Scenario exceeded its wall-clock time budget.
    Timeout,
    /// No specific disposition; treat as an internal error.
    Other,
}

/// Unified error type for all CDST operations.
#[derive(Error, Debug)]
pub enum CdstError {
    /// I/O errors (checkpoint store, config file access).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors.
    #[error("parse error: {0}")]
    Parse(String),

    /// Data validation errors (network snapshot, parameters).
    #[error("validation error: {0}")]
    Validation(String),

    /// Solver/algorithm errors.
    #[error("solver error: {0}")]
    Solver(String),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Scheduler/scenario lifecycle errors.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Generic errors (for wrapping external errors).
    #[error("{0}")]
    Other(String),
}

impl CdstError {
    /// Classify this error by disposition.
    ///
    /// This is a coarse mapping: a variant doesn't always carry enough
    /// context to pick the right kind on its own, so call sites that know
    /// the disposition (the Problem Builder knows an invalid network when
    /// it sees one) should construct the matching variant directly rather
    /// than relying on this.
    pub fn kind(&self) -> CdstErrorKind {
        match self {
            CdstError::Validation(_) => CdstErrorKind::InvalidNetwork,
            CdstError::Config(_) => CdstErrorKind::InvalidParameters,
            CdstError::Solver(_) => CdstErrorKind::EvaluationFailure,
            CdstError::Scheduler(_) => CdstErrorKind::Other,
            CdstError::Io(_) | CdstError::Parse(_) | CdstError::Other(_) => CdstErrorKind::Other,
        }
    }
}

/// Convenience type alias for Results using [`CdstError`].
pub type CdstResult<T> = Result<T, CdstError>;

impl From<anyhow::Error> for CdstError {
    fn from(err: anyhow::Error) -> Self {
        CdstError::Other(err.to_string())
    }
}

impl From<String> for CdstError {
    fn from(s: String) -> Self {
        CdstError::Other(s)
    }
}

impl From<&str> for CdstError {
    fn from(s: &str) -> Self {
        CdstError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for CdstError {
    fn from(err: serde_json::Error) -> Self {
        CdstError::Parse(err.to_string())
    }
}
