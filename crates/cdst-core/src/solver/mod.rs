pub mod backend;
pub mod registry;

pub use backend::{
    DistanceBackend, DistanceEstimate, EquirectangularBackend, EstimateSource, HaversineBackend,
    LatLng,
};
pub use registry::{register_backend, DistanceBackendKind, DEFAULT_ASSUMED_SPEED_KMH};
