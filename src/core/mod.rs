pub mod error;
pub mod face;
pub mod geofence;
pub mod recorder;
pub mod workday;
