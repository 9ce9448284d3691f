//! Geolocation value objects and fix filtering

pub mod filter;
pub mod location;

pub use filter::{GeoFilter, DEFAULT_MIN_MOVEMENT_M};
pub use location::{planar_distance_m, LocationSample, RawFix, METERS_PER_DEGREE};
