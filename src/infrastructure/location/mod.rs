//! Location source adapters

pub mod gpsd;

pub use gpsd::GpsdLocationSource;
