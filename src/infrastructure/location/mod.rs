//! Geolocation infrastructure module

mod fixed;

pub use fixed::FixedGeolocator;
