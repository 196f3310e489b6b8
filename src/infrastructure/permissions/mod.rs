//! Permission infrastructure module

mod configured;

pub use configured::ConfiguredPermissions;
