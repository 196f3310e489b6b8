//! Capture domain module

mod artifact;
mod location;

pub use artifact::{CaptureArtifact, CapturedImage};
pub use location::Location;
