//! Recording infrastructure module
//!
//! Microphone capture via cpal, encoded to FLAC.

mod cpal_recorder;
mod flac_encoder;

pub use cpal_recorder::CpalRecorder;
pub use flac_encoder::{encode_flac, EncodingError, PREFERRED_SAMPLE_RATE};
