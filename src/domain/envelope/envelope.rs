//! Wire envelope and its codec
//!
//! Every frame on the relay connection is one JSON object with a `type`
//! tag and a `data` payload whose shape depends on the tag:
//!
//! ```text
//! { "type": "text",  "data": "<string>" }
//! { "type": "photo", "data": { "image": "<uri-or-base64>", "location": {..} | null } }
//! { "type": "audio", "data": "<base64>", "format": "audio/flac" }
//! ```

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::capture::{CaptureArtifact, Location};
use crate::domain::error::LocationError;
use crate::domain::recording::{human_readable_bytes, AudioClip, AudioFormat};

/// The closed set of envelope tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Text,
    Photo,
    Audio,
}

impl EnvelopeKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Photo => "photo",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload of a `photo` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoPayload {
    pub image: String,
    #[serde(default)]
    pub location: Option<Location>,
}

/// Payload of an `audio` envelope: base64 bytes plus their format tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    data: String,
    format: AudioFormat,
}

impl AudioPayload {
    /// Base64-encoded clip bytes
    pub fn base64(&self) -> &str {
        &self.data
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Decode the clip bytes
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }

    /// Size of the decoded clip, computed from the encoded length
    pub fn decoded_len(&self) -> usize {
        let padding = self.data.bytes().rev().take_while(|b| *b == b'=').count();
        (self.data.len() / 4) * 3 - padding.min(2)
    }
}

/// Error when an inbound frame is not a valid envelope
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("Frame is not a JSON object: {0}")]
    InvalidJson(String),

    #[error("Frame has no \"type\" field")]
    MissingType,

    #[error("Unknown envelope type: \"{0}\"")]
    UnknownType(String),

    #[error("Envelope of type {0} has no \"data\" field")]
    MissingData(EnvelopeKind),

    #[error("Invalid {kind} payload: {reason}")]
    InvalidData { kind: EnvelopeKind, reason: String },

    #[error("Audio payload is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("Unsupported audio format: \"{0}\"")]
    UnknownFormat(String),

    #[error("Invalid photo location: {0}")]
    InvalidLocation(#[from] LocationError),
}

/// Error when an envelope cannot be serialized
#[derive(Debug, Error)]
#[error("Failed to encode {kind} envelope: {source}")]
pub struct EncodeError {
    pub kind: EnvelopeKind,
    #[source]
    pub source: serde_json::Error,
}

/// One relay message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Text(String),
    Photo(PhotoPayload),
    Audio(AudioPayload),
}

#[derive(Serialize)]
struct OutgoingFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: OutgoingData<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OutgoingData<'a> {
    Str(&'a str),
    Photo(&'a PhotoPayload),
}

#[derive(Deserialize)]
struct IncomingFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<Value>,
    format: Option<String>,
}

impl Envelope {
    /// Free-text query
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Photo with the location sampled after capture
    pub fn photo(artifact: CaptureArtifact) -> Self {
        let (image, location) = artifact.into_parts();
        Self::Photo(PhotoPayload { image, location })
    }

    /// Finished audio clip
    pub fn audio(clip: &AudioClip) -> Self {
        Self::Audio(AudioPayload {
            data: clip.to_base64(),
            format: clip.format(),
        })
    }

    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Text(_) => EnvelopeKind::Text,
            Self::Photo(_) => EnvelopeKind::Photo,
            Self::Audio(_) => EnvelopeKind::Audio,
        }
    }

    /// Serialize to a single text frame
    pub fn encode(&self) -> Result<String, EncodeError> {
        let frame = match self {
            Self::Text(text) => OutgoingFrame {
                kind: "text",
                data: OutgoingData::Str(text),
                format: None,
            },
            Self::Photo(photo) => OutgoingFrame {
                kind: "photo",
                data: OutgoingData::Photo(photo),
                format: None,
            },
            Self::Audio(audio) => OutgoingFrame {
                kind: "audio",
                data: OutgoingData::Str(&audio.data),
                format: Some(audio.format.as_str()),
            },
        };
        serde_json::to_string(&frame).map_err(|source| EncodeError {
            kind: self.kind(),
            source,
        })
    }

    /// Parse and validate one inbound text frame
    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        let incoming: IncomingFrame =
            serde_json::from_str(frame).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

        let kind = match incoming.kind.as_deref() {
            None => return Err(DecodeError::MissingType),
            Some("text") => EnvelopeKind::Text,
            Some("photo") => EnvelopeKind::Photo,
            Some("audio") => EnvelopeKind::Audio,
            Some(other) => return Err(DecodeError::UnknownType(other.to_string())),
        };

        let data = incoming.data.ok_or(DecodeError::MissingData(kind))?;

        match kind {
            EnvelopeKind::Text => match data {
                Value::String(text) => Ok(Self::Text(text)),
                other => Err(wrong_shape(kind, "a string", &other)),
            },
            EnvelopeKind::Photo => {
                if !data.is_object() {
                    return Err(wrong_shape(kind, "an object", &data));
                }
                let photo: PhotoPayload =
                    serde_json::from_value(data).map_err(|e| DecodeError::InvalidData {
                        kind,
                        reason: e.to_string(),
                    })?;
                if let Some(location) = &photo.location {
                    location.validate()?;
                }
                Ok(Self::Photo(photo))
            }
            EnvelopeKind::Audio => {
                let encoded = match data {
                    Value::String(encoded) => encoded,
                    other => return Err(wrong_shape(kind, "a base64 string", &other)),
                };
                base64::engine::general_purpose::STANDARD
                    .decode(&encoded)
                    .map_err(|e| DecodeError::InvalidBase64(e.to_string()))?;
                let format = match incoming.format {
                    None => AudioFormat::default(),
                    Some(tag) => tag
                        .parse()
                        .map_err(|_| DecodeError::UnknownFormat(tag.clone()))?,
                };
                Ok(Self::Audio(AudioPayload {
                    data: encoded,
                    format,
                }))
            }
        }
    }

    /// One-line rendering for a chat log
    pub fn summary(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Photo(photo) => {
                let image = abbreviate(&photo.image, 32);
                match &photo.location {
                    Some(location) => format!("{} @ {}", image, location),
                    None => format!("{} (no location)", image),
                }
            }
            Self::Audio(audio) => format!(
                "{} clip ({})",
                audio.format,
                human_readable_bytes(audio.decoded_len())
            ),
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.summary())
    }
}

fn wrong_shape(kind: EnvelopeKind, expected: &str, found: &Value) -> DecodeError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    DecodeError::InvalidData {
        kind,
        reason: format!("expected {}, found {}", expected, found),
    }
}

fn abbreviate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars).collect();
    format!("{}…", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn text_wire_form() {
        let json = Envelope::text("hi").encode().unwrap();
        assert_eq!(json, r#"{"type":"text","data":"hi"}"#);
    }

    #[test]
    fn photo_without_location_writes_null() {
        let envelope = Envelope::photo(CaptureArtifact::new("file:///a.jpg", None));
        let json = envelope.encode().unwrap();
        assert_eq!(
            json,
            r#"{"type":"photo","data":{"image":"file:///a.jpg","location":null}}"#
        );
    }

    #[test]
    fn photo_with_location_wire_form() {
        let location = Location::new(12.5, -7.25).unwrap().with_timestamp(42);
        let envelope = Envelope::photo(CaptureArtifact::new("abc", Some(location)));
        let value: Value = serde_json::from_str(&envelope.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "photo");
        assert_eq!(value["data"]["location"]["latitude"], 12.5);
        assert_eq!(value["data"]["location"]["timestamp"], 42);
        assert!(value["data"]["location"].get("accuracy").is_none());
    }

    #[test]
    fn audio_carries_format_tag() {
        let clip = AudioClip::new(vec![1, 2, 3], AudioFormat::Flac, Duration::from_secs(2));
        let value: Value =
            serde_json::from_str(&Envelope::audio(&clip).encode().unwrap()).unwrap();
        assert_eq!(value["type"], "audio");
        assert_eq!(value["data"], "AQID");
        assert_eq!(value["format"], "audio/flac");
    }

    #[test]
    fn round_trip_preserves_every_kind() {
        let clip = AudioClip::new(vec![9; 100], AudioFormat::Ogg, Duration::from_secs(1));
        let location = Location::new(-33.8688, 151.2093)
            .unwrap()
            .with_accuracy(5.0)
            .unwrap();
        let envelopes = [
            Envelope::text("where am I? 🗺"),
            Envelope::photo(CaptureArtifact::new("/9j/4AAQ", Some(location))),
            Envelope::photo(CaptureArtifact::new("file:///x.jpg", None)),
            Envelope::audio(&clip),
        ];
        for envelope in envelopes {
            let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();
            assert_eq!(decoded, envelope);
        }
    }

    #[test]
    fn decode_audio_without_format_defaults_to_flac() {
        let envelope = Envelope::decode(r#"{"type":"audio","data":"AQID"}"#).unwrap();
        match envelope {
            Envelope::Audio(audio) => {
                assert_eq!(audio.format(), AudioFormat::Flac);
                assert_eq!(audio.decode().unwrap(), vec![1, 2, 3]);
            }
            other => panic!("expected audio, got {:?}", other),
        }
    }

    #[test]
    fn decode_photo_without_location_field() {
        let envelope = Envelope::decode(r#"{"type":"photo","data":{"image":"x"}}"#).unwrap();
        assert_eq!(
            envelope,
            Envelope::Photo(PhotoPayload {
                image: "x".into(),
                location: None
            })
        );
    }

    #[test]
    fn decode_rejects_non_json() {
        assert!(matches!(
            Envelope::decode("hello"),
            Err(DecodeError::InvalidJson(_))
        ));
        assert!(matches!(
            Envelope::decode("[1,2]"),
            Err(DecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn decode_rejects_missing_or_unknown_type() {
        assert_eq!(
            Envelope::decode(r#"{"data":"x"}"#),
            Err(DecodeError::MissingType)
        );
        assert_eq!(
            Envelope::decode(r#"{"type":"video","data":"x"}"#),
            Err(DecodeError::UnknownType("video".into()))
        );
    }

    #[test]
    fn decode_rejects_missing_data() {
        assert_eq!(
            Envelope::decode(r#"{"type":"text"}"#),
            Err(DecodeError::MissingData(EnvelopeKind::Text))
        );
        assert_eq!(
            Envelope::decode(r#"{"type":"photo","data":null}"#),
            Err(DecodeError::MissingData(EnvelopeKind::Photo))
        );
    }

    #[test]
    fn decode_rejects_wrong_shapes() {
        let err = Envelope::decode(r#"{"type":"text","data":{"a":1}}"#).unwrap_err();
        assert!(err.to_string().contains("expected a string, found an object"));

        let err = Envelope::decode(r#"{"type":"photo","data":"x"}"#).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidData {
                kind: EnvelopeKind::Photo,
                ..
            }
        ));

        let err = Envelope::decode(r#"{"type":"photo","data":{"location":null}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidData { .. }));
    }

    #[test]
    fn decode_rejects_bad_audio() {
        assert!(matches!(
            Envelope::decode(r#"{"type":"audio","data":"not base64!"}"#),
            Err(DecodeError::InvalidBase64(_))
        ));
        assert_eq!(
            Envelope::decode(r#"{"type":"audio","data":"AQID","format":"audio/x-amr"}"#),
            Err(DecodeError::UnknownFormat("audio/x-amr".into()))
        );
    }

    #[test]
    fn decode_rejects_out_of_range_location() {
        let err = Envelope::decode(
            r#"{"type":"photo","data":{"image":"x","location":{"latitude":123.0,"longitude":0.0}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidLocation(_)));
    }

    #[test]
    fn decoded_len_matches_payload() {
        for n in 0..8 {
            let clip = AudioClip::new(vec![7; n], AudioFormat::Flac, Duration::ZERO);
            match Envelope::audio(&clip) {
                Envelope::Audio(audio) => assert_eq!(audio.decoded_len(), n),
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn display_renders_type_and_summary() {
        assert_eq!(Envelope::text("hi").to_string(), "text: hi");

        let location = Location::new(1.0, 2.0).unwrap();
        let photo = Envelope::photo(CaptureArtifact::new("x".repeat(40), Some(location)));
        let line = photo.to_string();
        assert!(line.starts_with("photo: xxxxxxxx"));
        assert!(line.contains("…"));
        assert!(line.ends_with("@ 1.00000, 2.00000"));

        let clip = AudioClip::new(vec![0; 2048], AudioFormat::Flac, Duration::ZERO);
        assert_eq!(
            Envelope::audio(&clip).to_string(),
            "audio: audio/flac clip (2.0 KB)"
        );
    }
}
