//! Transcript container adapter.
//!
//! The transcript container format is externally defined and decrypted by
//! an opaque collaborator; only its input/output contract lives here:
//! `decrypt(bytes) -> structure | none` and `extract(structure) ->
//! {summary, key_points, segments}`. Decryption failures are soft — the
//! pipeline substitutes the default empty content instead of failing the
//! request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One speaker-attributed slice of the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

/// Structured content extracted from a decrypted transcript container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetingContent {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

impl MeetingContent {
    /// The default empty structure substituted when decryption fails.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Flatten the segments into a display transcription, one line per
    /// segment, speaker-prefixed when the speaker is known.
    pub fn flatten_transcript(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match &segment.speaker {
                Some(speaker) => format!("{}: {}", speaker, segment.text),
                None => segment.text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub trait TranscriptDecryptor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decrypt the raw container bytes into its inner structure, or None
    /// when the bytes cannot be decrypted.
    fn decrypt(&self, bytes: &[u8]) -> Option<Value>;

    /// Extract the meeting content fields from a decrypted structure.
    fn extract(&self, structure: &Value) -> MeetingContent;
}

/// Adapter for containers whose decrypted payload is the JSON document
/// itself. The proprietary cipher layer, when present, is handled by the
/// platform before the bytes reach us.
pub struct JsonContainerAdapter;

impl TranscriptDecryptor for JsonContainerAdapter {
    fn name(&self) -> &'static str {
        "JsonContainerAdapter"
    }

    fn decrypt(&self, bytes: &[u8]) -> Option<Value> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) if value.is_object() => Some(value),
            Ok(_) => {
                debug!("Transcript container decoded but is not an object");
                None
            }
            Err(e) => {
                debug!("Transcript container is not readable JSON: {}", e);
                None
            }
        }
    }

    fn extract(&self, structure: &Value) -> MeetingContent {
        // Containers vary: some nest the content under "data", some keep
        // it at the top level.
        let root = structure.get("data").unwrap_or(structure);

        serde_json::from_value(root.clone()).unwrap_or_else(|_| MeetingContent {
            summary: root
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            key_points: Vec::new(),
            segments: Vec::new(),
        })
    }
}
