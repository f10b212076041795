use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

pub const DEFAULT_SARCASM_LEVEL: u8 = 75;
pub const DEFAULT_INTELLIGENCE_LEVEL: u8 = 90;
pub const DEFAULT_HUMOR_LEVEL: u8 = 80;

/// Response of `GET /`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub status: String,
    pub endpoints: BTreeMap<String, String>,
}

/// Response of the `/health` family of probes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: Option<String>,
    /// Present on readiness failures.
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub status: String,
    pub tts_model: Option<String>,
    pub uptime: Option<String>,
}

/// Response of `GET /status`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusReport {
    pub system: SystemStatus,
    pub metrics: BTreeMap<String, JsonValue>,
    pub timestamp: Option<String>,
}

/// Tunable personality traits.
///
/// Fields the client does not model are kept in `extra` so a
/// get-modify-post round trip does not drop them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sarcasm_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intelligence_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humor_level: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            sarcasm_level: Some(DEFAULT_SARCASM_LEVEL),
            intelligence_level: Some(DEFAULT_INTELLIGENCE_LEVEL),
            humor_level: Some(DEFAULT_HUMOR_LEVEL),
            extra: Map::new(),
        }
    }
}

/// Response of `GET /personality`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub personality: Personality,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Response of `POST /chat`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// Binary audio returned by `/falar` and the multimodal chat endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioReply {
    pub audio: Vec<u8>,
    pub content_type: Option<String>,
    /// Spoken text, carried in the `x-response-text` header.
    pub response_text: Option<String>,
}

impl std::fmt::Debug for AudioReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioReply")
            .field("audio_len", &self.audio.len())
            .field("content_type", &self.content_type)
            .field("response_text", &self.response_text)
            .finish()
    }
}
