//! Control-panel settings document with JSON export and import.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::{
    types::{DEFAULT_INTELLIGENCE_LEVEL, DEFAULT_SARCASM_LEVEL},
    GodofredaError, Personality, Result,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalitySettings {
    pub sarcasm_level: u8,
    pub intelligence_level: u8,
    pub humor_style: String,
    pub response_length: String,
}

impl Default for PersonalitySettings {
    fn default() -> Self {
        Self {
            sarcasm_level: DEFAULT_SARCASM_LEVEL,
            intelligence_level: DEFAULT_INTELLIGENCE_LEVEL,
            humor_style: "sophisticated".to_owned(),
            response_length: "medium".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub speed: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice_model: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            pitch: 1.0,
            volume: 0.8,
            voice_model: "godofreda_v2".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    pub auto_save: bool,
    pub debug_mode: bool,
    pub log_level: String,
    pub max_conversation_length: u32,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            auto_save: true,
            debug_mode: false,
            log_level: "info".to_owned(),
            max_conversation_length: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub require_auth: bool,
    /// Minutes.
    pub session_timeout: u32,
    /// Requests per minute.
    pub rate_limit: u32,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            require_auth: false,
            session_timeout: 30,
            rate_limit: 100,
        }
    }
}

/// Everything the configuration panel edits. Missing sections or fields
/// fall back to defaults on import.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    pub personality: PersonalitySettings,
    pub voice: VoiceSettings,
    pub system: SystemSettings,
    pub security: SecuritySettings,
}

impl PanelSettings {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| GodofredaError::Decode(format!("settings could not be encoded: {err}")))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|err| GodofredaError::Decode(format!("invalid settings document: {err}")))
    }

    /// Payload for `POST /personality`.
    pub fn personality_payload(&self) -> Personality {
        let mut extra = Map::new();
        extra.insert(
            "humor_style".to_owned(),
            JsonValue::String(self.personality.humor_style.clone()),
        );
        extra.insert(
            "response_length".to_owned(),
            JsonValue::String(self.personality.response_length.clone()),
        );
        Personality {
            sarcasm_level: Some(self.personality.sarcasm_level),
            intelligence_level: Some(self.personality.intelligence_level),
            humor_level: None,
            extra,
        }
    }

    /// Merges values reported by the server over the local personality section.
    pub fn apply_personality(&mut self, personality: &Personality) {
        if let Some(level) = personality.sarcasm_level {
            self.personality.sarcasm_level = level;
        }
        if let Some(level) = personality.intelligence_level {
            self.personality.intelligence_level = level;
        }
        if let Some(JsonValue::String(style)) = personality.extra.get("humor_style") {
            self.personality.humor_style = style.clone();
        }
        if let Some(JsonValue::String(length)) = personality.extra.get("response_length") {
            self.personality.response_length = length.clone();
        }
    }
}
