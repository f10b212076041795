//! Pre-flight gates for multipart uploads and speech text.

use crate::ValidationError;

/// Maximum upload size accepted by the service (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of characters accepted by the text-to-speech endpoint.
pub const MAX_TTS_CHARS: usize = 1000;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

pub const ALLOWED_AUDIO_TYPES: &[&str] = &[
    "audio/wav",
    "audio/mp3",
    "audio/mpeg",
    "audio/ogg",
    "audio/flac",
];

pub const NO_FILE_SELECTED: &str = "no file selected";

/// In-memory file ready for multipart submission.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Allow-list and size ceiling for one upload slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadRules {
    pub allowed_types: Vec<String>,
    pub max_size: u64,
}

impl UploadRules {
    pub fn new<I, S>(allowed_types: I, max_size: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_types: allowed_types.into_iter().map(Into::into).collect(),
            max_size,
        }
    }

    pub fn images(max_size: u64) -> Self {
        Self::new(ALLOWED_IMAGE_TYPES.iter().copied(), max_size)
    }

    pub fn audio(max_size: u64) -> Self {
        Self::new(ALLOWED_AUDIO_TYPES.iter().copied(), max_size)
    }

    pub fn allows_type(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|allowed| allowed == mime_type)
    }

    /// Collects every violated rule for `file`.
    ///
    /// A missing file is reported alone; type and size are not inspected.
    pub fn check(&self, file: Option<&UploadFile>) -> Vec<String> {
        let Some(file) = file else {
            return vec![NO_FILE_SELECTED.to_owned()];
        };

        let mut errors = Vec::new();
        if !self.allows_type(&file.mime_type) {
            errors.push(format!(
                "unsupported file type '{}'; allowed types: {}",
                file.mime_type,
                self.allowed_types.join(", ")
            ));
        }
        if file.size() > self.max_size {
            errors.push(format!(
                "file too large ({}); maximum size: {}",
                format_file_size(file.size()),
                format_file_size(self.max_size)
            ));
        }
        errors
    }

    pub fn validate(&self, subject: &str, file: Option<&UploadFile>) -> Result<(), ValidationError> {
        let errors = self.check(file);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(subject, errors))
        }
    }
}

/// Rejects empty text and text longer than [`MAX_TTS_CHARS`] characters.
pub fn validate_speech_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::single("text", "text must not be empty"));
    }
    let chars = text.chars().count();
    if chars > MAX_TTS_CHARS {
        return Err(ValidationError::single(
            "text",
            format!("text too long ({chars} characters, maximum {MAX_TTS_CHARS})"),
        ));
    }
    Ok(())
}

/// Human-readable byte count, e.g. `"1.5 MB"`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_owned();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
