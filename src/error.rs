use std::fmt;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum GodofredaError {
    /// Network or request execution error from `reqwest` (no response received).
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code with the extracted response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Input rejected before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Response decoding or document parsing error.
    #[error("decode error: {0}")]
    Decode(String),
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl GodofredaError {
    /// Returns `true` for failures raised before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Accumulated pre-flight validation failures.
///
/// Every violated rule is kept so callers can show a complete explanation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// What was being validated, e.g. `"image"` or `"text"`.
    pub subject: String,
    /// One entry per violated rule, in check order.
    pub errors: Vec<String>,
}

impl ValidationError {
    pub fn new(subject: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            errors,
        }
    }

    pub fn single(subject: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(subject, vec![error.into()])
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} validation failed: {}",
            self.subject,
            self.errors.join(", ")
        )
    }
}

impl std::error::Error for ValidationError {}
