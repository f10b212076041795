//! `godofreda-client` is an async HTTP client for the Godofreda chat and
//! voice-synthesis API.
//!
//! Two layers:
//! - [`GodofredaClient`] sends exactly one request per call (cache busting,
//!   timeouts, error-body extraction, upload checks).
//! - [`GodofredaApi`] wraps it with retry/backoff, a shared request-state
//!   snapshot and a background health poller:
//!   - [`GodofredaApi::with_retry`]
//!   - [`GodofredaApi::send_chat_message`]
//!   - [`GodofredaApi::synthesize_text`]
//!   - [`GodofredaApi::start_health_polling`]

mod api;
pub mod chat;
mod client;
mod error;
mod health;
mod options;
mod retry;
pub mod settings;
mod state;
mod types;
pub mod upload;
mod wire;

pub use api::GodofredaApi;
pub use client::GodofredaClient;
pub use error::{GodofredaError, ValidationError};
pub use options::{ClientOptions, DEFAULT_BASE_URL};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use state::{ApiSnapshot, Connectivity, RequestState, CANCELLED_CALL, UNKNOWN_ERROR};
pub use types::{
    AudioReply, ChatReply, HealthReport, Personality, PersonalityProfile, ServiceInfo,
    StatusReport, SystemStatus,
};
pub use upload::{UploadFile, UploadRules};

pub type Result<T> = std::result::Result<T, GodofredaError>;
