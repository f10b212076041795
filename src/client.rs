use std::fmt;

use reqwest::{
    header,
    multipart::{Form, Part},
    Method, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;

use crate::{
    options::DEFAULT_BASE_URL,
    upload::{validate_speech_text, UploadFile, UploadRules},
    wire, AudioReply, ChatReply, ClientOptions, GodofredaError, HealthReport, Personality,
    PersonalityProfile, Result, ServiceInfo, StatusReport,
};

const USER_AGENT: &str = concat!("godofreda-client/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
/// HTTP client for the Godofreda API.
///
/// Every method performs exactly one request. Retries and state tracking
/// live in [`crate::GodofredaApi`].
pub struct GodofredaClient {
    http: reqwest::Client,
    base_url: String,
    options: ClientOptions,
}

impl fmt::Debug for GodofredaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GodofredaClient")
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .finish()
    }
}

impl Default for GodofredaClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl GodofredaClient {
    /// Creates a client for the service at `base_url`, e.g. `http://localhost:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim().trim_end_matches('/').to_owned(),
            options: ClientOptions::default(),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `GODOFREDA_API_URL`: base URL of the service (required)
    /// - `GODOFREDA_TIMEOUT_MS`, `GODOFREDA_HEALTH_INTERVAL_MS`: optional
    ///   overrides, see [`ClientOptions::from_env`]
    ///
    /// # Example
    ///
    /// ```no_run
    /// use godofreda_client::GodofredaClient;
    ///
    /// let client = GodofredaClient::from_env().expect("missing GODOFREDA_API_URL");
    /// ```
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("GODOFREDA_API_URL").map_err(|_| {
            GodofredaError::Config("missing GODOFREDA_API_URL environment variable".to_owned())
        })?;
        if url.trim().is_empty() {
            return Err(GodofredaError::Config(
                "GODOFREDA_API_URL is set but empty".to_owned(),
            ));
        }
        Ok(Self::new(url).with_options(ClientOptions::from_env()?))
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Replaces the underlying `reqwest` client (proxies, custom TLS, ...).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn service_info(&self) -> Result<ServiceInfo> {
        self.send_json(self.request(Method::GET, wire::ROOT)).await
    }

    pub async fn health(&self) -> Result<HealthReport> {
        self.send_json(self.request(Method::GET, wire::HEALTH)).await
    }

    pub async fn ready(&self) -> Result<HealthReport> {
        self.send_json(self.request(Method::GET, wire::READY)).await
    }

    pub async fn live(&self) -> Result<HealthReport> {
        self.send_json(self.request(Method::GET, wire::LIVE)).await
    }

    pub async fn status(&self) -> Result<StatusReport> {
        self.send_json(self.request(Method::GET, wire::STATUS)).await
    }

    /// Returns the Prometheus exposition text.
    pub async fn metrics(&self) -> Result<String> {
        let request = self.request_accepting(Method::GET, wire::METRICS, "text/plain");
        let response = self.send(request).await?;
        response.text().await.map_err(GodofredaError::Transport)
    }

    pub async fn personality(&self) -> Result<PersonalityProfile> {
        self.send_json(self.request(Method::GET, wire::PERSONALITY))
            .await
    }

    pub async fn update_personality(&self, personality: &Personality) -> Result<()> {
        let request = self
            .request(Method::POST, wire::PERSONALITY)
            .json(personality);
        self.send(request).await?;
        Ok(())
    }

    /// Sends a text message to `/chat`.
    pub async fn chat(&self, message: &str, context: &str) -> Result<ChatReply> {
        let form = Form::new()
            .text("user_input", message.to_owned())
            .text("context", context.to_owned());
        let request = self.request(Method::POST, wire::CHAT).multipart(form);
        self.send_json(request).await
    }

    /// Sends text plus optional image and voice files; the reply is audio.
    ///
    /// Files are checked against the upload rules before anything is sent.
    pub async fn multimodal_chat(
        &self,
        text: &str,
        image: Option<&UploadFile>,
        voice: Option<&UploadFile>,
    ) -> Result<AudioReply> {
        self.validate_attachments(image, voice)?;

        let mut form = Form::new().text("text", text.to_owned());
        if let Some(image) = image {
            form = form.part("image", file_part(image)?);
        }
        if let Some(voice) = voice {
            form = form.part("voice", file_part(voice)?);
        }

        let request = self
            .request(Method::POST, wire::MULTIMODAL_CHAT)
            .multipart(form);
        self.send_audio(request).await
    }

    /// Converts `text` to speech via `/falar`.
    pub async fn synthesize(&self, text: &str) -> Result<AudioReply> {
        validate_speech_text(text)?;
        let form = Form::new().text("texto", text.to_owned());
        let request = self.request(Method::POST, wire::TTS).multipart(form);
        self.send_audio(request).await
    }

    /// Runs the upload gate for whichever attachments are present.
    pub fn validate_attachments(
        &self,
        image: Option<&UploadFile>,
        voice: Option<&UploadFile>,
    ) -> Result<()> {
        if image.is_some() {
            UploadRules::images(self.options.max_upload_bytes).validate("image", image)?;
        }
        if voice.is_some() {
            UploadRules::audio(self.options.max_upload_bytes).validate("voice", voice)?;
        }
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_accepting(method, path, "application/json")
    }

    /// Request interceptor: timeout, default headers and cache busting for GETs.
    fn request_accepting(&self, method: Method, path: &str, accept: &str) -> RequestBuilder {
        tracing::debug!(%method, path, "dispatching api request");
        let mut builder = self
            .http
            .request(method.clone(), self.endpoint_url(path))
            .header(header::ACCEPT, accept)
            .header(header::USER_AGENT, USER_AGENT)
            .timeout(self.options.timeout());
        if method == Method::GET {
            builder = builder.query(&[wire::cache_bust()]);
        }
        builder
    }

    /// Response interceptor: logs and converts failures.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|err| {
            tracing::error!(error = %err, "network error");
            GodofredaError::Transport(err)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.map_err(GodofredaError::Transport)?;
        let body = wire::error_body_message(&body);
        tracing::error!(status = status.as_u16(), body = %body, "api error response");
        Err(GodofredaError::Http {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let body = response.text().await.map_err(GodofredaError::Transport)?;
        serde_json::from_str::<T>(&body).map_err(|err| {
            GodofredaError::Decode(format!("invalid response JSON: {err}; body: {body}"))
        })
    }

    async fn send_audio(&self, request: RequestBuilder) -> Result<AudioReply> {
        let response = self.send(request).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let response_text = wire::response_text(response.headers());
        let audio = response.bytes().await.map_err(GodofredaError::Transport)?;
        Ok(AudioReply {
            audio: audio.to_vec(),
            content_type,
            response_text,
        })
    }
}

fn file_part(file: &UploadFile) -> Result<Part> {
    Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.mime_type)
        .map_err(GodofredaError::Transport)
}
