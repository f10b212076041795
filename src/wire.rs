use chrono::Utc;
use reqwest::header::HeaderMap;
use serde::Deserialize;

pub const ROOT: &str = "/";
pub const HEALTH: &str = "/health";
pub const READY: &str = "/health/ready";
pub const LIVE: &str = "/health/live";
pub const STATUS: &str = "/status";
pub const METRICS: &str = "/metrics";
pub const PERSONALITY: &str = "/personality";
pub const CHAT: &str = "/chat";
pub const TTS: &str = "/falar";
pub const MULTIMODAL_CHAT: &str = "/api/godofreda/chat";

pub const CACHE_BUST_PARAM: &str = "_t";
pub const RESPONSE_TEXT_HEADER: &str = "x-response-text";

/// Query pair appended to every GET so intermediaries do not cache it.
pub fn cache_bust() -> (&'static str, String) {
    (CACHE_BUST_PARAM, Utc::now().timestamp_millis().to_string())
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    detail: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
    message: Option<String>,
}

/// Best-effort message from an error response body.
///
/// Tries a JSON `detail`/`error`/`message` field first, then the body as
/// text. Bodies that are not UTF-8 (audio endpoints) become a byte count.
pub fn error_body_message(body: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
        let field = envelope
            .detail
            .or(envelope.error)
            .map(|value| match value {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            })
            .or(envelope.message);
        if let Some(message) = field {
            return message;
        }
    }

    match std::str::from_utf8(body) {
        Ok(text) => text.trim().to_owned(),
        Err(_) => format!("<{} bytes of binary data>", body.len()),
    }
}

/// Reads the spoken-text header.
///
/// The server writes header values as Latin-1; bytes that already form valid
/// UTF-8 are kept as such.
pub fn response_text(headers: &HeaderMap) -> Option<String> {
    headers
        .get(RESPONSE_TEXT_HEADER)
        .map(|value| decode_header_text(value.as_bytes()))
        .filter(|text| !text.is_empty())
}

fn decode_header_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().copied().map(char::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue};

    use super::{cache_bust, error_body_message, response_text, RESPONSE_TEXT_HEADER};

    #[test]
    fn error_message_prefers_json_detail() {
        assert_eq!(
            error_body_message(br#"{"detail":"TTS service unavailable"}"#),
            "TTS service unavailable"
        );
        assert_eq!(
            error_body_message(br#"{"detail":[{"loc":["body","texto"]}]}"#),
            r#"[{"loc":["body","texto"]}]"#
        );
        assert_eq!(error_body_message(br#"{"error":"boom"}"#), "boom");
    }

    #[test]
    fn error_message_falls_back_to_text_then_byte_count() {
        assert_eq!(error_body_message(b"  bad gateway \n"), "bad gateway");
        assert_eq!(error_body_message(br#"{"other":1}"#), r#"{"other":1}"#);
        assert_eq!(
            error_body_message(&[0xff, 0xfe, 0x00]),
            "<3 bytes of binary data>"
        );
    }

    #[test]
    fn response_text_header_is_optional() {
        let mut headers = HeaderMap::new();
        assert_eq!(response_text(&headers), None);
        headers.insert(RESPONSE_TEXT_HEADER, HeaderValue::from_static(""));
        assert_eq!(response_text(&headers), None);
    }

    #[test]
    fn response_text_is_decoded_as_latin1() {
        let mut headers = HeaderMap::new();
        // "Olá, não sei" as the server encodes it.
        let latin1 = [
            0x4f, 0x6c, 0xe1, 0x2c, 0x20, 0x6e, 0xe3, 0x6f, 0x20, 0x73, 0x65, 0x69,
        ];
        headers.insert(
            RESPONSE_TEXT_HEADER,
            HeaderValue::from_bytes(&latin1).expect("obs-text is a valid header value"),
        );
        assert_eq!(response_text(&headers).as_deref(), Some("Olá, não sei"));
    }

    #[test]
    fn response_text_keeps_utf8_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RESPONSE_TEXT_HEADER,
            HeaderValue::from_bytes("Olá".as_bytes()).expect("obs-text is a valid header value"),
        );
        assert_eq!(response_text(&headers).as_deref(), Some("Olá"));
    }

    #[test]
    fn cache_bust_is_a_millisecond_timestamp() {
        let (name, value) = cache_bust();
        assert_eq!(name, "_t");
        assert!(value.parse::<i64>().expect("numeric") > 1_600_000_000_000);
    }
}
