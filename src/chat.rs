//! Chat transcript built on tracked chat calls.

use chrono::{DateTime, Utc};

use crate::{upload::UploadFile, GodofredaApi};

/// Text shown when a multimodal reply carries no `x-response-text` header.
pub const FALLBACK_REPLY_TEXT: &str = "Resposta da Godofreda";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sender {
    User,
    Godofreda,
    System,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageKind {
    Text,
    Multimodal,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub id: u64,
    pub sender: Sender,
    pub kind: MessageKind,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Spoken reply, when the service returned audio.
    pub audio: Option<Vec<u8>>,
    pub image: Option<UploadFile>,
    pub voice: Option<UploadFile>,
}

/// Ordered messages of one chat session.
///
/// Failures are recorded as system messages instead of being returned.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Sends `text` to `/chat` and appends the user message and the outcome.
    pub async fn send_text(
        &mut self,
        api: &GodofredaApi,
        text: &str,
        context: &str,
    ) -> &ChatMessage {
        self.push(Sender::User, MessageKind::Text, text.to_owned());
        match api.send_chat_message(text, context).await {
            Ok(reply) => self.push(Sender::Godofreda, MessageKind::Text, reply.response),
            Err(err) => self.push_error(&err),
        }
    }

    /// Sends text with optional attachments and appends the spoken reply.
    pub async fn send_multimodal(
        &mut self,
        api: &GodofredaApi,
        text: &str,
        image: Option<UploadFile>,
        voice: Option<UploadFile>,
    ) -> &ChatMessage {
        let kind = if image.is_some() || voice.is_some() {
            MessageKind::Multimodal
        } else {
            MessageKind::Text
        };
        let user = self.push(Sender::User, kind, text.to_owned());
        user.image = image.clone();
        user.voice = voice.clone();

        match api
            .send_multimodal_message(text, image.as_ref(), voice.as_ref())
            .await
        {
            Ok(reply) => {
                let text = reply
                    .response_text
                    .unwrap_or_else(|| FALLBACK_REPLY_TEXT.to_owned());
                let message = self.push(Sender::Godofreda, MessageKind::Text, text);
                message.audio = Some(reply.audio);
                message
            }
            Err(err) => self.push_error(&err),
        }
    }

    fn push_error(&mut self, err: &dyn std::fmt::Display) -> &mut ChatMessage {
        self.push(Sender::System, MessageKind::Error, format!("Erro: {err}"))
    }

    fn push(&mut self, sender: Sender, kind: MessageKind, text: String) -> &mut ChatMessage {
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id: self.next_id,
            sender,
            kind,
            text,
            timestamp: Utc::now(),
            audio: None,
            image: None,
            voice: None,
        });
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }
}
