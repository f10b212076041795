use godofreda_client::{
    chat::{Conversation, Sender},
    GodofredaApi, GodofredaClient, DEFAULT_BASE_URL,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let client = GodofredaClient::from_env().unwrap_or_else(|_| GodofredaClient::new(DEFAULT_BASE_URL));
    let api = GodofredaApi::new(client);

    let mut conversation = Conversation::new();
    for line in ["Olá, Godofreda!", "Qual é o sentido da vida?"] {
        conversation.send_text(&api, line, "").await;
    }

    for message in conversation.messages() {
        let who = match message.sender {
            Sender::User => "you",
            Sender::Godofreda => "godofreda",
            Sender::System => "system",
        };
        println!("[{who}] {}", message.text);
    }

    let speech = api.synthesize_text("Até logo, humano.").await?;
    println!("received {} bytes of audio", speech.audio.len());

    api.shutdown();
    Ok(())
}
