use std::time::Duration;

use godofreda_client::{ClientOptions, GodofredaApi, GodofredaClient, DEFAULT_BASE_URL};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let url = std::env::var("GODOFREDA_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
    let client = GodofredaClient::new(url).with_options(ClientOptions {
        health_check_interval_ms: 5_000,
        ..ClientOptions::from_env()?
    });
    let api = GodofredaApi::new(client);
    let mut changes = api.subscribe();

    let watch = async {
        while changes.changed().await.is_ok() {
            let snapshot = changes.borrow_and_update().clone();
            println!(
                "connectivity={:?} status={:?} last_error={:?}",
                snapshot.connectivity, snapshot.status, snapshot.last_error
            );
        }
    };

    tokio::select! {
        _ = watch => {}
        _ = tokio::time::sleep(Duration::from_secs(60)) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    api.shutdown();
    Ok(())
}
