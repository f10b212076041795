use godofreda_client::{
    ClientOptions, Connectivity, GodofredaApi, GodofredaClient, GodofredaError, RequestState,
};

fn live_client() -> Option<GodofredaClient> {
    match GodofredaClient::from_env() {
        Ok(client) => Some(client.with_options(ClientOptions {
            auto_check_health: false,
            ..ClientOptions::default()
        })),
        Err(_) => {
            eprintln!("skipping live test: GODOFREDA_API_URL is not set");
            None
        }
    }
}

#[tokio::test]
async fn live_health_status_and_personality() {
    let Some(client) = live_client() else {
        return;
    };
    let api = GodofredaApi::new(client);

    let health = api.check_health().await.expect("health check must succeed");
    assert_eq!(health.status, "healthy");
    assert_eq!(api.snapshot().connectivity, Connectivity::Online);

    let info = api.service_info().await.expect("service info must load");
    assert!(info.message.contains("Godofreda"));

    let status = api.get_status().await.expect("status must load");
    assert!(!status.system.status.is_empty());

    let profile = api.get_personality().await.expect("personality must load");
    assert_eq!(profile.name, "Godofreda");
    assert_eq!(api.snapshot().status, RequestState::Success);

    let metrics = api.metrics().await.expect("metrics must load");
    assert!(metrics.contains("# HELP") || metrics.contains("# TYPE"));
}

#[tokio::test]
async fn live_invalid_speech_text_is_rejected_locally() {
    let Some(client) = live_client() else {
        return;
    };
    let api = GodofredaApi::new(client);

    let err = api
        .synthesize_text(&"a".repeat(1001))
        .await
        .expect_err("text over the limit must fail");
    assert!(matches!(err, GodofredaError::Validation(_)));
    assert_eq!(api.snapshot().status, RequestState::Idle);
}
