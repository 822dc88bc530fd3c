use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use speakwise_server::analysis::feedback::FeedbackComposer;
use speakwise_server::auth::TokenVerifier;
use speakwise_server::config::Config;
use speakwise_server::report::ReportStore;
use speakwise_server::routes::{router, AppState};
use speakwise_server::transcription::Transcriber;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; deployments usually set the environment directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let stt_api_key = config.stt_api_key()?.to_string();
    let transcriber = Transcriber::new(config.stt_provider, stt_api_key)?;
    let composer = FeedbackComposer::new(config.gemini_api_key.clone())?;
    let store = ReportStore::open(config.data_dir.clone())?;
    let verifier = TokenVerifier::new(&config.jwt_secret);

    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set, feedback will be rule-based only");
    }

    let state = AppState {
        transcriber: Arc::new(transcriber),
        composer: Arc::new(composer),
        store: Arc::new(store),
        verifier: Arc::new(verifier),
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    tracing::info!("speakwise server listening on {}", config.listen_addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
