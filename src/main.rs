use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trybl::{config::WidgetConfig, state::AppState};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trybl=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting trybl quiz widget...");

    let config = WidgetConfig::from_env();
    let (backend, dev_backend) = config.build_backend();

    let state = Arc::new(AppState::new(&config, backend));
    tracing::info!(
        "Question: {} ({} options, {}s countdown)",
        state.question.prompt,
        state.question.options.len(),
        state.countdown_seconds
    );

    let app = trybl::router(state, dev_backend);

    tracing::info!("Listening on http://{}", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .unwrap();
    axum::serve(listener, app).await.unwrap();
}
