//! BookingRelay API server binary entrypoint.

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use relay_api::routes::create_router;
use relay_api::state::ProdState;
use relay_common::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("relay_api=debug,relay_engine=debug,relay_notifier=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting BookingRelay API server...");

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!(
        timezone = %config.timezone,
        admin_phones = config.admin_phones.len(),
        "Configuration loaded"
    );

    let port = config.port;

    // Build application state (scheduler, records store, gateway)
    let state = ProdState::from_config(config);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
