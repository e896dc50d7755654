use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vigia_config::VigiaConfig;
use vigia_web::state::AppState;
use vigiad::{api::setup_api, prelude::*};

/// Main entry point for the Vigia identity service.
///
/// Initializes logging, loads the configuration, seeds the credential store
/// and serves the API until a shutdown signal is received.
///
/// # Examples
///
/// The service is typically started with:
/// ```bash
/// export VIGIA_CONFIG=/etc/vigia/vigia.toml
/// export VIGIA_JWT_SECRET=your_jwt_secret
/// vigiad
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = VigiaConfig::load()?;
    tracing::info!("Starting with {config}");
    let state = AppState::from_config(&config)?;

    let listener = TcpListener::bind(config.bind).await?;
    let api_handle = setup_api(state, listener).await?;

    tokio::select! {
        result = api_handle => {
            tracing::error!("API server stopped: {:?}", result);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
