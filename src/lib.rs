pub mod api; // HTTP surface: pages, predict, report
pub mod classifier; // Classifier seam + model registry
pub mod config;
pub mod page; // Form renderer
pub mod prediction; // Prediction handler
pub mod report; // PDF report generator
pub mod routing; // Path → page
pub mod schema; // Feature schemas
pub mod session; // Verdict tokens + form state
pub mod submission;

#[cfg(test)]
mod test_support;

use tracing_subscriber::EnvFilter;

use crate::api::AppContext;
use crate::classifier::{ClassifierError, ModelRegistry};
use crate::config::{ConfigError, ServerConfig};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Classifier unavailable: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("Server error: {0}")]
    Server(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `debug`.
pub fn init_tracing(debug: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter(debug))),
        )
        .init();
}

/// Load configuration and models, serve until Ctrl-C.
///
/// Any model that fails to load aborts startup before the port is bound.
pub async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;
    init_tracing(config.debug);

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let registry = ModelRegistry::load_all(&config.models_dir)?;
    let ctx = AppContext::new(registry, config.debug);

    let mut server = api::start_server(ctx, config.socket_addr())
        .await
        .map_err(StartupError::Server)?;
    tracing::info!(
        session_id = %server.session.session_id,
        started_at = %server.session.started_at,
        "Serving at {}",
        server.session.url()
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!(
        session_id = %server.session.session_id,
        "Ctrl-C received after {}s",
        server.session.uptime_secs()
    );

    server.shutdown();
    server.wait().await;
    Ok(())
}
