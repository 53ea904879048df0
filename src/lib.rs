pub mod api;
pub mod config;
pub mod pipeline;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use api::types::{ApiContext, Backend};
use config::AppConfig;
use pipeline::GeminiClient;

/// Resolve the model backend once at startup.
///
/// Configuration failures do not abort: the server still comes up and every
/// page reports the configuration error.
fn build_backend() -> (Backend, SocketAddr) {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "API configuration error");
            return (
                Backend::Unavailable(e.to_string().into()),
                config::default_bind_addr(),
            );
        }
    };

    let bind_addr = config.bind_addr;
    match GeminiClient::new(config.gemini) {
        Ok(client) => {
            tracing::info!(model = config::GEMINI_MODEL, "Gemini client ready");
            (Backend::Ready(Arc::new(client)), bind_addr)
        }
        Err(e) => {
            tracing::error!(error = %e, "API configuration error");
            (Backend::Unavailable(e.to_string().into()), bind_addr)
        }
    }
}

pub fn run() -> Result<(), String> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    // The blocking HTTP client must be built outside the async runtime.
    let (backend, bind_addr) = build_backend();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;

    runtime.block_on(async move {
        let ctx = ApiContext::new(backend);
        let mut server = api::server::start_server(ctx, bind_addr).await?;
        tracing::info!(url = %server.url(), "Open the analysis page in a browser");

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to listen for shutdown signal: {e}"))?;

        server.shutdown();
        server.stopped().await;
        Ok::<(), String>(())
    })
}
