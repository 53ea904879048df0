//! Server lifecycle: bind → spawn background task → return handle with
//! shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::api::router::analysis_router;
use crate::api::types::ApiContext;

/// Handle to a running server.
pub struct AnalysisServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl AnalysisServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish after `shutdown`.
    pub async fn stopped(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Server task failed: {e}");
            }
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Bind `addr` and serve the analysis router in a background task.
pub async fn start_server(ctx: ApiContext, addr: SocketAddr) -> Result<AnalysisServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = analysis_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Server received shutdown signal");
        };

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Server error: {e}");
        }

        tracing::info!("Server stopped");
    });

    tracing::info!(%addr, "Server started");

    Ok(AnalysisServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use crate::pipeline::MockModelClient;

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let ctx = ApiContext::ready(Arc::new(MockModelClient::new("{}")));
        let mut server = start_server(ctx, loopback())
            .await
            .expect("server should start");

        assert!(server.addr.port() > 0);

        let resp = reqwest::get(format!("{}/api/health", server.url())).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let ctx = ApiContext::unavailable("missing key");
        let mut first = start_server(ctx.clone(), loopback()).await.unwrap();
        let err = start_server(ctx, first.addr).await.err().unwrap();
        assert!(err.contains("Failed to bind"));
        first.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let ctx = ApiContext::unavailable("missing key");
        let mut server = start_server(ctx, loopback()).await.unwrap();
        server.shutdown();
        server.shutdown();
        server.stopped().await;
    }
}
