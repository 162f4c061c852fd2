//! HTTP server lifecycle: bind, spawn the axum server in the background and
//! hand back a handle with a shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::router::build_router;
use crate::api::types::AppContext;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

/// Metadata for a running server.
#[derive(Debug, Clone)]
pub struct ServerSession {
    pub session_id: String,
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

impl ServerSession {
    /// Landing page URL of this session.
    pub fn url(&self) -> String {
        format!("http://{}/", self.server_addr)
    }

    /// Seconds since `started_at`; 0 if the timestamp does not parse.
    pub fn uptime_secs(&self) -> i64 {
        chrono::DateTime::parse_from_rfc3339(&self.started_at)
            .map(|t| (chrono::Utc::now() - t.with_timezone(&chrono::Utc)).num_seconds())
            .unwrap_or(0)
    }
}

/// Handle to a running server.
pub struct PredictServer {
    pub session: ServerSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PredictServer {
    /// Signal a graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish.
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Server task failed: {e}");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Bind `addr` (port 0 picks an ephemeral port), build the router and spawn
/// the axum server in a background tokio task.
pub async fn start_server(ctx: AppContext, addr: SocketAddr) -> Result<PredictServer, String> {
    // 1. Bind
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    // 2. Build the router
    let debug_mode = ctx.debug;
    let diseases = ctx.registry.diseases().len();
    let app = build_router(ctx);

    // 3. Session metadata
    let session = ServerSession {
        session_id: Uuid::new_v4().to_string(),
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    // 4. Shutdown signal
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    // 5. Serve in background
    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Server received shutdown signal");
        };

        tracing::info!(%addr, debug = debug_mode, diseases, "Server started, open http://{addr}/");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Server error: {e}");
        }

        tracing::info!("Server stopped");
    });

    Ok(PredictServer {
        session,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use crate::test_support::{fixed_registry, ALEX_FORM};

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    async fn start() -> PredictServer {
        start_server(AppContext::new(fixed_registry(0), false), loopback())
            .await
            .expect("server should start")
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let mut server = start().await;

        assert!(!server.session.session_id.is_empty());
        assert!(server.session.port > 0);

        let resp = reqwest::get(server.session.url()).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert!(resp.text().await.unwrap().contains("Disease Prediction"));

        server.shutdown();
        server.wait().await;
    }

    #[tokio::test]
    async fn server_session_has_valid_metadata() {
        let mut server = start().await;

        assert!(Uuid::parse_str(&server.session.session_id).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&server.session.started_at).is_ok());
        assert!((0..5).contains(&server.session.uptime_secs()));
        assert!(server
            .session
            .server_addr
            .ends_with(&server.session.port.to_string()));
        assert_eq!(
            server.session.url(),
            format!("http://{}/", server.session.server_addr)
        );

        server.shutdown();
    }

    #[tokio::test]
    async fn server_serves_predict_and_report() {
        let mut server = start().await;
        let port = server.session.port;
        let client = reqwest::Client::new();

        let html = client
            .post(format!("http://127.0.0.1:{port}/heart/predict"))
            .form(&ALEX_FORM)
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(html.contains("Alex does NOT have heart disease."));

        // No token: nothing to download.
        let resp = client
            .post(format!("http://127.0.0.1:{port}/heart/report"))
            .form(&ALEX_FORM)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

        server.shutdown();
        server.wait().await;
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let mut first = start().await;
        let taken = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), first.session.port);

        let result = start_server(AppContext::new(fixed_registry(0), false), taken).await;
        assert!(result.is_err());

        first.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut server = start().await;
        let stale = ServerSession {
            started_at: "not a timestamp".into(),
            ..server.session.clone()
        };
        assert_eq!(stale.uptime_secs(), 0);

        server.shutdown();
        server.shutdown(); // Second call should be safe
        server.wait().await;
        server.wait().await;
    }
}
