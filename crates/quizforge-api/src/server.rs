use crate::{create_router, AppState};
use anyhow::Context;
use quizforge_core::ConfigManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

pub struct Server {
    state: AppState,
    addr: SocketAddr,
}

impl Server {
    pub async fn new(config: Arc<ConfigManager>) -> anyhow::Result<Self> {
        let server = &config.config().server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", server.host, server.port))?;
        let state = AppState::new(config.clone()).await?;
        Ok(Self { state, addr })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let router = create_router(self.state);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;

        info!("QuizForge API listening on http://{}", self.addr);
        info!("OpenAPI document at http://{}/api/openapi.json", self.addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
