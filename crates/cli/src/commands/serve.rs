//! Serve command handler.

use crate::{app, server};
use anyhow::Context;
use clap::Args;
use colloquy_core::config::AppConfig;
use std::net::SocketAddr;
use std::sync::Arc;

/// Index the corpus and answer questions over HTTP
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (host:port)
    #[arg(short, long, env = "COLLOQUY_BIND")]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let bind = self.bind.as_deref().unwrap_or(&config.server.bind);
        let addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("invalid bind address {}", bind))?;

        let pipeline = app::build_pipeline(config)
            .await
            .context("failed to prepare the answer pipeline")?;
        let router = server::router(Arc::new(pipeline));

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("Server is listening on http://{}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server shutdown")?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
