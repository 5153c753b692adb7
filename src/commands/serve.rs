use clap::Args;
use std::net::SocketAddr;

use lofersil::{build_router, spawn_cleanup_task, AppState, Config, CsrfTokenService};

#[derive(Args)]
pub struct ServeCommand {
    /// Port to listen on (overrides config)
    #[arg(long, short)]
    pub port: Option<u16>,
}

impl ServeCommand {
    pub async fn run(&self, config: Config) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(path) = &config.config_file {
            tracing::info!("Config file: {}", path.display());
        }
        if !config.production.value {
            tracing::info!("Running in development mode, CSRF cookie is not marked Secure");
        }

        let cleanup_interval = config.csrf.cleanup_interval();
        let service = CsrfTokenService::new(config.csrf.clone())?;
        let state = AppState::new(service, config.production.value);

        let cleanup = spawn_cleanup_task(state.csrf.clone(), cleanup_interval);
        let app = build_router(state);

        let port = self.port.unwrap_or(config.port.value);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("Starting server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        cleanup.abort();
        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
