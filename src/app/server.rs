use crate::app::handlers;
use crate::core::aggregate::AggregateConfig;
use crate::domain::ports::Serve;
use async_trait::async_trait;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

pub fn build_app(config: Arc<AggregateConfig>) -> Router {
    let api_v1 = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/agents", get(handlers::list_agents))
        .route("/agents/{key}", get(handlers::get_agent))
        .route("/teams", get(handlers::list_teams))
        .route("/workflows", get(handlers::list_workflows))
        .with_state(config);

    Router::new()
        .route("/livez", get(handlers::livez))
        .nest("/api/v1", api_v1)
}

/// Serves the assembled configuration over HTTP until Ctrl+C or SIGTERM.
pub struct HttpServer {
    host: String,
    port: u16,
}

impl HttpServer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl Serve for HttpServer {
    async fn serve(&self, config: AggregateConfig) -> anyhow::Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        serve_on(listener, config).await
    }
}

pub async fn serve_on(listener: TcpListener, config: AggregateConfig) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_app(Arc::new(config));

    tracing::info!(addr = %addr, "Starting server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
