use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use lmsgate_auth::{GrantService, OAuthState, oauth_router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::bootstrap::{self, BootstrapError};
use crate::{config::AppConfig, handlers};

pub struct LmsgateServer {
    addr: SocketAddr,
    app: Router,
}

/// Builds the application from configuration, connecting the configured
/// refresh-token storage backend.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, BootstrapError> {
    let storage = bootstrap::refresh_token_storage(cfg).await?;
    let grants = bootstrap::grant_service(cfg, storage)?;
    Ok(build_router(cfg, grants))
}

/// Mounts the OAuth2 endpoints and the health endpoints on one router.
pub fn build_router(cfg: &AppConfig, grants: Arc<GrantService>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .nest(&cfg.server.mount_path, oauth_router(OAuthState::new(grants)))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    // Path only: the query string of /auth carries credentials
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.path = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(DefaultBodyLimit::max(cfg.server.body_limit_bytes))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> Result<LmsgateServer, BootstrapError> {
        let app = build_app(&self.config).await?;

        Ok(LmsgateServer {
            addr: self.addr,
            app,
        })
    }
}

impl LmsgateServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
