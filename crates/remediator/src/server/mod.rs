//! Authenticated monitoring proxy in front of Prometheus and Grafana.

mod auth;
mod error;
mod routes;

pub use error::ProxyError;

use crate::config::ProxyConfig;
use crate::{Error, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::StatusCode;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ProxyState {
    pub config: ProxyConfig,
    pub client: reqwest::Client,
    /// Serialises writers of the rules file.
    pub rules_lock: Mutex<()>,
}

impl ProxyState {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        if config.api_token.is_empty() {
            return Err(Error::Config("API_TOKEN must not be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .build()?;
        Ok(Self {
            config,
            client,
            rules_lock: Mutex::new(()),
        })
    }
}

pub struct ProxyServer {
    state: Arc<ProxyState>,
}

impl ProxyServer {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        Ok(Self {
            state: Arc::new(ProxyState::new(config)?),
        })
    }

    pub fn build_router(self) -> Router {
        let state = self.state;

        Router::new()
            .route("/health", get(routes::health))
            .route("/metrics", get(routes::prometheus_metrics))
            .route("/tools/list_alerts", get(routes::list_alerts))
            .route("/tools/query_range", post(routes::query_range))
            .route("/tools/create_alert", post(routes::create_alert))
            .route("/tools/sync_dashboard", post(routes::sync_dashboard))
            .fallback(|| async { StatusCode::NOT_FOUND })
            // Added after the fallback so unknown paths are also token-checked.
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn_with_state(state.clone(), auth::require_token)),
            )
            .with_state(state)
    }

    pub async fn start(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Monitor proxy listening on {}", addr);
        axum::serve(listener, self.build_router()).await?;
        Ok(())
    }
}
