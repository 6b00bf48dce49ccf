//! Shared-secret header check applied to every proxy route.

use super::{error::ProxyError, ProxyState};
use crate::gateway::TOKEN_HEADER;
use crate::metrics;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

pub async fn require_token(
    State(state): State<Arc<ProxyState>>,
    request: Request,
    next: Next,
) -> Result<Response, ProxyError> {
    let provided = request.headers().get(TOKEN_HEADER).map(|v| v.as_bytes());

    if provided != Some(state.config.api_token.as_bytes()) {
        let endpoint = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "unmatched".to_string());
        warn!(endpoint = %endpoint, present = provided.is_some(), "Rejected request with bad API token");
        metrics::record_auth_failure(&endpoint);
        return Err(ProxyError::Unauthorized);
    }

    Ok(next.run(request).await)
}
