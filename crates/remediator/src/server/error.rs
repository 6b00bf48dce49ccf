use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid API token")]
    Unauthorized,
    #[error("{0}")]
    Malformed(String),
    #[error("{0}")]
    InvalidRule(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::Malformed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ProxyError::InvalidRule(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        ProxyError::Upstream(e.to_string())
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(e: std::io::Error) -> Self {
        ProxyError::Internal(format!("Rules file error: {}", e))
    }
}

impl From<serde_yaml::Error> for ProxyError {
    fn from(e: serde_yaml::Error) -> Self {
        ProxyError::Internal(format!("Rules file is not valid YAML: {}", e))
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Proxy request failed: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
