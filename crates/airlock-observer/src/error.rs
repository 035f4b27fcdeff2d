//! Error types for the Observer API server.
//!
//! [`ObserverError`] converts into an Axum response carrying a JSON body
//! with the message and status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Request failures the handlers report to clients.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// No game has published a snapshot yet.
    #[error("no game running")]
    NoGame,

    /// A query parameter has an unsupported value.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl ObserverError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::NoGame => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_failure() {
        assert_eq!(ObserverError::NoGame.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ObserverError::InvalidQuery("x".to_owned()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
