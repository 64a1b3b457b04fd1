//! Conversion from [`FetchError`] to a JSON error response

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

pub const NO_STORE: &str = "no-store, max-age=0";

/// `{"detail": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "{}", self);
        }

        let body = ErrorBody {
            detail: self.to_string(),
        };

        (
            status,
            [(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE))],
            Json(body),
        )
            .into_response()
    }
}
