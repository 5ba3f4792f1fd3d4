use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{pipeline::ScanError, store::StoreError};

/// Failures surfaced to HTTP clients as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No image file provided")]
    MissingImage,
    #[error("Invalid image file: {0}")]
    InvalidImage(#[source] image::ImageError),
    #[error("Missing data fields")]
    MissingFields,
    #[error("Invalid heatmap encoding: {0}")]
    InvalidHeatmap(#[source] base64::DecodeError),
    #[error("Missing ids")]
    MissingIds,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingImage
            | Self::InvalidImage(_)
            | Self::MissingFields
            | Self::InvalidHeatmap(_)
            | Self::MissingIds
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Scan(_) | Self::Store(_) | Self::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
