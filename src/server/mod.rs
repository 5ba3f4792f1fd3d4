//! HTTP API: prediction, result history, and health.

mod error;
mod handlers;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header, header::InvalidHeaderValue},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

pub use error::ApiError;
pub use handlers::{DeleteRequest, MessageResponse, PredictResponse, ResultEntry, SaveRequest};

use crate::{config::OverlayConfig, providers::ModelHandle, store::ResultStore};

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub model: ModelHandle,
    pub store: Arc<ResultStore>,
    pub overlay: OverlayConfig,
}

impl AppState {
    #[must_use]
    pub fn new(model: ModelHandle, store: ResultStore, overlay: OverlayConfig) -> Self {
        Self {
            model,
            store: Arc::new(store),
            overlay,
        }
    }
}

/// CORS policy admitting a single browser origin.
///
/// # Errors
///
/// Returns an error when `origin` is not a valid header value.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    let origin = HeaderValue::from_str(origin)?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Build the application router.
///
/// | Route | Method |
/// |-------|--------|
/// | `/predict` | POST multipart with an `image` field |
/// | `/save` | POST JSON `{prediction, confidence, heatmap}` |
/// | `/getall` | GET |
/// | `/delete` | POST JSON `{ids}` |
/// | `/healthz` | GET |
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/save", post(handlers::save))
        .route("/getall", get(handlers::get_all))
        .route("/delete", post(handlers::delete))
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}
