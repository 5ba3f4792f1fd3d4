use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use super::{AppState, error::ApiError};
use crate::{
    pipeline::scan,
    store::{NewResult, StoredResult},
};

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
    pub confidence: f32,
    /// Base64-encoded PNG overlay.
    pub heatmap: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveRequest {
    pub prediction: Option<String>,
    pub confidence: Option<f64>,
    /// Base64 PNG, optionally as a `data:` URL.
    pub heatmap: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    pub ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultEntry {
    pub id: i64,
    pub timestamp: String,
    pub heatmap_image: String,
    pub prediction: String,
    pub confidence: f64,
}

impl From<StoredResult> for ResultEntry {
    fn from(row: StoredResult) -> Self {
        Self {
            id: row.id,
            timestamp: row.timestamp.to_rfc3339(),
            heatmap_image: STANDARD.encode(&row.heatmap_image),
            prediction: row.prediction,
            confidence: row.confidence,
        }
    }
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_owned(),
    })
}

pub(crate) async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::MissingImage)?;
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.body_text()))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|err| ApiError::BadRequest(err.body_text()))?;
            upload = Some(bytes);
            break;
        }
    }
    let bytes = upload
        .filter(|bytes| !bytes.is_empty())
        .ok_or(ApiError::MissingImage)?;

    let response = tokio::task::spawn_blocking(move || {
        let image = image::load_from_memory(&bytes).map_err(ApiError::InvalidImage)?;
        let report = scan(state.model.as_ref(), &image, state.overlay)?;
        let png = report.encode_png()?;
        Ok::<_, ApiError>(PredictResponse {
            prediction: report.diagnosis.label().to_owned(),
            confidence: report.diagnosis.confidence,
            heatmap: STANDARD.encode(png),
        })
    })
    .await??;
    Ok(Json(response))
}

pub(crate) async fn save(
    State(state): State<AppState>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let (Some(prediction), Some(confidence), Some(heatmap)) =
        (request.prediction, request.confidence, request.heatmap)
    else {
        return Err(ApiError::MissingFields);
    };
    if prediction.is_empty() || heatmap.is_empty() {
        return Err(ApiError::MissingFields);
    }
    let encoded = heatmap
        .split_once(',')
        .map_or(heatmap.as_str(), |(_, data)| data);
    let heatmap_image = STANDARD
        .decode(encoded.trim())
        .map_err(ApiError::InvalidHeatmap)?;

    let result = NewResult {
        heatmap_image,
        prediction,
        confidence,
    };
    tokio::task::spawn_blocking(move || state.store.insert(&result)).await??;
    Ok(message("Result saved successfully"))
}

pub(crate) async fn get_all(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResultEntry>>, ApiError> {
    let rows = tokio::task::spawn_blocking(move || state.store.list()).await??;
    Ok(Json(rows.into_iter().map(ResultEntry::from).collect()))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let ids = request
        .ids
        .filter(|ids| !ids.is_empty())
        .ok_or(ApiError::MissingIds)?;
    tokio::task::spawn_blocking(move || state.store.delete(&ids)).await??;
    Ok(message("Results deleted successfully"))
}
