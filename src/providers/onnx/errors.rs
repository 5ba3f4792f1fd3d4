use std::path::PathBuf;

use thiserror::Error;

use crate::providers::InferenceError;

/// Errors produced while loading or running the ONNX feature extractor.
#[derive(Debug, Error)]
pub enum OnnxExtractorError {
    #[error("failed to read artefact at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("artefact at {path} expected SHA-256 {expected} but found {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error("failed to parse class weights from {path}: {source}")]
    ParseWeights {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("class weights are inconsistent: {0}")]
    InvalidWeights(String),
    #[error("extractor requires a non-empty {0} name")]
    MissingName(&'static str),
    #[error("extractor requires a non-zero input size")]
    ZeroInputSize,
    #[error("failed to construct ONNX session builder: {0}")]
    CreateSessionBuilder(#[source] ort::Error),
    #[error("failed to create ONNX session: {0}")]
    CreateSession(#[source] ort::Error),
    #[error("failed to convert image into tensor: {0}")]
    EncodeTensor(#[source] ort::Error),
    #[error("session mutex was poisoned by a previous panic")]
    SessionPoisoned,
    #[error("failed to run inference: {0}")]
    Inference(#[source] ort::Error),
    #[error("ONNX output \"{name}\" missing from session results")]
    OutputMissing { name: String },
    #[error("ONNX output \"{name}\" has shape {actual:?} but expected {expected}")]
    UnexpectedShape {
        name: String,
        expected: String,
        actual: Vec<i64>,
    },
}

impl From<OnnxExtractorError> for InferenceError {
    fn from(err: OnnxExtractorError) -> Self {
        match err {
            OnnxExtractorError::OutputMissing { name } => Self::MalformedOutput {
                name,
                reason: "missing from session results".into(),
            },
            OnnxExtractorError::UnexpectedShape {
                name,
                expected,
                actual,
            } => Self::MalformedOutput {
                name,
                reason: format!("shape {actual:?} does not match {expected}"),
            },
            other => Self::Backend(Box::new(other)),
        }
    }
}
