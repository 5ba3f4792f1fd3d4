//! End-to-end scan: normalise, extract, build the activation map, composite.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage};
use thiserror::Error;

use crate::{
    api::{Diagnosis, TumorClass},
    cam::{CamError, RelevanceMap, class_activation_map},
    config::OverlayConfig,
    normalize::normalize,
    overlay::compose_overlay,
    providers::{FeatureExtractor, InferenceError},
};

/// Errors produced by [`scan`] and [`ScanReport::encode_png`].
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Cam(#[from] CamError),
    #[error("network predicted class {index}, which has no label")]
    UnknownLabel { index: usize },
    #[error("network produced no usable class probabilities")]
    NoPrediction,
    #[error("failed to encode overlay: {0}")]
    Encode(#[source] image::ImageError),
}

/// Diagnosis plus the visual explanation for it.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub diagnosis: Diagnosis,
    /// Relevance at the model's input resolution.
    pub relevance: RelevanceMap,
    /// Heat map blended over the normalised scan.
    pub overlay: RgbImage,
}

impl ScanReport {
    /// Encode the overlay as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Encode`] if the encoder fails.
    pub fn encode_png(&self) -> Result<Vec<u8>, ScanError> {
        let mut bytes = Cursor::new(Vec::new());
        self.overlay
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(ScanError::Encode)?;
        Ok(bytes.into_inner())
    }
}

/// Classify `image` and explain the prediction with a class activation map.
///
/// # Errors
///
/// Propagates inference and activation-map errors, and rejects class
/// indices without a [`TumorClass`].
pub fn scan(
    extractor: &dyn FeatureExtractor,
    image: &DynamicImage,
    overlay: OverlayConfig,
) -> Result<ScanReport, ScanError> {
    let input_size = extractor.input_size();
    let normalized = normalize(image, input_size);
    let extraction = extractor.extract(&normalized)?;
    let classes = extractor.class_count();
    if extraction.probabilities.len() != classes {
        return Err(InferenceError::MalformedOutput {
            name: "probabilities".into(),
            reason: format!(
                "{} entries for {classes} classes",
                extraction.probabilities.len()
            ),
        }
        .into());
    }

    let index = extraction.predicted_class().ok_or(ScanError::NoPrediction)?;
    let class = TumorClass::from_index(index).ok_or(ScanError::UnknownLabel { index })?;
    let confidence = extraction.confidence(index).ok_or(ScanError::NoPrediction)?;

    let weights = extractor.class_weights(index)?;
    let relevance = class_activation_map(extraction.features.view(), weights.view())?
        .upsample(input_size.width, input_size.height);
    let overlay = compose_overlay(&normalized.to_rgb8(), &relevance, overlay);

    tracing::info!(prediction = class.label(), confidence, "scan classified");
    Ok(ScanReport {
        diagnosis: Diagnosis { class, confidence },
        relevance,
        overlay,
    })
}
