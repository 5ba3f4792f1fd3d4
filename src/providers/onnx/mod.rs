//! ONNX-backed feature extractor with artefact verification.
mod artefact;
mod config;
mod errors;
mod extractor;
mod weights;

pub use artefact::{OnnxArtefact, compute_sha256};
pub use config::OnnxExtractorConfig;
pub use errors::OnnxExtractorError;
pub use weights::ClassWeights;

use ndarray::Array1;

use crate::{
    config::InputSize,
    normalize::NormalizedImage,
    providers::{Extraction, FeatureExtractor, InferenceError, check_input_shape},
};
use extractor::OnnxImageModel;

/// Feature extractor backed by an ONNX image classifier.
///
/// The graph takes one NHWC image and exposes two outputs: the feature map
/// of its last convolutional block and the class scores. The classifier's
/// dense-layer kernel is loaded separately from a JSON artefact.
#[derive(Debug)]
pub struct OnnxFeatureExtractor {
    inner: OnnxImageModel,
}

impl OnnxFeatureExtractor {
    /// Builds an extractor from disk artefacts.
    ///
    /// # Errors
    ///
    /// Returns [`OnnxExtractorError`] when artefact verification, weight parsing, or ONNX initialisation fails.
    ///
    /// # Examples
    /// ```no_run
    /// use tumor_cam::config::InputSize;
    /// use tumor_cam::providers::onnx::{OnnxArtefact, OnnxExtractorConfig, OnnxExtractorError, OnnxFeatureExtractor};
    ///
    /// # fn main() -> Result<(), OnnxExtractorError> {
    /// let config = OnnxExtractorConfig {
    ///     model: OnnxArtefact {
    ///         path: std::path::PathBuf::from("/models/tumor_vgg16.onnx"),
    ///         sha256: Some("0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef".into()),
    ///     },
    ///     weights: OnnxArtefact::unchecked("/models/tumor_vgg16_dense.json"),
    ///     input_name: "input_1".into(),
    ///     feature_output: "block5_conv3".into(),
    ///     probability_output: "dense_1".into(),
    ///     input_size: InputSize::new(200, 200),
    ///     apply_softmax: false,
    /// };
    /// let extractor = OnnxFeatureExtractor::new(config)?;
    /// # let _ = extractor;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: OnnxExtractorConfig) -> Result<Self, OnnxExtractorError> {
        OnnxImageModel::new(config).map(|inner| Self { inner })
    }
}

impl FeatureExtractor for OnnxFeatureExtractor {
    fn input_size(&self) -> InputSize {
        self.inner.input_size()
    }

    fn class_count(&self) -> usize {
        self.inner.weights().classes()
    }

    fn extract(&self, image: &NormalizedImage) -> Result<Extraction, InferenceError> {
        check_input_shape(self.inner.input_size(), image)?;
        Ok(self.inner.run(image)?)
    }

    fn class_weights(&self, class: usize) -> Result<Array1<f32>, InferenceError> {
        let weights = self.inner.weights();
        weights
            .for_class(class)
            .ok_or(InferenceError::ClassOutOfRange {
                index: class,
                classes: weights.classes(),
            })
    }
}
