//! Configuration for the ONNX-backed feature extractor.

use super::artefact::OnnxArtefact;
use crate::config::InputSize;

/// Configuration for an ONNX image classifier exposing its last convolutional block.
#[derive(Debug, Clone)]
pub struct OnnxExtractorConfig {
    /// Model artefact (ONNX graph) to load.
    pub model: OnnxArtefact,
    /// JSON artefact holding the dense-layer kernel, `channels x classes`.
    pub weights: OnnxArtefact,
    /// Name of the NHWC image input in the graph.
    pub input_name: String,
    /// Output carrying the feature map of the designated convolutional layer.
    pub feature_output: String,
    /// Output carrying the class scores.
    pub probability_output: String,
    /// Spatial resolution of the image input.
    pub input_size: InputSize,
    /// Apply softmax to the class output, for graphs that emit logits.
    ///
    /// When unset the class output is used as-is; a warning is logged if it
    /// is not a probability distribution.
    pub apply_softmax: bool,
}
