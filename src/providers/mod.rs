//! Feature extraction providers.
//!
//! Defines the [`FeatureExtractor`] trait: one forward pass that yields the
//! last convolutional feature map together with class probabilities, plus
//! access to the classifier's dense-layer weights for a class.

use std::sync::Arc;

use ndarray::{Array1, Array3};
use thiserror::Error;

use crate::{config::InputSize, normalize::NormalizedImage};

#[cfg(feature = "onnx")]
pub mod onnx;

/// Output of one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Feature map of the designated layer, shaped `[h, w, channels]`.
    pub features: Array3<f32>,
    /// Class probabilities; sums to one.
    pub probabilities: Array1<f32>,
}

impl Extraction {
    /// Index of the most probable class. Ties resolve to the first maximum
    /// and NaN entries are never selected.
    #[must_use]
    pub fn predicted_class(&self) -> Option<usize> {
        self.probabilities
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_nan())
            .fold(None, |best: Option<(usize, f32)>, (index, p)| match best {
                Some((_, current)) if *p <= current => best,
                _ => Some((index, *p)),
            })
            .map(|(index, _)| index)
    }

    /// Probability of `class`, if it exists.
    #[must_use]
    pub fn confidence(&self, class: usize) -> Option<f32> {
        self.probabilities.get(class).copied()
    }
}

/// Errors raised while running the network.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("input tensor has shape {actual:?} but the network expects {expected:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: [usize; 3],
    },
    #[error("class index {index} is out of range for {classes} classes")]
    ClassOutOfRange { index: usize, classes: usize },
    #[error("network output \"{name}\" is malformed: {reason}")]
    MalformedOutput { name: String, reason: String },
    #[error("inference backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// A trained network exposing its last convolutional block and classifier weights.
///
/// Implementations are immutable once constructed and shared between
/// requests, hence the `Send + Sync` bound.
pub trait FeatureExtractor: Send + Sync {
    /// Resolution the network expects at its input.
    fn input_size(&self) -> InputSize;

    /// Number of classes the classifier distinguishes.
    fn class_count(&self) -> usize;

    /// Run one forward pass.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::ShapeMismatch`] when `image` does not match
    /// [`Self::input_size`], and other variants when the backend fails or
    /// produces malformed output.
    fn extract(&self, image: &NormalizedImage) -> Result<Extraction, InferenceError>;

    /// Dense-layer weights connecting each feature channel to `class`.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::ClassOutOfRange`] for unknown classes.
    fn class_weights(&self, class: usize) -> Result<Array1<f32>, InferenceError>;
}

/// Shared, immutable handle to a loaded network.
pub type ModelHandle = Arc<dyn FeatureExtractor>;

/// Check that `image` matches the network's declared input size.
///
/// # Errors
///
/// Returns [`InferenceError::ShapeMismatch`] when the shapes differ.
pub fn check_input_shape(expected: InputSize, image: &NormalizedImage) -> Result<(), InferenceError> {
    let expected = expected.tensor_shape();
    let (height, width, channels) = image.shape();
    let actual = [height, width, channels];
    if actual == expected {
        Ok(())
    } else {
        Err(InferenceError::ShapeMismatch { expected, actual })
    }
}
