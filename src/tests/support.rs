//! Deterministic test doubles and comparison helpers.

use ndarray::{Array1, Array3};

use crate::{
    config::InputSize,
    normalize::NormalizedImage,
    providers::{Extraction, FeatureExtractor, InferenceError, check_input_shape},
};

#[must_use]
pub fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() < tol
}

/// Feature extractor that returns canned tensors regardless of the image.
///
/// Every class shares the same weight vector. Inputs are still checked
/// against the declared input size.
#[derive(Debug, Clone)]
pub struct FixedExtractor {
    input_size: InputSize,
    features: Array3<f32>,
    probabilities: Array1<f32>,
    weights: Array1<f32>,
}

impl FixedExtractor {
    #[must_use]
    pub fn new(features: Array3<f32>, probabilities: Array1<f32>, weights: Array1<f32>) -> Self {
        Self {
            input_size: InputSize::default(),
            features,
            probabilities,
            weights,
        }
    }

    #[must_use]
    pub fn with_input_size(mut self, input_size: InputSize) -> Self {
        self.input_size = input_size;
        self
    }
}

impl FeatureExtractor for FixedExtractor {
    fn input_size(&self) -> InputSize {
        self.input_size
    }

    fn class_count(&self) -> usize {
        self.probabilities.len()
    }

    fn extract(&self, image: &NormalizedImage) -> Result<Extraction, InferenceError> {
        check_input_shape(self.input_size, image)?;
        Ok(Extraction {
            features: self.features.clone(),
            probabilities: self.probabilities.clone(),
        })
    }

    fn class_weights(&self, class: usize) -> Result<Array1<f32>, InferenceError> {
        if class < self.class_count() {
            Ok(self.weights.clone())
        } else {
            Err(InferenceError::ClassOutOfRange {
                index: class,
                classes: self.class_count(),
            })
        }
    }
}
