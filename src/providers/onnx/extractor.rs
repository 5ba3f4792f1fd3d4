use std::{
    borrow::Cow,
    sync::{Arc, Mutex},
};

use ndarray::{Array1, Array3};
use ort::{session::Session, value::TensorRef};

use super::{config::OnnxExtractorConfig, errors::OnnxExtractorError, weights::ClassWeights};
use crate::{config::InputSize, normalize::NormalizedImage, providers::Extraction};

#[derive(Debug)]
pub struct OnnxImageModel {
    session: Arc<Mutex<Session>>,
    weights: ClassWeights,
    input_name: String,
    feature_output: String,
    probability_output: String,
    input_size: InputSize,
    apply_softmax: bool,
}

impl OnnxImageModel {
    /// Builds an ONNX image model from the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns configuration and runtime errors when artefacts cannot be verified or parsed, or the ONNX session cannot be created.
    pub fn new(config: OnnxExtractorConfig) -> Result<Self, OnnxExtractorError> {
        for (field, value) in [
            ("input", &config.input_name),
            ("feature output", &config.feature_output),
            ("probability output", &config.probability_output),
        ] {
            if value.trim().is_empty() {
                return Err(OnnxExtractorError::MissingName(field));
            }
        }
        if config.input_size.validate().is_err() {
            return Err(OnnxExtractorError::ZeroInputSize);
        }

        config.model.verify()?;
        let weights = ClassWeights::load(&config.weights)?;

        let session = Session::builder()
            .map_err(OnnxExtractorError::CreateSessionBuilder)?
            .commit_from_file(&config.model.path)
            .map_err(OnnxExtractorError::CreateSession)?;

        tracing::info!(
            model = %config.model.path.display(),
            channels = weights.channels(),
            classes = weights.classes(),
            "loaded ONNX feature extractor"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            weights,
            input_name: config.input_name,
            feature_output: config.feature_output,
            probability_output: config.probability_output,
            input_size: config.input_size,
            apply_softmax: config.apply_softmax,
        })
    }

    #[must_use]
    pub fn input_size(&self) -> InputSize {
        self.input_size
    }

    #[must_use]
    pub fn weights(&self) -> &ClassWeights {
        &self.weights
    }

    /// Runs one forward pass. The caller checks the input shape.
    ///
    /// # Errors
    ///
    /// Returns tensor, inference, or output-shape errors.
    pub fn run(&self, image: &NormalizedImage) -> Result<Extraction, OnnxExtractorError> {
        let (height, width, channels) = image.shape();
        let view = image.as_array();
        let data: Cow<'_, [f32]> = match view.as_slice() {
            Some(slice) => Cow::Borrowed(slice),
            None => Cow::Owned(view.iter().copied().collect()),
        };
        let input = TensorRef::from_array_view(([1usize, height, width, channels], &*data))
            .map_err(OnnxExtractorError::EncodeTensor)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| OnnxExtractorError::SessionPoisoned)?;
        let outputs = session
            .run(ort::inputs! { self.input_name.as_str() => input })
            .map_err(OnnxExtractorError::Inference)?;

        let feature_value = outputs.get(&self.feature_output).ok_or_else(|| {
            OnnxExtractorError::OutputMissing {
                name: self.feature_output.clone(),
            }
        })?;
        let (shape, values) = feature_value
            .try_extract_tensor::<f32>()
            .map_err(OnnxExtractorError::Inference)?;
        let features = feature_map(&self.feature_output, shape, values, self.weights.channels())?;

        let score_value = outputs.get(&self.probability_output).ok_or_else(|| {
            OnnxExtractorError::OutputMissing {
                name: self.probability_output.clone(),
            }
        })?;
        let (shape, scores) = score_value
            .try_extract_tensor::<f32>()
            .map_err(OnnxExtractorError::Inference)?;
        let scores = class_scores(&self.probability_output, shape, scores, self.weights.classes())?;
        let probabilities = if self.apply_softmax {
            softmax(&scores)
        } else {
            if !is_distribution(&scores) {
                tracing::warn!(
                    output = %self.probability_output,
                    sum = scores.sum(),
                    "class scores do not form a probability distribution; enable softmax for logit outputs"
                );
            }
            scores
        };

        Ok(Extraction {
            features,
            probabilities,
        })
    }
}

/// Reshape an NHWC `[1, h, w, channels]` output into `(h, w, channels)`.
fn feature_map(
    name: &str,
    shape: &[i64],
    values: &[f32],
    channels: usize,
) -> Result<Array3<f32>, OnnxExtractorError> {
    let unexpected = || OnnxExtractorError::UnexpectedShape {
        name: name.to_owned(),
        expected: format!("[1, h, w, {channels}]"),
        actual: shape.to_vec(),
    };
    let dims: Vec<usize> = shape
        .iter()
        .map(|dim| usize::try_from(*dim))
        .collect::<Result<_, _>>()
        .map_err(|_| unexpected())?;
    let [1, h, w, c] = dims.as_slice() else {
        return Err(unexpected());
    };
    if *c != channels {
        return Err(unexpected());
    }
    Array3::from_shape_vec((*h, *w, *c), values.to_vec()).map_err(|_| unexpected())
}

/// Accept class scores shaped `[classes]` or `[1, classes]`.
fn class_scores(
    name: &str,
    shape: &[i64],
    values: &[f32],
    classes: usize,
) -> Result<Array1<f32>, OnnxExtractorError> {
    let expected = i64::try_from(classes).ok();
    let matches_classes = match shape {
        [k] | [1, k] => Some(*k) == expected,
        _ => false,
    };
    if !matches_classes || values.len() != classes {
        return Err(OnnxExtractorError::UnexpectedShape {
            name: name.to_owned(),
            expected: format!("[1, {classes}]"),
            actual: shape.to_vec(),
        });
    }
    Ok(Array1::from_vec(values.to_vec()))
}

const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

fn is_distribution(scores: &Array1<f32>) -> bool {
    scores.iter().all(|p| (0.0..=1.0).contains(p))
        && (scores.sum() - 1.0).abs() <= DISTRIBUTION_TOLERANCE
}

/// Numerically stable softmax.
pub(crate) fn softmax(scores: &Array1<f32>) -> Array1<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = scores.mapv(|score| (score - max).exp());
    let sum = exps.sum();
    if sum > 0.0 && sum.is_finite() {
        exps / sum
    } else {
        exps
    }
}

#[cfg(test)]
mod tests {
    use super::{OnnxExtractorError, class_scores, feature_map, is_distribution, softmax};
    use crate::tests::support::approx_eq;
    use ndarray::{Array1, array};
    use rstest::rstest;

    #[test]
    fn softmax_sums_to_one_and_preserves_order() {
        let probabilities = softmax(&array![1.0, 3.0, 2.0, -1.0]);
        assert!(approx_eq(probabilities.sum(), 1.0, 1e-6));
        assert!(probabilities[1] > probabilities[2]);
        assert!(probabilities[2] > probabilities[0]);
    }

    #[test]
    fn softmax_handles_large_logits() {
        let probabilities = softmax(&array![1000.0, 1000.0]);
        assert!(approx_eq(probabilities[0], 0.5, 1e-6));
    }

    #[test]
    fn feature_map_reshapes_nhwc_output() {
        let values: Vec<f32> = (0u8..24).map(f32::from).collect();
        #[expect(clippy::expect_used, reason = "test should fail loudly")]
        let features = feature_map("features", &[1, 2, 3, 4], &values, 4).expect("valid shape");
        assert_eq!(features.dim(), (2, 3, 4));
        assert!(approx_eq(features[[1, 2, 3]], 23.0, 1e-6));
        assert!(approx_eq(features[[0, 1, 0]], 4.0, 1e-6));
    }

    #[rstest]
    #[case::batch_of_two(vec![2, 2, 3, 4], 48)]
    #[case::negative_dimension(vec![1, -1, 3, 4], 24)]
    #[case::channel_mismatch(vec![1, 2, 3, 5], 30)]
    #[case::missing_batch(vec![2, 3, 4], 24)]
    #[case::short_values(vec![1, 2, 3, 4], 23)]
    fn feature_map_rejects_malformed_outputs(#[case] shape: Vec<i64>, #[case] len: usize) {
        let values = vec![0.0; len];
        let err = feature_map("features", &shape, &values, 4);
        assert!(matches!(
            err,
            Err(OnnxExtractorError::UnexpectedShape { ref name, ref actual, .. })
                if name == "features" && *actual == shape
        ));
    }

    #[rstest]
    #[case::flat(vec![4])]
    #[case::batched(vec![1, 4])]
    fn class_scores_accept_single_sample(#[case] shape: Vec<i64>) {
        #[expect(clippy::expect_used, reason = "test should fail loudly")]
        let scores = class_scores("scores", &shape, &[0.1, 0.2, 0.3, 0.4], 4).expect("valid shape");
        assert_eq!(scores, array![0.1, 0.2, 0.3, 0.4]);
    }

    #[rstest]
    #[case::batch_of_two(vec![2, 4], 8)]
    #[case::wrong_class_count(vec![1, 3], 3)]
    #[case::values_disagree_with_shape(vec![1, 4], 3)]
    #[case::rank_three(vec![1, 1, 4], 4)]
    fn class_scores_reject_malformed_outputs(#[case] shape: Vec<i64>, #[case] len: usize) {
        let values = vec![0.25; len];
        assert!(matches!(
            class_scores("scores", &shape, &values, 4),
            Err(OnnxExtractorError::UnexpectedShape { .. })
        ));
    }

    #[rstest]
    #[case(array![0.1, 0.2, 0.3, 0.4], true)]
    #[case(array![2.0, 1.0, -0.5, 0.0], false)]
    #[case(array![0.5, 0.5, 0.5, 0.5], false)]
    fn distribution_check_flags_raw_logits(#[case] scores: Array1<f32>, #[case] expected: bool) {
        assert_eq!(is_distribution(&scores), expected);
    }
}
