//! Pipeline configuration types and their serialisation.

use serde::{Deserialize, Serialize};

/// Default model input width in pixels.
pub const DEFAULT_INPUT_WIDTH: u32 = 200;
/// Default model input height in pixels.
pub const DEFAULT_INPUT_HEIGHT: u32 = 200;

/// Spatial resolution the model expects at its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSize {
    /// Width in pixels; must be greater than zero.
    pub width: u32,
    /// Height in pixels; must be greater than zero.
    pub height: u32,
}

impl InputSize {
    /// Create an input size from a width and height.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Shape of the normalised tensor as `[height, width, channels]`.
    #[must_use]
    pub fn tensor_shape(self) -> [usize; 3] {
        [self.height as usize, self.width as usize, 3]
    }

    /// Ensure both dimensions are non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero.
    #[must_use = "Validation should not be ignored"]
    pub fn validate(self) -> Result<Self, String> {
        if self.width == 0 || self.height == 0 {
            Err(format!(
                "input size must be non-zero, got {}x{}",
                self.width, self.height
            ))
        } else {
            Ok(self)
        }
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_WIDTH, DEFAULT_INPUT_HEIGHT)
    }
}

/// Blend weights used when compositing the heat layer over an image.
///
/// Each output channel is `image_weight * image + heat_weight * heat`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OverlayConfig {
    /// Weight of the original image.
    pub image_weight: f32,
    /// Weight of the colourised relevance map.
    pub heat_weight: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            image_weight: 0.7,
            heat_weight: 0.3,
        }
    }
}

/// Tolerance when checking that the blend weights sum to one.
const WEIGHT_SUM_TOLERANCE: f32 = 1e-4;

impl OverlayConfig {
    /// Ensure both weights are finite, non-negative, and sum to one.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated constraint.
    #[must_use = "Validation should not be ignored"]
    pub fn validate(self) -> Result<Self, String> {
        let weights = [self.image_weight, self.heat_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("overlay weights must be finite and non-negative".into());
        }
        let sum = self.image_weight + self.heat_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(format!("overlay weights must sum to 1, got {sum}"));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn serialise_overlay() {
        let cfg = OverlayConfig {
            image_weight: 0.5,
            heat_weight: 0.5,
        };
        #[expect(clippy::expect_used, reason = "test should fail loudly")]
        let json = serde_json::to_string(&cfg).expect("serialise OverlayConfig to JSON");
        assert_eq!(json, r#"{"image_weight":0.5,"heat_weight":0.5}"#);
    }

    #[rstest]
    fn deserialise_overlay_defaults_missing_fields() {
        #[expect(clippy::expect_used, reason = "test should fail loudly")]
        let cfg: OverlayConfig =
            serde_json::from_str(r#"{"heat_weight":0.3}"#).expect("deserialise OverlayConfig");
        assert_eq!(cfg, OverlayConfig::default());
    }

    #[rstest]
    fn deserialise_input_size_rejects_unknown_fields() {
        let cfg: Result<InputSize, _> =
            serde_json::from_str(r#"{"width":200,"height":200,"depth":3}"#);
        assert!(cfg.is_err());
    }

    #[rstest]
    #[case(0, 200)]
    #[case(200, 0)]
    fn validate_input_size_rejects_zero(#[case] width: u32, #[case] height: u32) {
        assert!(InputSize::new(width, height).validate().is_err());
    }

    #[rstest]
    fn tensor_shape_is_height_major() {
        assert_eq!(InputSize::new(320, 240).tensor_shape(), [240, 320, 3]);
    }

    #[rstest]
    #[case(0.7, 0.3, true)]
    #[case(1.0, 0.0, true)]
    #[case(0.7, 0.7, false)]
    #[case(-0.2, 1.2, false)]
    #[case(f32::NAN, 0.3, false)]
    fn validate_overlay(#[case] image_weight: f32, #[case] heat_weight: f32, #[case] ok: bool) {
        let cfg = OverlayConfig {
            image_weight,
            heat_weight,
        };
        assert_eq!(cfg.validate().is_ok(), ok);
    }
}
