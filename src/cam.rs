//! Class activation maps.
//!
//! A relevance map is the per-location dot product of the feature map with
//! the predicted class's dense-layer weights, rectified and rescaled into
//! `[0, 1]`.

use image::{ImageBuffer, Luma, imageops};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayView3, Axis};
use thiserror::Error;

use crate::normalize::RESIZE_FILTER;

/// Guards the min-max rescale against a zero range.
pub const NORMALISATION_EPSILON: f32 = 1e-7;

/// Errors raised while building a relevance map.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CamError {
    #[error("feature map has {features} channels but the class weight vector has {weights}")]
    ChannelMismatch { features: usize, weights: usize },
}

/// Spatial relevance of each location to the predicted class, in `[0, 1]`.
///
/// Indexed as `(y, x)`, following `ndarray` row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceMap {
    values: Array2<f32>,
}

impl RelevanceMap {
    /// Wrap precomputed values, clamping them into `[0, 1]`. NaN becomes 0.
    #[must_use]
    pub fn from_values(values: Array2<f32>) -> Self {
        Self {
            values: values.mapv(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }),
        }
    }

    /// Shape as `(height, width)`.
    #[must_use]
    pub fn dimensions(&self) -> (usize, usize) {
        self.values.dim()
    }

    #[must_use]
    pub fn get(&self, y: usize, x: usize) -> Option<f32> {
        self.values.get((y, x)).copied()
    }

    #[must_use]
    pub fn as_array(&self) -> ArrayView2<'_, f32> {
        self.values.view()
    }

    /// Location `(y, x)` of the first maximum in row-major order.
    #[must_use]
    pub fn argmax(&self) -> Option<(usize, usize)> {
        self.values
            .indexed_iter()
            .fold(None, |best: Option<((usize, usize), f32)>, (index, v)| match best {
                Some((_, current)) if *v <= current => best,
                _ => Some((index, *v)),
            })
            .map(|(index, _)| index)
    }

    /// Resample to `width x height` with the triangle filter.
    ///
    /// Values stay within `[0, 1]`. A map already at the requested size is
    /// returned unchanged.
    #[must_use]
    pub fn upsample(&self, width: u32, height: u32) -> Self {
        let (rows, cols) = self.values.dim();
        if (cols, rows) == (width as usize, height as usize) {
            return self.clone();
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "feature maps are far smaller than u32::MAX"
        )]
        let source: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_fn(cols as u32, rows as u32, |x, y| {
                Luma([self.values[[y as usize, x as usize]]])
            });
        let resized = imageops::resize(&source, width, height, RESIZE_FILTER);
        let values = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "indices originate from u32 dimensions"
            )]
            let pixel = resized.get_pixel(x as u32, y as u32);
            pixel.0[0]
        });
        Self::from_values(values)
    }
}

/// Build the relevance map of `features` (`[h, w, channels]`) for one class.
///
/// Negative weighted sums are rectified to zero before the min-max rescale
/// `(v - min) / (max - min + NORMALISATION_EPSILON)`. A constant map
/// rescales to all zeros.
///
/// # Errors
///
/// Returns [`CamError::ChannelMismatch`] when the weight vector length
/// differs from the feature channel count.
///
/// # Examples
///
/// ```
/// use ndarray::{Array1, Array3};
/// use tumor_cam::cam::class_activation_map;
///
/// let features = Array3::<f32>::ones((4, 4, 8));
/// let weights = Array1::<f32>::zeros(8);
/// let map = class_activation_map(features.view(), weights.view()).expect("channels agree");
/// assert!(map.as_array().iter().all(|v| *v == 0.0));
/// ```
pub fn class_activation_map(
    features: ArrayView3<'_, f32>,
    weights: ArrayView1<'_, f32>,
) -> Result<RelevanceMap, CamError> {
    let channels = features.dim().2;
    if weights.len() != channels {
        return Err(CamError::ChannelMismatch {
            features: channels,
            weights: weights.len(),
        });
    }

    let rectified = features.map_axis(Axis(2), |lane| {
        let sum = lane.dot(&weights);
        if sum.is_finite() { sum.max(0.0) } else { 0.0 }
    });
    let (min, max) = rectified
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let range = max - min + NORMALISATION_EPSILON;
    let normalised = rectified.mapv(|v| (v - min) / range);

    tracing::debug!(min, max, "built class activation map");
    Ok(RelevanceMap::from_values(normalised))
}
