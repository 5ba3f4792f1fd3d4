//! Image normalisation: coerce arbitrary decoded images into the model's
//! input layout of `height x width x 3` floats in `[0, 1]`.
//!
//! Every [`DynamicImage`] variant maps onto exactly one [`SampleRange`]:
//!
//! | Input depth | Observed max `m` | Scale |
//! |-------------|------------------|-------|
//! | 8-bit       | n/a              | `v / 255` |
//! | 16-bit      | `m <= 255`       | `v / 255` |
//! | 16-bit      | `m > 255`        | `v / m`   |
//! | float       | `m <= 1`         | `v`       |
//! | float       | `1 < m <= 255`   | `v / 255` |
//! | float       | `m > 255`        | `v / m`   |
//!
//! Negative and NaN samples become 0. Alpha is dropped and grayscale is
//! replicated across the three colour channels.

use image::{DynamicImage, Rgb, Rgb32FImage, RgbImage, imageops};
use ndarray::{Array3, ArrayView3};

use crate::config::InputSize;

/// Interpolation used when the input resolution differs from the target.
pub const RESIZE_FILTER: imageops::FilterType = imageops::FilterType::Triangle;

const BYTE_MAX: f32 = 255.0;
const U16_MAX: f32 = 65_535.0;

/// Storage depth of the decoded samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDepth {
    Eight,
    Sixteen,
    Float,
}

impl SampleDepth {
    /// Classify a decoded image by its sample storage.
    #[must_use]
    pub fn of(image: &DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)
            | DynamicImage::ImageRgb16(_)
            | DynamicImage::ImageRgba16(_) => Self::Sixteen,
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => Self::Float,
            // 8-bit variants and any layout the decoder adds later are
            // converted through the 8-bit path.
            _ => Self::Eight,
        }
    }
}

/// Scale that maps a decoded image's samples into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleRange {
    /// Samples are already unit floats.
    Unit,
    /// Samples span `[0, 255]`.
    Byte,
    /// Samples span `[0, m]` for the observed maximum `m`.
    Observed(f32),
}

impl SampleRange {
    /// Detect the sample range of `image`.
    ///
    /// # Examples
    ///
    /// ```
    /// use image::{DynamicImage, ImageBuffer, Luma};
    /// use tumor_cam::normalize::SampleRange;
    ///
    /// let deep = ImageBuffer::from_pixel(2, 2, Luma([4_095_u16]));
    /// let range = SampleRange::detect(&DynamicImage::ImageLuma16(deep));
    /// assert_eq!(range, SampleRange::Observed(4_095.0));
    /// ```
    #[must_use]
    pub fn detect(image: &DynamicImage) -> Self {
        match SampleDepth::of(image) {
            SampleDepth::Eight => Self::Byte,
            SampleDepth::Sixteen => {
                let max = image.to_rgb16().as_raw().iter().copied().max().unwrap_or(0);
                if max <= 255 {
                    Self::Byte
                } else {
                    Self::Observed(f32::from(max))
                }
            }
            SampleDepth::Float => {
                let max = image
                    .to_rgb32f()
                    .as_raw()
                    .iter()
                    .copied()
                    .filter(|value| value.is_finite())
                    .fold(0.0_f32, f32::max);
                if max <= 1.0 {
                    Self::Unit
                } else if max <= BYTE_MAX {
                    Self::Byte
                } else {
                    Self::Observed(max)
                }
            }
        }
    }

    fn divisor(self) -> f32 {
        match self {
            Self::Unit => 1.0,
            Self::Byte => BYTE_MAX,
            Self::Observed(max) => max,
        }
    }
}

/// Model-ready image tensor with layout `[height, width, 3]` and values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    values: Array3<f32>,
}

impl NormalizedImage {
    /// Wrap a unit-float RGB buffer.
    #[must_use]
    pub fn from_rgb32f(image: &Rgb32FImage) -> Self {
        let (width, height) = image.dimensions();
        let values = Array3::from_shape_fn(
            (height as usize, width as usize, 3),
            |(y, x, c)| {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "indices originate from u32 dimensions"
                )]
                let pixel = image.get_pixel(x as u32, y as u32);
                pixel.0.get(c).copied().unwrap_or(0.0)
            },
        );
        Self { values }
    }

    /// Wrap a raw tensor. Returns `None` unless the last axis has three channels.
    ///
    /// Values are clamped into `[0, 1]`; NaN becomes 0.
    #[must_use]
    pub fn from_array(values: Array3<f32>) -> Option<Self> {
        if values.dim().2 != 3 {
            return None;
        }
        let values = values
            .as_standard_layout()
            .mapv(sanitise);
        Some(Self { values })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.values.dim().1
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.values.dim().0
    }

    /// Tensor shape as `(height, width, channels)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        self.values.dim()
    }

    #[must_use]
    pub fn as_array(&self) -> ArrayView3<'_, f32> {
        self.values.view()
    }

    /// Convert back to 8-bit RGB by scaling with 255 and rounding.
    #[must_use]
    pub fn to_rgb8(&self) -> RgbImage {
        let (height, width, _) = self.values.dim();
        let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
            return RgbImage::new(0, 0);
        };
        RgbImage::from_fn(w, h, |x, y| {
            let (x, y) = (x as usize, y as usize);
            Rgb([
                quantise(self.values[[y, x, 0]]),
                quantise(self.values[[y, x, 1]]),
                quantise(self.values[[y, x, 2]]),
            ])
        })
    }
}

/// Normalise `image` to `size`, three channels, and unit float samples.
///
/// Images already at the target resolution are not resampled, so
/// normalising an already-normalised image leaves it unchanged.
#[must_use]
pub fn normalize(image: &DynamicImage, size: InputSize) -> NormalizedImage {
    let depth = SampleDepth::of(image);
    let range = SampleRange::detect(image);
    tracing::debug!(
        ?depth,
        ?range,
        width = image.width(),
        height = image.height(),
        "normalising image"
    );

    let mut rgb = image.to_rgb32f();
    // `to_rgb32f` already scales 8-bit to unit and 16-bit by 65535.
    let scale = match depth {
        SampleDepth::Eight => 1.0,
        SampleDepth::Sixteen => U16_MAX / range.divisor(),
        SampleDepth::Float => range.divisor().recip(),
    };
    for sample in rgb.iter_mut() {
        *sample = sanitise(*sample * scale);
    }

    if rgb.dimensions() != (size.width, size.height) {
        rgb = imageops::resize(&rgb, size.width, size.height, RESIZE_FILTER);
    }
    NormalizedImage::from_rgb32f(&rgb)
}

fn sanitise(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped into the u8 range before the cast"
)]
fn quantise(value: f32) -> u8 {
    (sanitise(value) * BYTE_MAX).round() as u8
}
