//! Heat-map colouring and alpha blending over the source image.

use image::{Rgb, RgbImage};

use crate::{cam::RelevanceMap, config::OverlayConfig};

/// Map an 8-bit relevance level onto the blue-to-red "jet" palette.
///
/// # Examples
///
/// ```
/// use image::Rgb;
/// use tumor_cam::overlay::jet;
///
/// assert_eq!(jet(0), Rgb([0, 0, 128]));
/// assert_eq!(jet(255), Rgb([128, 0, 0]));
/// ```
#[must_use]
pub fn jet(level: u8) -> Rgb<u8> {
    // Each channel is the tent `1.5 - |4x - centre|` clamped to [0, 1],
    // evaluated in half-steps of 1/255 so rounding is exact.
    let channel = |centre: i32| {
        let doubled = (765 - 2 * (4 * i32::from(level) - 255 * centre).abs()).clamp(0, 510);
        u8::try_from((doubled + 1) / 2).unwrap_or(u8::MAX)
    };
    Rgb([channel(3), channel(2), channel(1)])
}

/// Colourise a relevance map with [`jet`].
#[must_use]
pub fn colorize(relevance: &RelevanceMap) -> RgbImage {
    let (height, width) = relevance.dimensions();
    #[expect(
        clippy::cast_possible_truncation,
        reason = "relevance maps are sized from u32 image dimensions"
    )]
    let (width, height) = (width as u32, height as u32);
    RgbImage::from_fn(width, height, |x, y| {
        jet(level(relevance.get(y as usize, x as usize).unwrap_or(0.0)))
    })
}

/// Blend the colourised `relevance` over `image`.
///
/// The map is upsampled first when its size differs from the image. Pixels
/// whose relevance is exactly zero are copied through unchanged; every other
/// channel becomes `image_weight * image + heat_weight * jet`, rounded and
/// saturated to 8 bits. The result always has the image's dimensions.
#[must_use]
pub fn compose_overlay(image: &RgbImage, relevance: &RelevanceMap, config: OverlayConfig) -> RgbImage {
    let (width, height) = image.dimensions();
    let relevance = if relevance.dimensions() == (height as usize, width as usize) {
        relevance.clone()
    } else {
        relevance.upsample(width, height)
    };

    let mut output = image.clone();
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let r = relevance.get(y as usize, x as usize).unwrap_or(0.0);
        if r == 0.0 {
            continue;
        }
        let heat = jet(level(r));
        for (channel, hot) in pixel.0.iter_mut().zip(heat.0) {
            let blended =
                config.image_weight * f32::from(*channel) + config.heat_weight * f32::from(hot);
            *channel = saturate(blended);
        }
    }
    output
}

/// Quantise a unit relevance into a palette index, truncating.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped into the u8 range before the cast"
)]
fn level(relevance: f32) -> u8 {
    (relevance.clamp(0.0, 1.0) * 255.0) as u8
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped into the u8 range before the cast"
)]
fn saturate(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
