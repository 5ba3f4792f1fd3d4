#![allow(dead_code, reason = "not every test binary uses every helper")]

use image::{DynamicImage, ImageBuffer, Luma};

#[must_use]
pub fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() < tol
}

/// Uniform 8-bit grayscale scan.
#[must_use]
pub fn gray_scan(width: u32, height: u32, level: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(ImageBuffer::from_pixel(width, height, Luma([level])))
}
