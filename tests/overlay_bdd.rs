//! BDD tests for overlay compositing.

use image::{Rgb, RgbImage};
use ndarray::Array2;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use tumor_cam::{OverlayConfig, RelevanceMap, compose_overlay, overlay::jet};

#[derive(Default)]
struct OverlayContext {
    scan: RefCell<Option<RgbImage>>,
    config: RefCell<OverlayConfig>,
    result: RefCell<Option<RgbImage>>,
}

#[fixture]
fn overlay_context() -> OverlayContext {
    OverlayContext::default()
}

#[given("a uniform gray scan of level {level:u8}")]
fn given_scan(level: u8, #[from(overlay_context)] ctx: &OverlayContext) {
    ctx.scan
        .replace(Some(RgbImage::from_pixel(16, 12, Rgb([level, level, level]))));
}

#[given("the blend weights {image:f32} and {heat:f32}")]
fn given_weights(image: f32, heat: f32, #[from(overlay_context)] ctx: &OverlayContext) {
    ctx.config.replace(OverlayConfig {
        image_weight: image,
        heat_weight: heat,
    });
}

#[when("compositing a relevance of {value:f32}")]
fn when_compositing(value: f32, #[from(overlay_context)] ctx: &OverlayContext) {
    let binding = ctx.scan.borrow();
    let scan = binding
        .as_ref()
        .unwrap_or_else(|| panic!("scan to be set"));
    let map = RelevanceMap::from_values(Array2::from_elem((3, 4), value));
    ctx.result
        .replace(Some(compose_overlay(scan, &map, *ctx.config.borrow())));
}

fn with_result(ctx: &OverlayContext, check: impl Fn(&RgbImage)) {
    let binding = ctx.result.borrow();
    let result = binding
        .as_ref()
        .unwrap_or_else(|| panic!("result to be set"));
    assert_eq!(result.dimensions(), (16, 12));
    check(result);
}

#[then("every pixel keeps level {level:u8}")]
fn then_unchanged(level: u8, #[from(overlay_context)] ctx: &OverlayContext) {
    with_result(ctx, |image| {
        assert!(image.pixels().all(|p| *p == Rgb([level, level, level])));
    });
}

#[then("every pixel differs from level {level:u8}")]
fn then_changed(level: u8, #[from(overlay_context)] ctx: &OverlayContext) {
    with_result(ctx, |image| {
        assert!(image.pixels().all(|p| *p != Rgb([level, level, level])));
    });
}

#[then("every pixel is the hottest palette colour")]
fn then_palette(#[from(overlay_context)] ctx: &OverlayContext) {
    with_result(ctx, |image| {
        assert!(image.pixels().all(|p| *p == jet(255)));
    });
}

#[scenario(path = "tests/features/overlay.feature", index = 0)]
fn irrelevant_regions(overlay_context: OverlayContext) {
    let _ = overlay_context;
}

#[scenario(path = "tests/features/overlay.feature", index = 1)]
fn relevant_regions(overlay_context: OverlayContext) {
    let _ = overlay_context;
}

#[scenario(path = "tests/features/overlay.feature", index = 2)]
fn heat_layer_only(overlay_context: OverlayContext) {
    let _ = overlay_context;
}
