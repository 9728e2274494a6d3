// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the detector and classifier models

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;

/// Square input size of the YOLO detection model
pub const DETECTION_INPUT_SIZE: u32 = 640;

/// Square input size of the classification model
pub const CLASSIFICATION_INPUT_SIZE: u32 = 224;

/// Preprocess an image for object detection
///
/// Steps:
/// 1. Resize (without preserving aspect ratio) to `input_size` x `input_size`
/// 2. Scale pixel values to [0, 1]
/// 3. Convert to NCHW tensor format [1, 3, H, W]
///
/// Returns the tensor plus the (x, y) factors that map model coordinates back
/// onto the original image.
pub fn preprocess_for_detection(image: &DynamicImage, input_size: u32) -> (Array4<f32>, (f32, f32)) {
    let (orig_w, orig_h) = image.dimensions();
    let resized = image.resize_exact(input_size, input_size, FilterType::Triangle);

    let scale = (
        orig_w as f32 / input_size as f32,
        orig_h as f32 / input_size as f32,
    );

    (to_nchw(&resized), scale)
}

/// Preprocess an image for classification
///
/// Resizes the shorter side to `input_size`, center-crops a square and scales
/// pixel values to [0, 1] in NCHW layout.
pub fn preprocess_for_classification(image: &DynamicImage, input_size: u32) -> Array4<f32> {
    let (orig_w, orig_h) = image.dimensions();
    let short_side = orig_w.min(orig_h).max(1);
    let scale = input_size as f32 / short_side as f32;

    let new_w = ((orig_w as f32 * scale).round() as u32).max(input_size);
    let new_h = ((orig_h as f32 * scale).round() as u32).max(input_size);
    let resized = image.resize_exact(new_w, new_h, FilterType::Triangle);

    let left = (new_w - input_size) / 2;
    let top = (new_h - input_size) / 2;
    let cropped = resized.crop_imm(left, top, input_size, input_size);

    to_nchw(&cropped)
}

fn to_nchw(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let (w, h) = rgb.dimensions();
    let mut tensor = Array4::zeros((1, 3, h as usize, w as usize));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    tensor
}
