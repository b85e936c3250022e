//! Image preprocessing for the Fashion-MNIST classifier.
//!
//! Input images are squashed to a small square grayscale bitmap. Light pixels are treated as
//! background and zeroed, since the model was trained on light garments on a black background.
use image::{imageops::FilterType, DynamicImage, GrayImage, Luma, RgbaImage};
use ndarray::Array4;

/// Parameters of the image transformation and tensor normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct PreprocConfig {
    /// Side length of the square model input.
    pub size: u32,
    /// Gray level above which a pixel counts as background.
    pub background_threshold: f32,
    pub mean: f32,
    pub std: f32,
}

impl Default for PreprocConfig {
    fn default() -> Self {
        Self {
            size: 28,
            background_threshold: 200.0,
            mean: 0.5,
            std: 0.5,
        }
    }
}

/// Luma of an RGB triple with ITU-R BT.601 weights.
pub fn grayscale(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Resize to the model input size and convert to grayscale with the background removed.
pub fn transform_image(input: &DynamicImage, config: &PreprocConfig) -> GrayImage {
    let resized: RgbaImage = image::imageops::resize(
        &input.to_rgba8(),
        config.size,
        config.size,
        FilterType::Triangle,
    );

    GrayImage::from_fn(config.size, config.size, |x, y| {
        let [r, g, b, a] = resized[(x, y)].0;
        Luma([transform_pixel(r, g, b, a, config.background_threshold)])
    })
}

fn transform_pixel(r: u8, g: u8, b: u8, a: u8, background_threshold: f32) -> u8 {
    // Nothing was drawn here
    if a == 0 {
        return 0;
    }

    let gray = grayscale(r, g, b);
    if gray > background_threshold {
        0
    } else {
        gray.round().clamp(0.0, 255.0) as u8
    }
}

/// Map a gray level from `[0, 255]` to the model input range.
pub fn normalize(value: u8, config: &PreprocConfig) -> f32 {
    (value as f32 / 255.0 - config.mean) / config.std
}

/// Build the `[1, 1, size, size]` input array from a transformed bitmap.
pub fn to_input_array(bitmap: &GrayImage, config: &PreprocConfig) -> Array4<f32> {
    let (width, height) = bitmap.dimensions();
    Array4::from_shape_fn((1, 1, height as usize, width as usize), |(_, _, y, x)| {
        normalize(bitmap[(x as _, y as _)][0], config)
    })
}
