//! Downscaled preview of an uploaded image.
//!
use std::io::Cursor;

use anyhow::Result;
use image::{imageops::FilterType, DynamicImage, ImageOutputFormat};

/// Widest preview the index page shows.
pub const MAX_PREVIEW_WIDTH: u32 = 300;

/// Size of the preview, keeping the aspect ratio and capping the width at `max_width`.
pub fn preview_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }

    let scale = max_width as f64 / width as f64;
    let scaled_height = (height as f64 * scale).round().max(1.0) as u32;

    (max_width, scaled_height)
}

/// Render the preview as PNG.
pub fn render_preview(image: &DynamicImage, max_width: u32) -> Result<Vec<u8>> {
    let (width, height) = preview_size(image.width(), image.height(), max_width);
    let preview = match (width, height) == (image.width(), image.height()) {
        true => image.clone(),
        false => image.resize_exact(width, height, FilterType::Triangle),
    };

    let mut buf = Cursor::new(Vec::new());
    preview.write_to(&mut buf, ImageOutputFormat::Png)?;

    Ok(buf.into_inner())
}
