use std::path::Path;

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::{debug, info, instrument};

use crate::error::SheetError;

/// Produce the final output, optionally shrunk by an integer divisor.
///
/// `None`, `Some(0)` and `Some(1)` return the canvas unchanged. Otherwise both
/// sides are divided (rounding down, never below 1 px) and resampled with
/// Lanczos3.
pub fn render(canvas: &DynamicImage, downscale: Option<u32>) -> DynamicImage {
    match downscale {
        Some(divisor) if divisor > 1 => {
            let width = (canvas.width() / divisor).max(1);
            let height = (canvas.height() / divisor).max(1);
            debug!(
                from_w = canvas.width(),
                from_h = canvas.height(),
                width,
                height,
                "downscaling sheet"
            );
            canvas.resize_exact(width, height, FilterType::Lanczos3)
        }
        _ => canvas.clone(),
    }
}

/// Write an image as PNG, creating parent directories.
#[instrument(skip(image), fields(path = %path.as_ref().display()))]
pub fn save_png(image: &DynamicImage, path: impl AsRef<Path>) -> Result<(), SheetError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    image.save_with_format(path, image::ImageFormat::Png)?;
    info!(width = image.width(), height = image.height(), "sheet written");
    Ok(())
}
