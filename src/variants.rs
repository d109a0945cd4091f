//! Channel variants: one full-color image per (band, intensity) pair, where
//! only that band has been brightness-scaled.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageReader, Luma, Rgb, RgbImage};
use tracing::{debug, info, instrument};

use crate::error::SheetError;

/// Factors used by the original contact sheet.
pub const DEFAULT_INTENSITIES: [f32; 3] = [0.1, 0.5, 0.9];

const BAND_COUNT: usize = 3;

/// Decode an image file from disk.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage, SheetError> {
    let img = ImageReader::open(path.as_ref())?
        .with_guessed_format()?
        .decode()?;
    info!(width = img.width(), height = img.height(), "image loaded");
    Ok(img)
}

/// One generated variant together with its caption.
#[derive(Debug, Clone)]
pub struct VariantDescriptor {
    pub band: usize,
    pub intensity: f32,
    pub image: DynamicImage,
    pub caption: String,
}

/// Caption shown under a variant, e.g. `channel 0 intensity 0.1`.
pub fn caption_for(band: usize, intensity: f32) -> String {
    // Debug keeps the decimal point on whole numbers ("1.0", not "1").
    format!("channel {} intensity {:?}", band, intensity)
}

/// Split an RGB image into its three bands.
pub fn split_bands(rgb: &RgbImage) -> [GrayImage; BAND_COUNT] {
    std::array::from_fn(|band| {
        GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            Luma([rgb.get_pixel(x, y)[band]])
        })
    })
}

/// Merge three bands back into an RGB image.
pub fn merge_bands(bands: [&GrayImage; BAND_COUNT]) -> RgbImage {
    let (width, height) = bands[0].dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            bands[0].get_pixel(x, y)[0],
            bands[1].get_pixel(x, y)[0],
            bands[2].get_pixel(x, y)[0],
        ])
    })
}

/// Linear brightness scaling of a single band, clamped to 0..=255.
///
/// Fractional results are truncated toward zero, so 255 at 0.5 becomes 127.
/// A factor of exactly 1.0 leaves every value untouched. Negative factors
/// behave like 0.0.
pub fn scale_band(band: &GrayImage, factor: f32) -> GrayImage {
    let mut scaled = band.clone();
    for pixel in scaled.pixels_mut() {
        pixel[0] = (pixel[0] as f32 * factor).clamp(0.0, 255.0) as u8;
    }
    scaled
}

/// Lazy, band-major sequence of [`VariantDescriptor`]s.
///
/// Yields `3 * factors.len()` items: every factor for band 0, then band 1,
/// then band 2. Each variant is only built when requested.
pub struct ChannelVariants {
    bands: [GrayImage; BAND_COUNT],
    factors: Vec<f32>,
    next: usize,
}

impl ChannelVariants {
    /// Prepare variants for a color image.
    ///
    /// Anything with color bands (RGB, RGBA, 16-bit, float) is converted to
    /// 8-bit RGB first; grayscale inputs are rejected.
    pub fn new(image: &DynamicImage, factors: &[f32]) -> Result<Self, SheetError> {
        let color = image.color();
        if !color.has_color() {
            return Err(SheetError::UnsupportedImageMode(color));
        }

        debug!(?color, factors = factors.len(), "splitting bands");
        let rgb = image.to_rgb8();

        Ok(Self {
            bands: split_bands(&rgb),
            factors: factors.to_vec(),
            next: 0,
        })
    }

    fn total(&self) -> usize {
        BAND_COUNT * self.factors.len()
    }

    fn build(&self, band: usize, factor: f32) -> VariantDescriptor {
        let scaled = scale_band(&self.bands[band], factor);
        let mut planes = [&self.bands[0], &self.bands[1], &self.bands[2]];
        planes[band] = &scaled;

        VariantDescriptor {
            band,
            intensity: factor,
            image: DynamicImage::ImageRgb8(merge_bands(planes)),
            caption: caption_for(band, factor),
        }
    }
}

impl Iterator for ChannelVariants {
    type Item = VariantDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total() {
            return None;
        }
        let band = self.next / self.factors.len();
        let factor = self.factors[self.next % self.factors.len()];
        self.next += 1;
        Some(self.build(band, factor))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChannelVariants {}
