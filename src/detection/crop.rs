use image::DynamicImage;
use image::imageops::FilterType;
use tracing::debug;

use crate::models::{BoundingBox, CropRegion};

/// Largest side of a face thumbnail.
pub const DEFAULT_THUMB_SIZE: u32 = 100;

/// Cut a region out of `image`. The region is assumed to be in bounds.
pub fn crop_region(image: &DynamicImage, region: CropRegion) -> DynamicImage {
    image.crop_imm(region.x, region.y, region.width, region.height)
}

/// Shrink to fit a `max_size` square, keeping the aspect ratio.
/// Images that already fit are returned as they are.
pub fn thumbnail(image: &DynamicImage, max_size: u32) -> DynamicImage {
    if image.width() <= max_size && image.height() <= max_size {
        return image.clone();
    }
    image.resize(max_size, max_size, FilterType::CatmullRom)
}

/// Crops detected faces and turns them into thumbnails.
#[derive(Debug, Clone, Copy)]
pub struct FaceCropper {
    pub max_size: u32,
}

impl Default for FaceCropper {
    fn default() -> Self {
        Self { max_size: DEFAULT_THUMB_SIZE }
    }
}

impl FaceCropper {
    pub fn new(max_size: u32) -> Self {
        Self { max_size }
    }

    /// One thumbnail per box, in box order.
    ///
    /// Boxes are clamped to the image; a box with no overlap at all is
    /// dropped.
    pub fn extract(&self, image: &DynamicImage, boxes: &[BoundingBox]) -> Vec<DynamicImage> {
        boxes
            .iter()
            .filter_map(|bbox| {
                let region = bbox.clamp_to(image.width(), image.height());
                if region.is_none() {
                    debug!(?bbox, "face box lies outside the image");
                }
                region
            })
            .map(|region| thumbnail(&crop_region(image, region), self.max_size))
            .collect()
    }
}
