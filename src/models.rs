/// Detector output in source-image pixels, as `left, top, width, height`.
///
/// `left`/`top` are signed because detectors may report boxes that start
/// slightly outside the frame; see [`BoundingBox::clamp_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    pub fn lower(&self) -> i64 {
        self.top as i64 + self.height as i64
    }

    /// Intersect the box with a `width` x `height` image.
    ///
    /// Returns `None` when nothing of the box is left inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<CropRegion> {
        let left = (self.left as i64).clamp(0, width as i64);
        let top = (self.top as i64).clamp(0, height as i64);
        let right = self.right().clamp(0, width as i64);
        let lower = self.lower().clamp(0, height as i64);

        if right <= left || lower <= top {
            return None;
        }

        Some(CropRegion {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (lower - top) as u32,
        })
    }
}

/// Region inside an image, always within bounds and non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Faces found in one archive entry. An empty `boxes` means "no faces".
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub source_image_name: String,
    pub boxes: Vec<BoundingBox>,
}
