use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::{DynamicImage, GrayImage};
use tracing::{info, instrument};

use crate::error::SheetError;
use crate::models::{BoundingBox, DetectionResult};

/// Pluggable face detection backend.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a grayscale image. No faces is an empty vector.
    fn detect(&self, gray: &GrayImage) -> Vec<BoundingBox>;
}

/// Run `detector` over `image` and tag the boxes with the entry name.
pub fn detect_faces(detector: &dyn FaceDetector, name: &str, image: &DynamicImage) -> DetectionResult {
    let gray = image.to_luma8();
    let boxes = detector.detect(&gray);
    DetectionResult {
        source_image_name: name.to_string(),
        boxes,
    }
}

pub const DEFAULT_MIN_FACE_SIZE: u32 = 20;

/// Cascade face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The model is read once and shared by every call to [`FaceDetector::detect`].
pub struct RustfaceDetector {
    model: rustface::Model,
    min_face_size: u32,
}

impl RustfaceDetector {
    pub fn new(model: rustface::Model) -> Self {
        Self {
            model,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
        }
    }

    /// Load a SeetaFace model file (e.g. `seeta_fd_frontal_v1.0.bin`).
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SheetError> {
        let path = path.as_ref();
        let model_error = |reason: String| SheetError::Model {
            path: path.display().to_string(),
            reason,
        };
        let file = File::open(path).map_err(|e| model_error(e.to_string()))?;
        let model = rustface::read_model(BufReader::new(file))
            .map_err(|e| model_error(e.to_string()))?;
        info!("face model loaded");
        Ok(Self::new(model))
    }

    /// Ignore faces smaller than `size` pixels on a side.
    pub fn with_min_face_size(mut self, size: u32) -> Self {
        self.min_face_size = size;
        self
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, gray: &GrayImage) -> Vec<BoundingBox> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.min_face_size);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let (width, height) = gray.dimensions();
        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                BoundingBox::new(bbox.x(), bbox.y(), bbox.width(), bbox.height())
            })
            .filter(|b| b.width > 0 && b.height > 0)
            .collect()
    }
}
