use image::DynamicImage;
use image::imageops::FilterType;
pub use ocrs::{OcrEngine, ImageSource};  // Re-export for use in other modules
use ocrs::OcrEngineParams;
use rten::Model;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::SheetError;

/// Long side of the copy handed to the OCR engine.
pub const DEFAULT_OCR_LONG_SIDE: u32 = 3600;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Capability to turn pixels into text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image: &DynamicImage) -> Result<String, SheetError>;
}

/// Default model cache: `$XDG_CACHE_HOME/ocrs`, else `~/.cache/ocrs`
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        return PathBuf::from(xdg).join("ocrs");
    }
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home_dir).join(".cache/ocrs")
}

/// Initialize OCR engine with the detection and recognition models in `model_dir`
pub fn init_ocr_engine(model_dir: &Path) -> anyhow::Result<OcrEngine> {
    let detection_model_path = model_dir.join(DETECTION_MODEL_FILENAME);
    let recognition_model_path = model_dir.join(RECOGNITION_MODEL_FILENAME);

    // Check if models exist
    if !detection_model_path.exists() || !recognition_model_path.exists() {
        anyhow::bail!(
            "OCR models not found. Please run: ocrs-cli --help (or download models manually)\n\
             Expected locations:\n  - {}\n  - {}",
            detection_model_path.display(),
            recognition_model_path.display()
        );
    }

    let detection_model = Model::load_file(&detection_model_path)?;
    let recognition_model = Model::load_file(&recognition_model_path)?;

    let engine = OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        ..Default::default()
    })?;

    info!(dir = %model_dir.display(), "OCR engine initialized");
    Ok(engine)
}

/// [`TextExtractor`] backed by the `ocrs` engine.
pub struct OcrsTextExtractor {
    engine: OcrEngine,
}

impl OcrsTextExtractor {
    pub fn new(engine: OcrEngine) -> Self {
        Self { engine }
    }

    pub fn from_model_dir(model_dir: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(init_ocr_engine(model_dir)?))
    }
}

impl TextExtractor for OcrsTextExtractor {
    fn extract_text(&self, image: &DynamicImage) -> Result<String, SheetError> {
        // The engine expects interleaved 8-bit RGB
        let img = image.to_rgb8();

        let img_source = ImageSource::from_bytes(img.as_raw(), img.dimensions())
            .map_err(|e| SheetError::Ocr(e.to_string()))?;
        let ocr_input = self.engine.prepare_input(img_source)
            .map_err(|e| SheetError::Ocr(e.to_string()))?;
        let text = self.engine.get_text(&ocr_input)
            .map_err(|e| SheetError::Ocr(e.to_string()))?;

        debug!(chars = text.len(), "OCR finished");
        Ok(text)
    }
}

/// Resize so the longer side equals `long_side`, keeping the aspect ratio.
///
/// Small scans are enlarged as well; the engine reads small print better
/// from a bigger copy.
pub fn reduce_resolution(img: &DynamicImage, long_side: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 || long_side == 0 {
        return img.clone();
    }

    let (new_w, new_h) = if width > height {
        let h = (long_side as f64 * height as f64 / width as f64).round() as u32;
        (long_side, h.max(1))
    } else {
        let w = (long_side as f64 * width as f64 / height as f64).round() as u32;
        (w.max(1), long_side)
    };

    if (new_w, new_h) == (width, height) {
        return img.clone();
    }
    img.resize_exact(new_w, new_h, FilterType::CatmullRom)
}

/// Prepare the copy of an image that is sent to OCR.
pub fn prepare_for_ocr(img: &DynamicImage, long_side: u32) -> DynamicImage {
    let resized = reduce_resolution(img, long_side);
    DynamicImage::ImageLuma8(resized.to_luma8())
}

/// Substring test applied to OCR output.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keyword: String,
    case_sensitive: bool,
}

impl KeywordMatcher {
    /// Case-sensitive matcher.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            case_sensitive: true,
        }
    }

    pub fn ignore_case(mut self, ignore: bool) -> Self {
        self.case_sensitive = !ignore;
        self
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn matches(&self, text: &str) -> bool {
        if self.case_sensitive {
            text.contains(&self.keyword)
        } else {
            text.to_lowercase().contains(&self.keyword.to_lowercase())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_is_case_sensitive_by_default() {
        let matcher = KeywordMatcher::new("Mark");
        assert!(matcher.matches("Mayor Mark Smith said"));
        assert!(!matcher.matches("a marked improvement"));
        assert!(KeywordMatcher::new("Mark").ignore_case(true).matches("MARKET"));
    }

    #[test]
    fn landscape_is_scaled_by_width() {
        let img = DynamicImage::new_rgb8(400, 100);
        let out = reduce_resolution(&img, 800);
        assert_eq!((out.width(), out.height()), (800, 200));
    }

    #[test]
    fn portrait_is_scaled_by_height() {
        let img = DynamicImage::new_rgb8(300, 900);
        let out = reduce_resolution(&img, 300);
        assert_eq!((out.width(), out.height()), (100, 300));
    }

    #[test]
    fn ocr_copy_is_grayscale() {
        let img = DynamicImage::new_rgb8(20, 10);
        let out = prepare_for_ocr(&img, 40);
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
        assert_eq!(out.width(), 40);
    }
}
