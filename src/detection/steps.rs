use crate::pipeline::{PipelineData, PipelineStep, PipelineContext};
use crate::detection::{faces, ocr};
use crate::detection::crop::FaceCropper;
use crate::detection::faces::FaceDetector;
use crate::detection::ocr::{KeywordMatcher, TextExtractor};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub const ENTRY_NAME: &str = "entry_name";
pub const OCR_TEXT: &str = "ocr_text";

fn entry_name(item: &PipelineData) -> &str {
    item.get_string(ENTRY_NAME).unwrap_or("<unnamed>")
}

/// Resize and grayscale the working image for OCR
pub struct OcrPreprocessStep {
    pub long_side: u32,
}

impl PipelineStep for OcrPreprocessStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let prepared = ocr::prepare_for_ocr(&item.image, self.long_side);
                item.with_image(prepared)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "OCR Preprocess"
    }
}

/// Run OCR and keep only items whose text contains the keyword
pub struct KeywordFilterStep {
    pub extractor: Arc<dyn TextExtractor>,
    pub matcher: KeywordMatcher,
}

impl PipelineStep for KeywordFilterStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let text = self.extractor.extract_text(&item.image)?;
            let matched = self.matcher.matches(&text);

            if matched {
                info!(entry = entry_name(&item), keyword = self.matcher.keyword(), "contains the keyword");
                result.push(item.with_metadata(OCR_TEXT, text));
            } else {
                info!(entry = entry_name(&item), "not relevant");
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Keyword Filter"
    }
}

/// Detect faces in the original image - splits one image into one thumbnail per face
pub struct FaceDetectionStep {
    pub detector: Arc<dyn FaceDetector>,
    pub cropper: FaceCropper,
}

impl PipelineStep for FaceDetectionStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let detection = faces::detect_faces(self.detector.as_ref(), entry_name(&item), &item.original);
            info!(entry = %detection.source_image_name, faces = detection.boxes.len(), "recognised faces");
            let thumbs = self.cropper.extract(&item.original, &detection.boxes);
            result.extend(thumbs.into_iter().map(|thumb| item.derive(thumb)));
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Face Detection"
    }
}
