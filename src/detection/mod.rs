pub mod crop;
pub mod faces;
pub mod ocr;
pub mod steps;

use std::io::{Read, Seek};
use std::sync::Arc;

use image::DynamicImage;
use tracing::{info, warn};

use crate::archive::{ArchiveEntry, ArchiveScanner, CorruptEntry};
use crate::layout::{ContactSheet, GridLayoutSpec, SheetItem};
use crate::pipeline::{Pipeline, PipelineContext, PipelineData};
use crop::FaceCropper;
use faces::FaceDetector;
use ocr::{KeywordMatcher, TextExtractor};
use steps::*;

/// What happened to one archive entry.
#[derive(Clone)]
pub enum EntryOutcome {
    /// Keyword absent; the entry goes no further.
    NotMatched,
    /// Keyword present but the detector found nobody.
    MatchedNoFaces,
    /// Keyword present; one thumbnail per detected face.
    MatchedWithFaces(Vec<DynamicImage>),
}

impl EntryOutcome {
    pub fn is_match(&self) -> bool {
        !matches!(self, EntryOutcome::NotMatched)
    }

    pub fn face_count(&self) -> usize {
        match self {
            EntryOutcome::MatchedWithFaces(faces) => faces.len(),
            _ => 0,
        }
    }
}

impl std::fmt::Debug for EntryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryOutcome::NotMatched => f.write_str("NotMatched"),
            EntryOutcome::MatchedNoFaces => f.write_str("MatchedNoFaces"),
            EntryOutcome::MatchedWithFaces(faces) => {
                write!(f, "MatchedWithFaces({} faces)", faces.len())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntryResult {
    pub name: String,
    /// Recognised text of a matching entry; `None` when it did not match.
    pub ocr_text: Option<String>,
    pub outcome: EntryOutcome,
}

/// How a matched entry is shown to the user.
pub enum Presentation {
    /// Printed instead of a sheet when no faces were found.
    Notice(String),
    Sheet(DynamicImage),
}

impl EntryResult {
    /// `None` for entries that did not match.
    pub fn present(&self, layout: &GridLayoutSpec) -> Result<Option<Presentation>, crate::SheetError> {
        match &self.outcome {
            EntryOutcome::NotMatched => Ok(None),
            EntryOutcome::MatchedNoFaces => Ok(Some(Presentation::Notice(format!(
                "{}: the keyword is there, but no faces were found.",
                self.name
            )))),
            EntryOutcome::MatchedWithFaces(faces) => {
                let items: Vec<SheetItem<'_>> = faces.iter().map(SheetItem::new).collect();
                let sheet = ContactSheet::compose(&items, layout, None)?;
                Ok(Some(Presentation::Sheet(sheet.image)))
            }
        }
    }
}

/// Outcome of scanning one archive.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Every decodable entry, in archive order.
    pub results: Vec<EntryResult>,
    /// Entries that could not be decoded or processed, with the reason.
    pub skipped: Vec<(String, String)>,
}

impl ScanReport {
    /// Entries that reach presentation.
    pub fn matched(&self) -> impl Iterator<Item = &EntryResult> {
        self.results.iter().filter(|r| r.outcome.is_match())
    }
}

/// Settings for [`KeywordFaceExtractor`].
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub matcher: KeywordMatcher,
    pub ocr_long_side: u32,
    pub thumb_size: u32,
}

impl ExtractorConfig {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            matcher: KeywordMatcher::new(keyword),
            ocr_long_side: ocr::DEFAULT_OCR_LONG_SIDE,
            thumb_size: crop::DEFAULT_THUMB_SIZE,
        }
    }
}

/// Keyword search plus face extraction over archive entries.
///
/// Two pipelines run per entry: the text stage decides whether the entry
/// matches, the face stage turns a matching entry into thumbnails.
pub struct KeywordFaceExtractor {
    text_stage: Pipeline,
    face_stage: Pipeline,
}

impl KeywordFaceExtractor {
    pub fn new(
        config: ExtractorConfig,
        extractor: Arc<dyn TextExtractor>,
        detector: Arc<dyn FaceDetector>,
    ) -> Self {
        let text_stage = Pipeline::new()
            .add_step(Arc::new(OcrPreprocessStep { long_side: config.ocr_long_side }))
            .add_step(Arc::new(KeywordFilterStep { extractor, matcher: config.matcher }));

        let face_stage = Pipeline::new()
            .add_step(Arc::new(FaceDetectionStep {
                detector,
                cropper: FaceCropper::new(config.thumb_size),
            }));

        Self { text_stage, face_stage }
    }

    /// Save intermediate images of both stages under the context's debug root
    pub fn with_context(mut self, context: PipelineContext) -> Self {
        self.text_stage = self.text_stage.with_context(context.clone());
        self.face_stage = self.face_stage.with_context(context);
        self
    }

    /// Classify a single decoded entry.
    pub fn classify(&self, entry: ArchiveEntry) -> anyhow::Result<EntryResult> {
        let name = entry.name;
        let input = PipelineData::from_image(entry.image)
            .with_metadata(ENTRY_NAME, name.clone());

        let matched = self.text_stage.run(input, &format!("{}-text", name))?;
        let Some(item) = matched.into_iter().next() else {
            return Ok(EntryResult { name, ocr_text: None, outcome: EntryOutcome::NotMatched });
        };
        let ocr_text = item.get_string(OCR_TEXT).map(str::to_string);

        // The face stage works from the full-resolution original.
        let source = PipelineData {
            image: item.original.as_ref().clone(),
            ..item
        };
        let faces = self.face_stage.run(source, &format!("{}-faces", name))?;

        let outcome = if faces.is_empty() {
            EntryOutcome::MatchedNoFaces
        } else {
            EntryOutcome::MatchedWithFaces(faces.into_iter().map(|f| f.image).collect())
        };
        Ok(EntryResult { name, ocr_text, outcome })
    }

    /// Process every entry of an archive in order.
    ///
    /// Undecodable entries and per-entry failures are logged and recorded in
    /// [`ScanReport::skipped`]; the scan always continues.
    pub fn scan<R: Read + Seek>(&self, scanner: &mut ArchiveScanner<R>) -> ScanReport {
        info!(entries = scanner.len(), "scanning archive");
        let mut report = ScanReport::default();

        for entry in scanner.entries() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(CorruptEntry { name, reason }) => {
                    report.skipped.push((name, reason));
                    continue;
                }
            };

            let name = entry.name.clone();
            match self.classify(entry) {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    warn!(entry = %name, error = %e, "skipping entry");
                    report.skipped.push((name, e.to_string()));
                }
            }
        }

        info!(
            matched = report.matched().count(),
            skipped = report.skipped.len(),
            "all entries processed"
        );
        report
    }
}
