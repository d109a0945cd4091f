mod common;

use std::sync::Arc;

use common::*;
use contactsheet::CorruptEntry;
use contactsheet::detection::crop::FaceCropper;
use contactsheet::pipeline::{DebugConfig, PipelineContext};

const E1: (u32, u32) = (64, 32);
const E2: (u32, u32) = (64, 48);
const E3: (u32, u32) = (64, 16);

fn extractor(ocr: FakeOcr, detector: FakeDetector) -> KeywordFaceExtractor {
    let mut config = ExtractorConfig::new("Mark");
    // keep the OCR copy at its original size so the fake can recognise it
    config.ocr_long_side = 64;
    KeywordFaceExtractor::new(config, Arc::new(ocr), Arc::new(detector))
}

fn three_entry_archive() -> ArchiveScanner<std::io::Cursor<Vec<u8>>> {
    let archive = zip_archive(&[
        ("a.png", png_bytes(&gradient_image(E1.0, E1.1))),
        ("b.png", png_bytes(&gradient_image(E2.0, E2.1))),
        ("c.png", png_bytes(&gradient_image(E3.0, E3.1))),
    ]);
    ArchiveScanner::new(archive).unwrap()
}

fn default_fakes() -> (FakeOcr, FakeDetector) {
    let ocr = FakeOcr::default()
        .with_text(E1, "Mayor Mark Smith opened the bridge")
        .with_text(E2, "Weather for the weekend")
        .with_text(E3, "Mark");
    let detector = FakeDetector::default().with_faces(
        E1,
        vec![BoundingBox::new(0, 0, 16, 16), BoundingBox::new(30, 4, 40, 30)],
    );
    (ocr, detector)
}

#[test]
fn entries_are_classified_by_keyword_and_faces() -> anyhow::Result<()> {
    let (ocr, detector) = default_fakes();
    let mut scanner = three_entry_archive();
    let report = extractor(ocr, detector).scan(&mut scanner);

    assert!(report.skipped.is_empty());
    let names: Vec<&str> = report.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a.png", "b.png", "c.png"]);

    assert!(matches!(&report.results[0].outcome, EntryOutcome::MatchedWithFaces(f) if f.len() == 2));
    assert!(matches!(report.results[1].outcome, EntryOutcome::NotMatched));
    assert!(matches!(report.results[2].outcome, EntryOutcome::MatchedNoFaces));

    let matched: Vec<&str> = report.matched().map(|r| r.name.as_str()).collect();
    assert_eq!(matched, vec!["a.png", "c.png"]);

    assert_eq!(report.results[0].ocr_text.as_deref(), Some("Mayor Mark Smith opened the bridge"));
    assert_eq!(report.results[1].ocr_text, None);
    assert_eq!(report.results[2].ocr_text.as_deref(), Some("Mark"));
    Ok(())
}

#[test]
fn matched_entries_become_sheets_or_notices() -> anyhow::Result<()> {
    let (ocr, detector) = default_fakes();
    let mut scanner = three_entry_archive();
    let report = extractor(ocr, detector).scan(&mut scanner);
    let layout = GridLayoutSpec::face_sheet(100);

    match report.results[0].present(&layout)? {
        Some(Presentation::Sheet(sheet)) => {
            assert_eq!((sheet.width(), sheet.height()), (500, 100));
        }
        _ => panic!("expected a sheet for a.png"),
    }
    assert!(report.results[1].present(&layout)?.is_none());
    match report.results[2].present(&layout)? {
        Some(Presentation::Notice(text)) => assert!(text.contains("c.png")),
        _ => panic!("expected a notice for c.png"),
    }
    Ok(())
}

#[test]
fn face_thumbnails_follow_clamped_boxes() -> anyhow::Result<()> {
    let (ocr, detector) = default_fakes();
    let mut scanner = three_entry_archive();
    let report = extractor(ocr, detector).scan(&mut scanner);

    let EntryOutcome::MatchedWithFaces(faces) = &report.results[0].outcome else {
        panic!("expected faces in a.png");
    };
    assert_eq!((faces[0].width(), faces[0].height()), (16, 16));
    // second box runs past the right edge: 30..70 clamps to 30..64
    assert_eq!((faces[1].width(), faces[1].height()), (34, 28));
    Ok(())
}

#[test]
fn corrupt_entries_do_not_stop_the_scan() -> anyhow::Result<()> {
    let (ocr, detector) = default_fakes();
    let archive = zip_archive(&[
        ("photos/", Vec::new()),
        ("broken.png", b"definitely not a png".to_vec()),
        ("photos/a.png", png_bytes(&gradient_image(E1.0, E1.1))),
    ]);
    let mut scanner = ArchiveScanner::new(archive)?;
    let report = extractor(ocr, detector).scan(&mut scanner);

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "broken.png");
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].name, "photos/a.png");
    assert_eq!(report.results[0].outcome.face_count(), 2);
    Ok(())
}

#[test]
fn archive_iteration_names_the_corrupt_entry() -> anyhow::Result<()> {
    let archive = zip_archive(&[
        ("broken.png", b"definitely not a png".to_vec()),
        ("a.png", png_bytes(&gradient_image(E1.0, E1.1))),
    ]);
    let mut scanner = ArchiveScanner::new(archive)?;
    let entries: Vec<_> = scanner.entries().collect();

    assert_eq!(entries.len(), 2);
    let corrupt: CorruptEntry = entries[0].as_ref().unwrap_err().clone();
    assert_eq!(corrupt.name, "broken.png");
    assert!(!corrupt.reason.is_empty());
    assert_eq!(entries[1].as_ref().unwrap().name, "a.png");

    match SheetError::from(corrupt) {
        SheetError::CorruptArchiveEntry { name, .. } => assert_eq!(name, "broken.png"),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn ocr_failure_only_skips_that_entry() -> anyhow::Result<()> {
    // no text registered for E2, so the fake OCR errors on b.png
    let ocr = FakeOcr::default().with_text(E1, "Mark").with_text(E3, "Mark");
    let mut scanner = three_entry_archive();
    let report = extractor(ocr, FakeDetector::default()).scan(&mut scanner);

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "b.png");
    assert_eq!(report.results.len(), 2);
    assert!(report.results.iter().all(|r| matches!(r.outcome, EntryOutcome::MatchedNoFaces)));
    Ok(())
}

#[test]
fn keyword_match_is_case_sensitive() -> anyhow::Result<()> {
    let ocr = FakeOcr::default()
        .with_text(E1, "a marked difference")
        .with_text(E2, "MARK")
        .with_text(E3, "nothing");
    let mut scanner = three_entry_archive();
    let report = extractor(ocr, FakeDetector::default()).scan(&mut scanner);

    assert_eq!(report.matched().count(), 0);
    Ok(())
}

#[test]
fn debug_mode_saves_each_stage() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let (ocr, detector) = default_fakes();
    let context = PipelineContext {
        debug: Some(DebugConfig { output_dir: dir.path().to_path_buf() }),
    };
    let mut scanner = three_entry_archive();
    extractor(ocr, detector).with_context(context).scan(&mut scanner);

    assert!(dir.path().join("a.png-text/02_keyword_filter/01.png").exists());
    assert!(dir.path().join("a.png-faces/01_face_detection/02.png").exists());
    assert!(!dir.path().join("b.png-faces").exists());
    Ok(())
}

#[test]
fn cropper_clamps_boxes_outside_the_source() {
    let img = gradient_image(40, 40);
    let faces = FaceCropper::default().extract(&img, &[BoundingBox::new(-5, 0, 50, 50)]);
    assert_eq!(faces.len(), 1);
    assert_eq!((faces[0].width(), faces[0].height()), (40, 40));
}
