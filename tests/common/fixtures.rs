use std::collections::HashMap;
use std::io::{Cursor, Write};

use contactsheet::detection::faces::FaceDetector;
use contactsheet::detection::ocr::TextExtractor;
use contactsheet::{BoundingBox, SheetError};
use image::{DynamicImage, GrayImage, ImageBuffer, Rgb};
use zip::write::SimpleFileOptions;

/// Creates an RGB gradient so every band carries different values.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    DynamicImage::ImageRgb8(img)
}

/// Creates a single-color RGB image.
pub fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb(color)))
}

/// Encodes an image as PNG bytes.
pub fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("Failed to encode test image");
    out.into_inner()
}

/// Builds an in-memory ZIP archive from `(name, bytes)` pairs.
/// Names ending in `/` become directory entries.
pub fn zip_archive(entries: &[(&str, Vec<u8>)]) -> Cursor<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, bytes) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).expect("Failed to add directory");
        } else {
            writer.start_file(*name, options).expect("Failed to start zip entry");
            writer.write_all(bytes).expect("Failed to write zip entry");
        }
    }
    let cursor = writer.finish().expect("Failed to finish zip archive");
    Cursor::new(cursor.into_inner())
}

/// OCR stand-in that answers by image size. Unknown sizes fail.
#[derive(Default)]
pub struct FakeOcr {
    texts: HashMap<(u32, u32), String>,
}

impl FakeOcr {
    pub fn with_text(mut self, size: (u32, u32), text: &str) -> Self {
        self.texts.insert(size, text.to_string());
        self
    }
}

impl TextExtractor for FakeOcr {
    fn extract_text(&self, image: &DynamicImage) -> Result<String, SheetError> {
        self.texts
            .get(&(image.width(), image.height()))
            .cloned()
            .ok_or_else(|| SheetError::Ocr(format!("no text for {}x{}", image.width(), image.height())))
    }
}

/// Detector stand-in that answers by image size. Unknown sizes have no faces.
#[derive(Default)]
pub struct FakeDetector {
    faces: HashMap<(u32, u32), Vec<BoundingBox>>,
}

impl FakeDetector {
    pub fn with_faces(mut self, size: (u32, u32), boxes: Vec<BoundingBox>) -> Self {
        self.faces.insert(size, boxes);
        self
    }
}

impl FaceDetector for FakeDetector {
    fn detect(&self, gray: &GrayImage) -> Vec<BoundingBox> {
        self.faces.get(&gray.dimensions()).cloned().unwrap_or_default()
    }
}
