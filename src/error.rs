use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("unsupported image mode {0:?}: expected a color image")]
    UnsupportedImageMode(image::ColorType),

    #[error("contact sheet needs at least one item")]
    EmptyInput,

    #[error("a sheet of {columns} x {rows} cells is too large for one image")]
    LayoutTooLarge { columns: u64, rows: u64 },

    #[error("archive entry {name} could not be decoded: {reason}")]
    CorruptArchiveEntry { name: String, reason: String },

    #[error("failed to read archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("failed to load model {path}: {reason}")]
    Model { path: String, reason: String },

    #[error("invalid font file: {0}")]
    Font(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
