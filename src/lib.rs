pub mod archive;
pub mod detection;
pub mod error;
pub mod layout;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod variants;

pub use error::SheetError;
pub use models::{BoundingBox, CropRegion, DetectionResult};
pub use archive::{ArchiveEntry, ArchiveScanner, CorruptEntry};
pub use detection::{
    EntryOutcome, EntryResult, ExtractorConfig, KeywordFaceExtractor, Presentation, ScanReport,
};
pub use layout::{CaptionStyle, ContactSheet, GridGeometry, GridLayoutSpec, SheetItem};
pub use pipeline::{Pipeline, PipelineData, PipelineStep, PipelineContext, DebugConfig};
pub use variants::{ChannelVariants, VariantDescriptor};
