mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from contactsheet for tests
pub use contactsheet::{
    ArchiveScanner, BoundingBox, ChannelVariants, ContactSheet, EntryOutcome, ExtractorConfig,
    GridLayoutSpec, KeywordFaceExtractor, Presentation, SheetError, SheetItem,
};
