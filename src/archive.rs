use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use image::DynamicImage;
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use crate::error::SheetError;

/// A decoded image taken from an archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub image: DynamicImage,
}

/// An archive entry that could not be read or decoded as an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptEntry {
    pub name: String,
    pub reason: String,
}

impl From<CorruptEntry> for SheetError {
    fn from(entry: CorruptEntry) -> Self {
        SheetError::CorruptArchiveEntry {
            name: entry.name,
            reason: entry.reason,
        }
    }
}

/// Walks the entries of a ZIP archive, decoding each one as an image.
pub struct ArchiveScanner<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl ArchiveScanner<BufReader<File>> {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SheetError> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ArchiveScanner<R> {
    pub fn new(reader: R) -> Result<Self, SheetError> {
        let archive = ZipArchive::new(reader)?;
        info!(entries = archive.len(), "archive opened");
        Ok(Self { archive })
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Iterate entries in archive order.
    ///
    /// Each item is either a decoded image or a [`CorruptEntry`] describing
    /// that entry alone; iteration carries on after a bad entry.
    /// Directory entries are skipped.
    pub fn entries(&mut self) -> Entries<'_, R> {
        Entries {
            archive: &mut self.archive,
            index: 0,
        }
    }
}

pub struct Entries<'a, R: Read + Seek> {
    archive: &'a mut ZipArchive<R>,
    index: usize,
}

impl<R: Read + Seek> Entries<'_, R> {
    fn read_entry(&mut self, index: usize) -> Option<Result<ArchiveEntry, CorruptEntry>> {
        // The entry handle lives only inside this function, so it is closed
        // before the next entry is opened.
        let mut file = match self.archive.by_index(index) {
            Ok(file) => file,
            Err(e) => {
                return Some(Err(CorruptEntry {
                    name: format!("#{}", index),
                    reason: e.to_string(),
                }));
            }
        };

        if file.is_dir() {
            debug!(name = file.name(), "skipping directory entry");
            return None;
        }

        let name = file.name().to_string();
        let mut bytes = Vec::with_capacity(file.size() as usize);
        if let Err(e) = file.read_to_end(&mut bytes) {
            return Some(Err(CorruptEntry {
                name,
                reason: e.to_string(),
            }));
        }
        drop(file);

        let result = image::load_from_memory(&bytes)
            .map(|image| ArchiveEntry { name: name.clone(), image })
            .map_err(|e| CorruptEntry {
                name,
                reason: e.to_string(),
            });
        Some(result)
    }
}

impl<R: Read + Seek> Iterator for Entries<'_, R> {
    type Item = Result<ArchiveEntry, CorruptEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.archive.len() {
            let index = self.index;
            self.index += 1;
            if let Some(result) = self.read_entry(index) {
                if let Err(e) = &result {
                    warn!(entry = %e.name, reason = %e.reason, "skipping unreadable archive entry");
                }
                return Some(result);
            }
        }
        None
    }
}
