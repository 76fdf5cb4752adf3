//! Frame imagery: raw image bytes keyed by frame index.
//!
//! Images are never decoded here. The loader only reads a zip archive and
//! matches entry names of the form `<prefix><digits>.<png|jpg|jpeg>`; the
//! index may be zero-padded. Directory components are ignored.

use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::path::Path;

use regex::Regex;

use crate::error::ImageryError;
use crate::record::FrameId;

/// Default literal prefix of frame image names (`frame_000123.png`).
pub const DEFAULT_PREFIX: &str = "frame_";

/// Matches frame image file names for a given prefix.
#[derive(Debug, Clone)]
pub struct FrameNamePattern {
    regex: Regex,
}

impl FrameNamePattern {
    pub fn new(prefix: &str) -> Result<Self, ImageryError> {
        let pattern = format!(r"^{}(\d+)\.(?i:png|jpe?g)$", regex::escape(prefix));
        let regex = Regex::new(&pattern).map_err(|e| ImageryError::Prefix {
            prefix: prefix.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { regex })
    }

    /// Frame index encoded in `entry_name`, if it names a frame image.
    pub fn frame_of(&self, entry_name: &str) -> Option<FrameId> {
        let base = entry_name.rsplit('/').next().unwrap_or(entry_name);
        let caps = self.regex.captures(base)?;
        caps.get(1)?.as_str().parse::<i64>().ok().map(FrameId)
    }
}

/// Raw image bytes per frame.
#[derive(Debug, Clone, Default)]
pub struct FrameImages {
    images: BTreeMap<FrameId, Vec<u8>>,
}

impl FrameImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a mapping supplied by an external loader.
    pub fn from_entries(entries: impl IntoIterator<Item = (FrameId, Vec<u8>)>) -> Self {
        Self {
            images: entries.into_iter().collect(),
        }
    }

    /// Read every frame image from a zip archive on disk.
    pub fn from_zip_path(path: impl AsRef<Path>, pattern: &FrameNamePattern) -> Result<Self, ImageryError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ImageryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let images = Self::from_zip(file, pattern)?;
        tracing::info!(path = %path.display(), images = images.len(), "loaded frame images");
        Ok(images)
    }

    /// Read every frame image from a zip archive.
    ///
    /// Entries that do not match `pattern` are skipped. If two entries map to
    /// the same frame the later one wins.
    pub fn from_zip<R: Read + Seek>(reader: R, pattern: &FrameNamePattern) -> Result<Self, ImageryError> {
        let mut archive = zip::ZipArchive::new(reader).map_err(archive_error)?;
        let mut images = BTreeMap::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(archive_error)?;
            if entry.is_dir() {
                continue;
            }
            let Some(frame) = pattern.frame_of(entry.name()) else {
                tracing::debug!(entry = entry.name(), "skipping non-frame archive entry");
                continue;
            };
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| ImageryError::Archive {
                    message: format!("{}: {e}", entry.name()),
                })?;
            images.insert(frame, bytes);
        }

        Ok(Self { images })
    }

    pub fn get(&self, frame: FrameId) -> Option<&[u8]> {
        self.images.get(&frame).map(Vec::as_slice)
    }

    pub fn contains(&self, frame: FrameId) -> bool {
        self.images.contains_key(&frame)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn archive_error(err: zip::result::ZipError) -> ImageryError {
    ImageryError::Archive {
        message: err.to_string(),
    }
}
