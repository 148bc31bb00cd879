//! Shared media types.
//!
//! [`MediaItem`] and [`YearBucket`] describe what the library already holds;
//! [`PendingFile`] is a user selection that has not been uploaded yet.
//! [`FileClass`] is the image/video/unknown classification every other module
//! keys off.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Extensions decoded as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "heic", "heif"];

/// Extensions treated as video.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

/// What a stored item is rendered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => f.write_str("image"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// Classification of a selected file before it becomes a [`MediaItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Image,
    Video,
    Unknown,
}

impl FileClass {
    /// Classify by declared MIME first, then by extension.
    pub fn detect(name: &str, mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("image/") {
            return FileClass::Image;
        }
        if mime.starts_with("video/") {
            return FileClass::Video;
        }
        match extension_of(name) {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => FileClass::Image,
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => FileClass::Video,
            _ => FileClass::Unknown,
        }
    }

    pub fn kind(self) -> Option<MediaKind> {
        match self {
            FileClass::Image => Some(MediaKind::Image),
            FileClass::Video => Some(MediaKind::Video),
            FileClass::Unknown => None,
        }
    }
}

/// Lowercased extension of a file name, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// MIME type guessed from a file name's extension.
pub fn guess_mime(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// A stored photo or video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub year: i32,
    pub kind: MediaKind,
    /// Location of the bytes, relative to the library root.
    pub url: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("item {id} belongs to {item_year}, not {bucket_year}")]
pub struct YearMismatch {
    pub id: String,
    pub item_year: i32,
    pub bucket_year: i32,
}

/// All items of one calendar year, in upload order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearBucket {
    year: i32,
    items: Vec<MediaItem>,
}

impl YearBucket {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            items: Vec::new(),
        }
    }

    /// Build a bucket from a fetched listing, rejecting items of other years.
    pub fn from_items(year: i32, items: Vec<MediaItem>) -> Result<Self, YearMismatch> {
        let mut bucket = Self::new(year);
        for item in items {
            bucket.push(item)?;
        }
        Ok(bucket)
    }

    pub fn push(&mut self, item: MediaItem) -> Result<(), YearMismatch> {
        if item.year != self.year {
            return Err(YearMismatch {
                id: item.id,
                item_year: item.year,
                bucket_year: self.year,
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A file picked by the user and not uploaded yet.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

// Keep multi-megabyte payloads out of debug output.
impl fmt::Debug for PendingFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl PendingFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = guess_mime(&name);
        Ok(Self::new(name, mime, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }

    pub fn class(&self) -> FileClass {
        FileClass::detect(&self.name, &self.mime)
    }
}
