//! Persistence boundary for uploaded media.
//!
//! The [`MediaService`] trait is everything the [`store`](crate::store) knows
//! about where media lives. [`DirectoryService`] is the production
//! implementation: one directory per year under a library root.
//!
//! ## Layout
//!
//! ```text
//! library/
//! ├── 2023/
//! │   ├── index.json         # ordered entries, see IndexEntry
//! │   ├── 001-beach.jpg
//! │   └── 002-toast.mp4
//! └── 2024/
//!     └── ...
//! ```
//!
//! `index.json` is the source of truth for order and kind; files in a year
//! directory that the index does not mention are ignored.
//!
//! ## Atomicity
//!
//! A persist writes the media bytes and the new index to temp files inside
//! the year directory, then renames them into place. If the index rename
//! fails the media file is removed again, so a single upload is either fully
//! visible or not at all.

use crate::media::{MediaItem, MediaKind, PendingFile};
use crate::naming;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const INDEX_FILENAME: &str = "index.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt index {}: {source}", path.display())]
    CorruptIndex {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Index {} lists {file:?}, which is not a plain file name", path.display())]
    UnsafeEntry { path: PathBuf, file: String },
    #[error("Cannot store {0}: not an image or video")]
    UnsupportedType(String),
}

/// Where media is persisted and listed from.
pub trait MediaService {
    /// All items stored for `year`, in upload order.
    fn list_year(&mut self, year: i32) -> Result<Vec<MediaItem>, StorageError>;

    /// Store `file` under `year` and describe the stored item.
    fn persist(&mut self, file: &PendingFile, year: i32) -> Result<MediaItem, StorageError>;

    /// Years that hold at least one stored item.
    fn list_years(&mut self) -> Result<Vec<i32>, StorageError>;
}

/// One line of a year's `index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub file: String,
    pub kind: MediaKind,
    pub sha256: String,
}

/// Library stored as year directories under a root.
#[derive(Debug, Clone)]
pub struct DirectoryService {
    root: PathBuf,
}

impl DirectoryService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn year_dir(&self, year: i32) -> PathBuf {
        self.root.join(year.to_string())
    }

    fn read_index(&self, year: i32) -> Result<Vec<IndexEntry>, StorageError> {
        let path = self.year_dir(year).join(INDEX_FILENAME);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        let entries: Vec<IndexEntry> = match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(source) => return Err(StorageError::CorruptIndex { path, source }),
        };
        if let Some(bad) = entries.iter().find(|e| !is_plain_file_name(&e.file)) {
            return Err(StorageError::UnsafeEntry {
                path,
                file: bad.file.clone(),
            });
        }
        Ok(entries)
    }

    fn to_item(year: i32, entry: &IndexEntry) -> MediaItem {
        MediaItem {
            id: entry.id.clone(),
            year,
            kind: entry.kind,
            url: format!("{year}/{}", entry.file),
        }
    }
}

/// A single path component that stays inside its year directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Hex SHA-256 of a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Write `contents` to `dest` through a temp file in the same directory.
fn write_atomic(dir: &Path, dest: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

impl MediaService for DirectoryService {
    fn list_year(&mut self, year: i32) -> Result<Vec<MediaItem>, StorageError> {
        let entries = self.read_index(year)?;
        debug!(year, count = entries.len(), "listed year");
        Ok(entries.iter().map(|e| Self::to_item(year, e)).collect())
    }

    fn persist(&mut self, file: &PendingFile, year: i32) -> Result<MediaItem, StorageError> {
        let kind = file
            .class()
            .kind()
            .ok_or_else(|| StorageError::UnsupportedType(file.name.clone()))?;

        let dir = self.year_dir(year);
        fs::create_dir_all(&dir)?;

        let mut entries = self.read_index(year)?;
        let number = naming::next_number(entries.iter().map(|e| e.file.as_str()));
        let stored = naming::stored_name(number, &file.name);
        let sha256 = hash_bytes(&file.bytes);
        let entry = IndexEntry {
            id: format!("{year}/{number:03}-{}", &sha256[..8]),
            file: stored.clone(),
            kind,
            sha256,
        };

        let media_path = dir.join(&stored);
        write_atomic(&dir, &media_path, &file.bytes)?;

        entries.push(entry.clone());
        let index_result = serde_json::to_vec_pretty(&entries)
            .map_err(std::io::Error::other)
            .and_then(|json| write_atomic(&dir, &dir.join(INDEX_FILENAME), &json));
        if let Err(e) = index_result {
            // Roll back: no media file without an index entry.
            let _ = fs::remove_file(&media_path);
            return Err(e.into());
        }

        info!(year, file = %stored, size = file.size(), "stored media");
        Ok(Self::to_item(year, &entry))
    }

    fn list_years(&mut self) -> Result<Vec<i32>, StorageError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut years = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(year) = entry.file_name().to_str().and_then(|n| n.parse::<i32>().ok())
            else {
                continue;
            };
            if entry.path().join(INDEX_FILENAME).exists() {
                years.push(year);
            }
        }
        years.sort_unstable();
        Ok(years)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn jpeg(name: &str, bytes: &[u8]) -> PendingFile {
        PendingFile::new(name, "image/jpeg", bytes.to_vec())
    }

    #[test]
    fn empty_library_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut service = DirectoryService::new(tmp.path().join("missing"));
        assert!(service.list_year(2023).unwrap().is_empty());
        assert!(service.list_years().unwrap().is_empty());
    }

    #[test]
    fn persist_writes_file_and_index() {
        let tmp = TempDir::new().unwrap();
        let mut service = DirectoryService::new(tmp.path());

        let item = service.persist(&jpeg("Beach Day.JPG", b"abc"), 2023).unwrap();

        assert_eq!(item.year, 2023);
        assert_eq!(item.kind, MediaKind::Image);
        assert_eq!(item.url, "2023/001-Beach-Day.jpg");
        assert!(item.id.starts_with("2023/001-"));
        assert_eq!(
            fs::read(tmp.path().join("2023/001-Beach-Day.jpg")).unwrap(),
            b"abc"
        );
        assert!(tmp.path().join("2023/index.json").exists());
    }

    #[test]
    fn persist_numbers_in_upload_order() {
        let tmp = TempDir::new().unwrap();
        let mut service = DirectoryService::new(tmp.path());

        service.persist(&jpeg("b.jpg", b"1"), 2024).unwrap();
        service
            .persist(&PendingFile::new("a.mp4", "video/mp4", b"2".to_vec()), 2024)
            .unwrap();

        let items = service.list_year(2024).unwrap();
        let urls: Vec<&str> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["2024/001-b.jpg", "2024/002-a.mp4"]);
        assert_eq!(items[1].kind, MediaKind::Video);
    }

    #[test]
    fn persist_rejects_unknown_types() {
        let tmp = TempDir::new().unwrap();
        let mut service = DirectoryService::new(tmp.path());
        let file = PendingFile::new("notes.txt", "text/plain", b"x".to_vec());
        let result = service.persist(&file, 2023);
        assert!(matches!(result, Err(StorageError::UnsupportedType(_))));
        assert!(service.list_year(2023).unwrap().is_empty());
    }

    #[test]
    fn list_years_ignores_non_year_directories() {
        let tmp = TempDir::new().unwrap();
        let mut service = DirectoryService::new(tmp.path());
        service.persist(&jpeg("a.jpg", b"1"), 2024).unwrap();
        service.persist(&jpeg("b.jpg", b"2"), 2020).unwrap();
        fs::create_dir_all(tmp.path().join("drafts")).unwrap();
        fs::create_dir_all(tmp.path().join("2019")).unwrap();

        assert_eq!(service.list_years().unwrap(), vec![2020, 2024]);
    }

    #[test]
    fn corrupt_index_is_reported() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("2021")).unwrap();
        fs::write(tmp.path().join("2021/index.json"), "{ nope").unwrap();
        let mut service = DirectoryService::new(tmp.path());
        assert!(matches!(
            service.list_year(2021),
            Err(StorageError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn index_entries_must_stay_in_year_directory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("2021")).unwrap();
        let mut service = DirectoryService::new(tmp.path());

        for file in ["../../escape.jpg", "sub/dir.jpg", r"..\win.jpg", ".."] {
            let entries = vec![IndexEntry {
                id: "2021/001-deadbeef".to_string(),
                file: file.to_string(),
                kind: MediaKind::Image,
                sha256: hash_bytes(b""),
            }];
            fs::write(
                tmp.path().join("2021/index.json"),
                serde_json::to_string(&entries).unwrap(),
            )
            .unwrap();
            assert!(
                matches!(
                    service.list_year(2021),
                    Err(StorageError::UnsafeEntry { .. })
                ),
                "{file} should be refused"
            );
        }
    }

    #[test]
    fn hash_bytes_is_hex_sha256() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
