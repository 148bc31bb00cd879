//! Shared test doubles for the yeargal test suite.
//!
//! - [`MockService`]: in-memory [`MediaService`] that records every call and
//!   can be told to fail on a given file name or year.
//! - [`MockDecoder`]: [`HeicDecoder`] that returns a blank image or an error.
//! - [`RecordingIssuer`]: [`PreviewIssuer`] that tracks issued and revoked
//!   handles and panics on a double revoke.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let service = MockService::new()
//!     .with_listing(2023, vec![item("a", 2023)])
//!     .failing_on("bad.jpg");
//! ```

use crate::media::{MediaItem, MediaKind, PendingFile};
use crate::preview::{PreviewError, PreviewHandle, PreviewIssuer};
use crate::storage::{MediaService, StorageError};
use crate::transcode::{DecodeError, HeicDecoder};
use image::DynamicImage;
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

/// A stored image item with a predictable URL.
pub fn item(id: &str, year: i32) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        year,
        kind: MediaKind::Image,
        url: format!("{year}/{id}.jpg"),
    }
}

// =========================================================================
// MockService
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    ListYear(i32),
    ListYears,
    Persist { name: String, mime: String, year: i32 },
}

#[derive(Default)]
pub struct MockService {
    listings: BTreeMap<i32, Vec<MediaItem>>,
    failing_names: HashSet<String>,
    failing_years: HashSet<i32>,
    calls: Mutex<Vec<ServiceCall>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, year: i32, items: Vec<MediaItem>) -> Self {
        self.listings.insert(year, items);
        self
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing_names.insert(name.to_string());
        self
    }

    pub fn set_listing(&mut self, year: i32, items: Vec<MediaItem>) {
        self.listings.insert(year, items);
    }

    pub fn fail_listing(&mut self, year: i32) {
        self.failing_years.insert(year);
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ServiceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MediaService for MockService {
    fn list_year(&mut self, year: i32) -> Result<Vec<MediaItem>, StorageError> {
        self.record(ServiceCall::ListYear(year));
        if self.failing_years.contains(&year) {
            return Err(StorageError::Io(std::io::Error::other(format!(
                "listing of {year} unavailable"
            ))));
        }
        Ok(self.listings.get(&year).cloned().unwrap_or_default())
    }

    fn persist(&mut self, file: &PendingFile, year: i32) -> Result<MediaItem, StorageError> {
        self.record(ServiceCall::Persist {
            name: file.name.clone(),
            mime: file.mime.clone(),
            year,
        });
        if self.failing_names.contains(&file.name) {
            return Err(StorageError::Io(std::io::Error::other(format!(
                "mock failure storing {}",
                file.name
            ))));
        }
        let kind = file
            .class()
            .kind()
            .ok_or_else(|| StorageError::UnsupportedType(file.name.clone()))?;
        let listing = self.listings.entry(year).or_default();
        let stored = MediaItem {
            id: format!("{year}/{:03}", listing.len() + 1),
            year,
            kind,
            url: format!("{year}/{}", file.name),
        };
        listing.push(stored.clone());
        Ok(stored)
    }

    fn list_years(&mut self) -> Result<Vec<i32>, StorageError> {
        self.record(ServiceCall::ListYears);
        Ok(self
            .listings
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(year, _)| *year)
            .collect())
    }
}

// =========================================================================
// MockDecoder
// =========================================================================

pub struct MockDecoder {
    result: Option<(u32, u32)>,
    calls: Cell<usize>,
}

impl MockDecoder {
    /// Decodes every input to a blank `width`×`height` image.
    pub fn succeeding(width: u32, height: u32) -> Self {
        Self {
            result: Some((width, height)),
            calls: Cell::new(0),
        }
    }

    /// Fails every decode.
    pub fn failing() -> Self {
        Self {
            result: None,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl HeicDecoder for MockDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        self.calls.set(self.calls.get() + 1);
        match self.result {
            Some((w, h)) => Ok(DynamicImage::new_rgb8(w, h)),
            None => Err(DecodeError::Failed {
                program: "mock".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "not a HEIF file".to_string(),
            }),
        }
    }
}

// =========================================================================
// RecordingIssuer
// =========================================================================

#[derive(Default)]
struct IssuerLog {
    next_id: u64,
    outstanding: BTreeSet<u64>,
    revoked: Vec<u64>,
    fail_after: Option<usize>,
}

/// Cloneable handle onto a shared issue/revoke log.
#[derive(Clone, Default)]
pub struct RecordingIssuer {
    log: Arc<Mutex<IssuerLog>>,
}

impl RecordingIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed `n` times, then fail every issue.
    pub fn failing_after(n: usize) -> Self {
        let issuer = Self::default();
        issuer.log.lock().unwrap().fail_after = Some(n);
        issuer
    }

    pub fn issued(&self) -> u64 {
        self.log.lock().unwrap().next_id
    }

    pub fn revoked(&self) -> Vec<u64> {
        self.log.lock().unwrap().revoked.clone()
    }

    pub fn outstanding(&self) -> usize {
        self.log.lock().unwrap().outstanding.len()
    }
}

impl PreviewIssuer for RecordingIssuer {
    fn issue(&mut self, file: &PendingFile) -> Result<PreviewHandle, PreviewError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_after.is_some_and(|n| log.next_id as usize >= n) {
            return Err(PreviewError::Io(std::io::Error::other("mock issue failure")));
        }
        log.next_id += 1;
        let id = log.next_id;
        log.outstanding.insert(id);
        Ok(PreviewHandle::new(id, format!("blob:mock/{id}"), file))
    }

    fn revoke(&mut self, handle: PreviewHandle) {
        let mut log = self.log.lock().unwrap();
        assert!(
            log.outstanding.remove(&handle.id()),
            "handle {} revoked twice or never issued",
            handle.id()
        );
        log.revoked.push(handle.id());
    }
}
