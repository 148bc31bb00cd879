//! In-memory media store keyed by year.
//!
//! [`MediaStore`] is the single shared state of the library: the loaded
//! [`YearBucket`]s, and whether an upload is in flight. Views read buckets;
//! only [`fetch_media_by_year`](MediaStore::fetch_media_by_year) and
//! [`upload_file`](MediaStore::upload_file) change them.
//!
//! ## Change notification
//!
//! Views that want to re-render call [`MediaStore::subscribe`] and receive a
//! [`StoreEvent`] for every bucket change. Subscribers whose receiver has been
//! dropped are pruned on the next send.
//!
//! ## Failure semantics
//!
//! A failed fetch leaves the previous bucket for that year in place; a
//! failed upload leaves every bucket as it was. The uploading flag is cleared
//! on both paths.

use crate::media::{MediaItem, PendingFile, YearBucket, YearMismatch};
use crate::storage::{MediaService, StorageError};
use std::collections::BTreeMap;
use std::sync::mpsc::{Receiver, Sender, channel};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Inconsistent listing: {0}")]
    YearMismatch(#[from] YearMismatch),
}

/// Notifications sent to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    UploadStarted { name: String, year: i32 },
    UploadFinished { name: String, year: i32, ok: bool },
    BucketChanged { year: i32 },
}

pub struct MediaStore<S: MediaService> {
    service: S,
    buckets: BTreeMap<i32, YearBucket>,
    uploading: bool,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl<S: MediaService> MediaStore<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            buckets: BTreeMap::new(),
            uploading: false,
            subscribers: Vec::new(),
        }
    }

    /// Register for change notifications.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Load (or reload) the bucket for `year` from the service.
    ///
    /// The bucket is replaced wholesale, so two fetches in a row leave only
    /// the second listing behind.
    pub fn fetch_media_by_year(&mut self, year: i32) -> Result<&YearBucket, StoreError> {
        let items = self.service.list_year(year).inspect_err(|e| {
            warn!(year, error = %e, "fetch failed, keeping previous bucket");
        })?;
        let bucket = YearBucket::from_items(year, items)?;
        debug!(year, count = bucket.len(), "fetched year");
        self.buckets.insert(year, bucket);
        self.emit(StoreEvent::BucketChanged { year });
        Ok(&self.buckets[&year])
    }

    /// Persist `file` under `year` and append the stored item to its bucket.
    pub fn upload_file(&mut self, file: &PendingFile, year: i32) -> Result<MediaItem, StoreError> {
        self.uploading = true;
        self.emit(StoreEvent::UploadStarted {
            name: file.name.clone(),
            year,
        });

        let result = self.persist_into_bucket(file, year);

        self.uploading = false;
        self.emit(StoreEvent::UploadFinished {
            name: file.name.clone(),
            year,
            ok: result.is_ok(),
        });
        match &result {
            Ok(item) => {
                info!(year, id = %item.id, "uploaded {}", file.name);
                self.emit(StoreEvent::BucketChanged { year });
            }
            Err(e) => warn!(year, error = %e, "upload of {} failed", file.name),
        }
        result
    }

    fn persist_into_bucket(&mut self, file: &PendingFile, year: i32) -> Result<MediaItem, StoreError> {
        let item = self.service.persist(file, year)?;
        // Validate before touching the map so a bad item leaves no empty bucket behind.
        if item.year != year {
            return Err(YearMismatch {
                id: item.id,
                item_year: item.year,
                bucket_year: year,
            }
            .into());
        }
        self.buckets
            .entry(year)
            .or_insert_with(|| YearBucket::new(year))
            .push(item.clone())?;
        Ok(item)
    }

    pub fn bucket(&self, year: i32) -> Option<&YearBucket> {
        self.buckets.get(&year)
    }

    /// Years with a loaded bucket, ascending.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.buckets.keys().copied()
    }

    /// Years the service knows about plus any loaded bucket, newest first.
    pub fn known_years(&mut self) -> Result<Vec<i32>, StoreError> {
        let mut years = self.service.list_years()?;
        years.extend(self.buckets.keys().copied());
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        Ok(years)
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }
}
