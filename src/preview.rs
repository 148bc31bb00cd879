//! Preview handles for files that are selected but not uploaded.
//!
//! A [`PreviewHandle`] is a revocable reference the gallery can render
//! before the upload happens. Handles are not `Clone`, and
//! [`PreviewIssuer::revoke`] takes the handle by value, so a handle cannot be
//! revoked twice. [`PreviewSet`] owns the handles of the current selection
//! and revokes all of them on replacement and on drop, so none can leak.

use crate::media::{FileClass, PendingFile};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A revocable preview of one pending file.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    id: u64,
    url: String,
    class: FileClass,
    name: String,
}

impl PreviewHandle {
    pub fn new(id: u64, url: impl Into<String>, file: &PendingFile) -> Self {
        Self {
            id,
            url: url.into(),
            class: file.class(),
            name: file.name.clone(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Decides between image, video and name-only rendering.
    pub fn class(&self) -> FileClass {
        self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Hands out and takes back preview handles.
pub trait PreviewIssuer {
    fn issue(&mut self, file: &PendingFile) -> Result<PreviewHandle, PreviewError>;
    fn revoke(&mut self, handle: PreviewHandle);
}

/// Issues `file://` previews backed by copies in a private temp directory.
///
/// Revoking deletes the copy; dropping the issuer deletes the directory.
pub struct DirectoryIssuer {
    dir: TempDir,
    next_id: u64,
}

impl DirectoryIssuer {
    pub fn new() -> Result<Self, PreviewError> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("yeargal-preview-").tempdir()?,
            next_id: 1,
        })
    }

    fn path_for(&self, id: u64, name: &str) -> PathBuf {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        self.dir.path().join(format!("{id}-{base}"))
    }

    /// Number of preview copies currently on disk.
    pub fn live_count(&self) -> usize {
        fs::read_dir(self.dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl PreviewIssuer for DirectoryIssuer {
    fn issue(&mut self, file: &PendingFile) -> Result<PreviewHandle, PreviewError> {
        let id = self.next_id;
        self.next_id += 1;
        let path = self.path_for(id, &file.name);
        fs::write(&path, &file.bytes)?;
        Ok(PreviewHandle::new(
            id,
            format!("file://{}", path.display()),
            file,
        ))
    }

    fn revoke(&mut self, handle: PreviewHandle) {
        let path = self.path_for(handle.id, &handle.name);
        if let Err(e) = fs::remove_file(&path) {
            warn!(id = handle.id, error = %e, "preview file already gone");
        }
    }
}

/// The previews of the current selection, one per file, in selection order.
pub struct PreviewSet<I: PreviewIssuer> {
    issuer: I,
    handles: Vec<PreviewHandle>,
}

impl<I: PreviewIssuer> PreviewSet<I> {
    pub fn new(issuer: I) -> Self {
        Self {
            issuer,
            handles: Vec::new(),
        }
    }

    /// Revoke every outstanding handle, then issue one per file.
    ///
    /// If issuing fails part-way, the handles issued so far are revoked too
    /// and the set is left empty.
    pub fn replace(&mut self, files: &[PendingFile]) -> Result<(), PreviewError> {
        self.clear();
        for file in files {
            match self.issuer.issue(file) {
                Ok(handle) => self.handles.push(handle),
                Err(e) => {
                    self.clear();
                    return Err(e);
                }
            }
        }
        debug!(count = self.handles.len(), "previews issued");
        Ok(())
    }

    /// Revoke every outstanding handle.
    pub fn clear(&mut self) {
        for handle in self.handles.drain(..) {
            self.issuer.revoke(handle);
        }
    }

    /// Revoke the first `n` handles, keeping the rest in order.
    pub fn revoke_front(&mut self, n: usize) {
        let n = n.min(self.handles.len());
        for handle in self.handles.drain(..n) {
            self.issuer.revoke(handle);
        }
    }

    pub fn handles(&self) -> &[PreviewHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn issuer(&self) -> &I {
        &self.issuer
    }
}

impl<I: PreviewIssuer> Drop for PreviewSet<I> {
    fn drop(&mut self) {
        self.clear();
    }
}
