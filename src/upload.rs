//! The upload form: pick a year, pick files, preview, submit.
//!
//! ## States
//!
//! ```text
//!            select_files           (screened + converted)
//!   Idle ───────────────▶ Selecting ───────────────▶ Previewing
//!    ▲                        │ nothing accepted          │ submit
//!    │                        ▼                           ▼
//!    │                  (prior state)                 Uploading
//!    │                                                    │
//!    └──────────── all files uploaded ◀───────────────────┤
//!                                      first failure ─────┘──▶ Previewing
//! ```
//!
//! Every failure is handled here and turned into a [`Notice`]; nothing from
//! the form is allowed to escape as an error or a panic.
//!
//! | Failure | Effect |
//! |---|---|
//! | wrong type / too large | notice, file dropped from the selection attempt |
//! | HEIC conversion | warning notice, original file kept |
//! | upload | notice, remaining files stay selected |
//! | no year or no file | notice, nothing sent to the store |

use crate::config::GalleryConfig;
use crate::media::{MediaItem, PendingFile};
use crate::preview::{PreviewIssuer, PreviewSet};
use crate::storage::MediaService;
use crate::store::{MediaStore, StoreError};
use crate::transcode::{HeicDecoder, Preprocessor, Quality};
use crate::validate::UploadRules;
use std::fmt;
use tracing::{info, warn};

pub const MISSING_INPUT_MESSAGE: &str = "Please select a year and a file to upload.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Selecting,
    Previewing,
    Uploading,
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FormState::Idle => "idle",
            FormState::Selecting => "selecting",
            FormState::Previewing => "previewing",
            FormState::Uploading => "uploading",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// An inline message produced by the last form action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// What a call to [`UploadForm::submit`] did.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Missing year or file, or not ready; the store was not called.
    Blocked,
    /// Every selected file was uploaded.
    Completed { uploaded: Vec<MediaItem> },
    /// Uploads stopped at `failed`; it and later files are still selected.
    Aborted {
        uploaded: Vec<MediaItem>,
        failed: String,
        error: StoreError,
    },
}

pub struct UploadForm<D: HeicDecoder, I: PreviewIssuer> {
    rules: UploadRules,
    years: Vec<i32>,
    preprocessor: Preprocessor<D>,
    previews: PreviewSet<I>,
    state: FormState,
    year: Option<i32>,
    selection: Vec<PendingFile>,
    notices: Vec<Notice>,
}

impl<D: HeicDecoder, I: PreviewIssuer> UploadForm<D, I> {
    pub fn new(config: &GalleryConfig, decoder: D, issuer: I) -> Self {
        Self::with_parts(
            UploadRules::from_config(&config.upload),
            config.upload.years.clone(),
            Preprocessor::new(decoder, Quality::new(config.transcode.quality)),
            issuer,
        )
    }

    pub fn with_parts(
        rules: UploadRules,
        years: Vec<i32>,
        preprocessor: Preprocessor<D>,
        issuer: I,
    ) -> Self {
        Self {
            rules,
            years,
            preprocessor,
            previews: PreviewSet::new(issuer),
            state: FormState::Idle,
            year: None,
            selection: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    /// Years the picker offers.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn selection(&self) -> &[PendingFile] {
        &self.selection
    }

    pub fn previews(&self) -> &PreviewSet<I> {
        &self.previews
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn can_submit(&self) -> bool {
        self.state == FormState::Previewing && self.year.is_some() && !self.selection.is_empty()
    }

    /// Pick the year uploads are tagged with.
    pub fn select_year(&mut self, year: i32) -> bool {
        self.notices.clear();
        if self.state == FormState::Uploading {
            self.notices.push(Notice::error("An upload is already in progress."));
            return false;
        }
        if !self.years.contains(&year) {
            self.notices.push(Notice::error(format!(
                "{year} is not one of the selectable years."
            )));
            return false;
        }
        self.year = Some(year);
        true
    }

    /// Replace the selection with `files`.
    ///
    /// Rejected files produce notices. When nothing survives screening the
    /// previous selection and state are kept as they were.
    pub fn select_files(&mut self, files: Vec<PendingFile>) -> FormState {
        self.notices.clear();
        if self.state == FormState::Uploading {
            self.notices.push(Notice::error("An upload is already in progress."));
            return self.state;
        }

        let prior = self.state;
        self.state = FormState::Selecting;

        let screened = self.rules.check(files);
        self.notices
            .extend(screened.rejections.iter().map(|r| Notice::error(r.to_string())));

        let batch = self.preprocessor.convert_batch(screened.accepted);
        self.notices
            .extend(batch.dropped.iter().map(|name| Notice::error(format!("{name} is empty"))));
        for warning in &batch.warnings {
            self.notices.push(Notice::warning(format!(
                "Could not convert {} to JPEG; it will be uploaded in its original format.",
                warning.file_name()
            )));
        }

        if batch.files.is_empty() {
            self.state = prior;
            return self.state;
        }

        if let Err(e) = self.previews.replace(&batch.files) {
            warn!(error = %e, "previews unavailable");
            self.notices
                .push(Notice::warning(format!("Previews are unavailable: {e}")));
        }
        self.selection = batch.files;
        self.state = FormState::Previewing;
        self.state
    }

    /// Upload the selection to `store`, one file at a time.
    pub fn submit<S: MediaService>(&mut self, store: &mut MediaStore<S>) -> SubmitOutcome {
        self.notices.clear();
        let year = match self.year {
            Some(year) if !self.selection.is_empty() => year,
            _ => {
                self.notices.push(Notice::error(MISSING_INPUT_MESSAGE));
                return SubmitOutcome::Blocked;
            }
        };
        if self.state != FormState::Previewing {
            self.notices
                .push(Notice::error(format!("Cannot upload while {}.", self.state)));
            return SubmitOutcome::Blocked;
        }

        self.state = FormState::Uploading;
        let mut uploaded = Vec::new();
        let mut failure = None;
        for file in &self.selection {
            match store.upload_file(file, year) {
                Ok(item) => uploaded.push(item),
                Err(e) => {
                    failure = Some((file.name.clone(), e));
                    break;
                }
            }
        }

        // Uploads run in order, so the finished ones are a prefix.
        let done = uploaded.len();
        self.selection.drain(..done);
        self.previews.revoke_front(done);

        match failure {
            None => {
                info!(year, count = done, "upload batch complete");
                self.notices.push(Notice::info(format!(
                    "Uploaded {done} {} to {year}.",
                    if done == 1 { "file" } else { "files" }
                )));
                self.reset();
                SubmitOutcome::Completed { uploaded }
            }
            Some((failed, error)) => {
                self.notices.push(Notice::error(format!(
                    "Upload of {failed} failed: {error}. {} file(s) remain selected.",
                    self.selection.len()
                )));
                self.state = FormState::Previewing;
                SubmitOutcome::Aborted {
                    uploaded,
                    failed,
                    error,
                }
            }
        }
    }

    /// Drop the selection, its previews and the chosen year.
    pub fn reset(&mut self) {
        self.previews.clear();
        self.selection.clear();
        self.year = None;
        self.state = FormState::Idle;
    }
}
