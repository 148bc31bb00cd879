//! # yeargal
//!
//! A photo and video gallery organised by year. Files are picked, screened,
//! previewed and uploaded into a library directory with one folder per year;
//! the gallery views render that library as a static HTML site.
//!
//! # Architecture
//!
//! ```text
//!  selection ─▶ validate ─▶ transcode ─▶ preview ─▶ upload form
//!                                                      │ submit
//!                                                      ▼
//!                  gallery views ◀── store ◀──▶ storage (library/)
//! ```
//!
//! The [`store`] is the only shared state. The upload form writes through it
//! and the gallery views read from it; neither talks to [`storage`] directly.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`media`] | Shared types: `MediaItem`, `YearBucket`, `PendingFile`, file classification |
//! | [`storage`] | The `MediaService` seam and the year-directory library behind it |
//! | [`store`] | Year-keyed buckets, the uploading flag and change events |
//! | [`validate`] | Accepted types and the per-file size limit |
//! | [`transcode`] | HEIC/HEIF to JPEG conversion before preview and upload |
//! | [`preview`] | Revocable preview handles for the pending selection |
//! | [`upload`] | The upload form state machine and its notices |
//! | [`gallery`] | Overview and per-year pages rendered with Maud, plus site generation |
//! | [`config`] | `config.toml` loading, validation, merging, and theme CSS |
//! | [`naming`] | `NNN-name` stored file names |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Synchronous Core
//!
//! Uploads run one after another and stop at the first failure, so the form
//! never has two requests in flight. Nothing gains from an async runtime; the
//! store and the form are plain `&mut self` state machines that tests drive
//! step by step.
//!
//! ## Traits at the Edges
//!
//! Storage ([`storage::MediaService`]), HEIC decoding
//! ([`transcode::HeicDecoder`]) and preview handles
//! ([`preview::PreviewIssuer`]) sit behind traits. Production wires the
//! directory-backed implementations; the test suite swaps in recording mocks.
//!
//! ## Previews Cannot Leak
//!
//! A preview handle is not `Clone` and is revoked by value. The
//! [`preview::PreviewSet`] owning the handles revokes every one of them when
//! it is replaced or dropped.

pub mod config;
pub mod gallery;
pub mod media;
pub mod naming;
pub mod output;
pub mod preview;
pub mod storage;
pub mod store;
pub mod transcode;
pub mod upload;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
