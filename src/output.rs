//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Upload
//!
//! ```text
//! Uploading to 2023
//!     beach.heic: uploading
//!     beach.heic: done
//! 2023 (2 items)
//!     001 image 2023/001-beach.jpg
//!     002 video 2023/002-toast.mp4
//! info: Uploaded 2 files to 2023.
//! ```
//!
//! ## List
//!
//! ```text
//! 2023 (2 items)
//!     001 image 2023/001-beach.jpg
//!     002 video 2023/002-toast.mp4
//! ```
//!
//! ## Generate
//!
//! ```text
//! Home → index.html
//! 2024 → gallery/2024/index.html (3 items)
//! 2023 → gallery/2023/index.html (2 items)
//!
//! Generated 2 year pages, copied 5 media files
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::gallery::SiteReport;
use crate::media::{MediaItem, PendingFile, YearBucket};
use crate::store::StoreEvent;
use crate::upload::{Notice, NoticeLevel};
use crate::validate::human_size;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

fn item_line(index: usize, item: &MediaItem) -> String {
    format!(
        "{}{} {} {}",
        indent(1),
        format_index(index),
        item.kind,
        item.url
    )
}

// ============================================================================
// Upload
// ============================================================================

pub fn format_notices(notices: &[Notice]) -> Vec<String> {
    notices
        .iter()
        .map(|notice| {
            let label = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Warning => "warning",
                NoticeLevel::Error => "error",
            };
            format!("{label}: {}", notice.message)
        })
        .collect()
}

pub fn print_notices(notices: &[Notice]) {
    for line in format_notices(notices) {
        println!("{}", line);
    }
}

/// What `upload --dry-run` would send.
pub fn format_selection(year: i32, selection: &[PendingFile]) -> Vec<String> {
    let mut lines = vec![format!(
        "Would upload {} to {year}",
        plural(selection.len(), "file", "files")
    )];
    for (i, file) in selection.iter().enumerate() {
        lines.push(format!(
            "{}{} {} ({})",
            indent(1),
            format_index(i + 1),
            file.name,
            human_size(file.size())
        ));
    }
    lines
}

pub fn print_selection(year: i32, selection: &[PendingFile]) {
    for line in format_selection(year, selection) {
        println!("{}", line);
    }
}

/// One progress line per store event.
pub fn format_store_event(event: &StoreEvent) -> Vec<String> {
    match event {
        StoreEvent::UploadStarted { name, .. } => {
            vec![format!("{}{name}: uploading", indent(1))]
        }
        StoreEvent::UploadFinished { name, ok, .. } => {
            let status = if *ok { "done" } else { "failed" };
            vec![format!("{}{name}: {status}", indent(1))]
        }
        StoreEvent::BucketChanged { .. } => Vec::new(),
    }
}

// ============================================================================
// List / years
// ============================================================================

pub fn format_year_listing(bucket: &YearBucket) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({})",
        bucket.year(),
        plural(bucket.len(), "item", "items")
    )];
    if bucket.is_empty() {
        lines.push(format!("{}(empty)", indent(1)));
    }
    for (i, item) in bucket.items().iter().enumerate() {
        lines.push(item_line(i + 1, item));
    }
    lines
}

pub fn print_year_listing(bucket: &YearBucket) {
    for line in format_year_listing(bucket) {
        println!("{}", line);
    }
}

pub fn format_years(years: &[i32]) -> Vec<String> {
    if years.is_empty() {
        return vec!["No media uploaded yet".to_string()];
    }
    years.iter().map(|y| y.to_string()).collect()
}

pub fn print_years(years: &[i32]) {
    for line in format_years(years) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate
// ============================================================================

pub fn format_site_report(report: &SiteReport) -> Vec<String> {
    let mut lines = vec!["Home → index.html".to_string()];
    for (year, count) in &report.years {
        lines.push(format!(
            "{year} → gallery/{year}/index.html ({})",
            plural(*count, "item", "items")
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "Generated {}, copied {}",
        plural(report.years.len(), "year page", "year pages"),
        plural(report.media_copied, "media file", "media files")
    ));
    lines
}

pub fn print_site_report(report: &SiteReport) {
    for line in format_site_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
