//! Gallery views: read-only HTML renderings of the store.
//!
//! ## Pages
//!
//! - **Overview** (`/index.html`): every year, newest first, with the first
//!   few items and a "See more" link
//! - **Year page** (`/gallery/{year}/index.html`): every item of one year
//!
//! A year page asks the store for its bucket when it mounts (or when its
//! route segment changes) and renders placeholder tiles while the bucket is
//! missing or empty. Images render as `<img>`, videos as `<video controls>`.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── gallery/
//! │   └── 2023/
//! │       └── index.html
//! └── media/
//!     └── 2023/
//!         ├── 001-beach.jpg
//!         └── 002-toast.mp4
//! ```
//!
//! HTML is produced with [maud](https://maud.lambda.xyz/); every interpolated
//! value is escaped.

use crate::config::{self, GalleryConfig};
use crate::media::{FileClass, MediaItem, MediaKind, YearBucket};
use crate::preview::PreviewHandle;
use crate::storage::MediaService;
use crate::store::{MediaStore, StoreError};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

const CSS_STATIC: &str = include_str!("../static/style.css");

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Year selected by a route segment such as `"2023"`.
///
/// Non-numeric, zero and negative segments select nothing.
pub fn parse_year(segment: &str) -> Option<i32> {
    segment
        .trim()
        .trim_matches('/')
        .parse::<i32>()
        .ok()
        .filter(|year| *year > 0)
}

/// The full stylesheet: theme variables followed by the static rules.
pub fn site_css(config: &GalleryConfig) -> String {
    format!("{}\n\n{}", config::generate_theme_css(&config.theme), CSS_STATIC)
}

// ============================================================================
// Year page
// ============================================================================

/// A mounted year page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearPage {
    year: i32,
    fetch_error: Option<String>,
}

impl YearPage {
    /// Mount on a route segment, requesting that year's bucket.
    ///
    /// Returns `None` when the segment does not name a year. A failed fetch
    /// still mounts; the page shows placeholders and the error.
    pub fn mount<S: MediaService>(store: &mut MediaStore<S>, segment: &str) -> Option<Self> {
        let year = parse_year(segment)?;
        let fetch_error = match store.fetch_media_by_year(year) {
            Ok(_) => None,
            Err(e) => {
                warn!(year, error = %e, "year page fetch failed");
                Some(e.to_string())
            }
        };
        Some(Self { year, fetch_error })
    }

    /// Follow a route change; refetches only when the year differs.
    pub fn navigate<S: MediaService>(self, store: &mut MediaStore<S>, segment: &str) -> Option<Self> {
        match parse_year(segment) {
            Some(year) if year == self.year && self.fetch_error.is_none() => Some(self),
            _ => Self::mount(store, segment),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    pub fn render<S: MediaService>(&self, store: &MediaStore<S>, config: &GalleryConfig) -> Markup {
        render_year_page(
            self.year,
            store.bucket(self.year),
            self.fetch_error.as_deref(),
            config,
            &site_css(config),
            "../../media/",
        )
    }
}

// ============================================================================
// HTML Components
// ============================================================================

fn base_document(title: &str, css: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body {
                (content)
            }
        }
    }
}

/// One stored item as a grid tile.
fn render_item(item: &MediaItem, media_prefix: &str) -> Markup {
    html! {
        div.tile {
            @match item.kind {
                MediaKind::Image => {
                    img src={ (media_prefix) (item.url) } alt={ (item.year) " photo" } loading="lazy";
                }
                MediaKind::Video => {
                    video src={ (media_prefix) (item.url) } controls preload="metadata" {}
                }
            }
        }
    }
}

fn render_placeholders(count: usize) -> Markup {
    html! {
        @for _ in 0..count {
            div.tile.placeholder aria-hidden="true" {}
        }
    }
}

fn render_markdown(text: &str) -> Markup {
    let mut out = String::new();
    md_html::push_html(&mut out, Parser::new(text));
    PreEscaped(out)
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders every item of one year, or placeholders while there are none.
pub fn render_year_page(
    year: i32,
    bucket: Option<&YearBucket>,
    fetch_error: Option<&str>,
    config: &GalleryConfig,
    css: &str,
    media_prefix: &str,
) -> Markup {
    let items = bucket.map(|b| b.items()).unwrap_or_default();
    let content = html! {
        main.year-page {
            nav { a href="../../" { "‹ " (config.gallery.title) } }
            h1 { "All Photos - " (year) }
            @if let Some(error) = fetch_error {
                p.notice { "Could not load " (year) ": " (error) }
            }
            div.media-grid {
                @if items.is_empty() {
                    (render_placeholders(config.gallery.placeholder_count))
                } @else {
                    @for item in items {
                        (render_item(item, media_prefix))
                    }
                }
            }
        }
    };
    base_document(&format!("{} - {year}", config.gallery.title), css, content)
}

/// Renders the landing page: every year, newest first, a few items each.
pub fn render_overview(
    buckets: &[&YearBucket],
    config: &GalleryConfig,
    css: &str,
    media_prefix: &str,
) -> Markup {
    let content = html! {
        main.overview-page {
            header.gallery-header {
                h1 { (config.gallery.title) }
                div.gallery-intro { (render_markdown(&config.gallery.intro)) }
            }
            @for bucket in buckets {
                section.year-section {
                    div.year-heading {
                        h2 { (bucket.year()) }
                        a href={ "gallery/" (bucket.year()) "/" } { "See more ›" }
                    }
                    div.media-grid {
                        @if bucket.is_empty() {
                            (render_placeholders(config.gallery.preview_count))
                        } @else {
                            @for item in bucket.items().iter().take(config.gallery.preview_count) {
                                (render_item(item, media_prefix))
                            }
                        }
                    }
                }
            }
        }
    };
    base_document(&config.gallery.title, css, content)
}

/// Renders the previews of a pending selection.
///
/// Images and videos get inline players; anything else shows its name.
pub fn render_previews(handles: &[PreviewHandle]) -> Markup {
    html! {
        div.media-grid.previews {
            @for (idx, handle) in handles.iter().enumerate() {
                @match handle.class() {
                    FileClass::Image => {
                        div.tile { img src=(handle.url()) alt={ "preview-" (idx) }; }
                    }
                    FileClass::Video => {
                        div.tile { video src=(handle.url()) controls {} }
                    }
                    FileClass::Unknown => {
                        div.tile.file-name { (handle.name()) }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Static site
// ============================================================================

/// What [`generate_site`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteReport {
    /// Years rendered, newest first, with their item counts.
    pub years: Vec<(i32, usize)>,
    pub media_copied: usize,
}

/// Fetch every known year and write the overview, year pages and media.
pub fn generate_site<S: MediaService>(
    store: &mut MediaStore<S>,
    library_root: &Path,
    output_dir: &Path,
    config: &GalleryConfig,
) -> Result<SiteReport, SiteError> {
    let css = site_css(config);
    let years = store.known_years()?;
    for &year in &years {
        store.fetch_media_by_year(year)?;
    }

    let buckets: Vec<&YearBucket> = years.iter().filter_map(|y| store.bucket(*y)).collect();
    let mut report = SiteReport::default();

    fs::create_dir_all(output_dir)?;
    let overview = render_overview(&buckets, config, &css, "media/");
    fs::write(output_dir.join("index.html"), overview.into_string())?;

    for bucket in &buckets {
        let page_dir = output_dir.join("gallery").join(bucket.year().to_string());
        fs::create_dir_all(&page_dir)?;
        let page = render_year_page(bucket.year(), Some(bucket), None, config, &css, "../../media/");
        fs::write(page_dir.join("index.html"), page.into_string())?;

        for item in bucket.items() {
            let dest = output_dir.join("media").join(&item.url);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(library_root.join(&item.url), &dest)?;
            report.media_copied += 1;
        }
        report.years.push((bucket.year(), bucket.len()));
    }

    info!(
        years = report.years.len(),
        media = report.media_copied,
        "site written to {}",
        output_dir.display()
    );
    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================
