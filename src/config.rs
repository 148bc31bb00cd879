//! Library configuration.
//!
//! Loaded from an optional `config.toml` in the library root. User values are
//! merged over stock defaults, unknown keys are rejected, and the merged
//! result is validated before anything else runs.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [gallery]
//! title = "Gallery"
//! intro = "A collection of memorable moments from our annual reunions."
//! preview_count = 4          # Items per year on the overview page
//! placeholder_count = 8      # Skeleton tiles while a year has no items
//!
//! [upload]
//! years = [2024, 2023, 2021, 2020]
//! accepted_types = ["JPG", "JPEG", "PNG", "GIF", "MP4", "MOV", "HEIC", "HEIF"]
//! max_file_size_mb = 50
//!
//! [transcode]
//! quality = 70               # JPEG quality for converted HEIC files (1-100)
//! decoder = "heif-convert"   # External HEIC → PNG converter
//!
//! [theme]
//! columns = 4
//! gap = "1.5rem"
//! background = "#ffffff"
//! text = "#111111"
//! muted = "#6b7280"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want:
//!
//! ```toml
//! [upload]
//! years = [2025, 2024]
//! ```

use crate::media::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Largest accepted `upload.max_file_size_mb`: 1 TiB.
pub const MAX_FILE_SIZE_MB: u64 = 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Library configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Gallery page text and layout counts.
    pub gallery: GallerySection,
    /// What the upload form accepts.
    pub upload: UploadConfig,
    /// HEIC conversion settings.
    pub transcode: TranscodeConfig,
    /// Colors and grid layout of the generated pages.
    pub theme: ThemeConfig,
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.transcode.quality) {
            return Err(ConfigError::Validation(
                "transcode.quality must be 1-100".into(),
            ));
        }
        if self.transcode.decoder.trim().is_empty() {
            return Err(ConfigError::Validation(
                "transcode.decoder must not be empty".into(),
            ));
        }
        if self.upload.years.is_empty() {
            return Err(ConfigError::Validation(
                "upload.years must not be empty".into(),
            ));
        }
        if self.upload.max_file_size_mb == 0 {
            return Err(ConfigError::Validation(
                "upload.max_file_size_mb must be positive".into(),
            ));
        }
        if self.upload.max_file_size_mb > MAX_FILE_SIZE_MB {
            return Err(ConfigError::Validation(format!(
                "upload.max_file_size_mb must be at most {MAX_FILE_SIZE_MB} (1 TiB)"
            )));
        }
        if self.upload.accepted_types.is_empty() {
            return Err(ConfigError::Validation(
                "upload.accepted_types must not be empty".into(),
            ));
        }
        for ty in &self.upload.accepted_types {
            let ext = ty.to_ascii_lowercase();
            if !IMAGE_EXTENSIONS.contains(&ext.as_str()) && !VIDEO_EXTENSIONS.contains(&ext.as_str())
            {
                return Err(ConfigError::Validation(format!(
                    "upload.accepted_types: unsupported type {ty:?}"
                )));
            }
        }
        if self.gallery.preview_count == 0 {
            return Err(ConfigError::Validation(
                "gallery.preview_count must be positive".into(),
            ));
        }
        if self.theme.columns == 0 {
            return Err(ConfigError::Validation(
                "theme.columns must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Gallery page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GallerySection {
    /// Heading of the overview page.
    pub title: String,
    /// Markdown shown under the heading.
    pub intro: String,
    /// Items shown per year on the overview page.
    pub preview_count: usize,
    /// Skeleton tiles rendered while a year has nothing to show.
    pub placeholder_count: usize,
}

impl Default for GallerySection {
    fn default() -> Self {
        Self {
            title: "Gallery".to_string(),
            intro: "A collection of memorable moments from our annual reunions.".to_string(),
            preview_count: 4,
            placeholder_count: 8,
        }
    }
}

/// Upload form settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Years offered by the year picker.
    pub years: Vec<i32>,
    /// Accepted file types, by extension (case-insensitive).
    pub accepted_types: Vec<String>,
    /// Per-file size ceiling in mebibytes.
    pub max_file_size_mb: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            years: vec![2024, 2023, 2021, 2020],
            accepted_types: ["JPG", "JPEG", "PNG", "GIF", "MP4", "MOV", "HEIC", "HEIF"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_size_mb: 50,
        }
    }
}

impl UploadConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// HEIC conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranscodeConfig {
    /// JPEG quality (1 = worst, 100 = best).
    pub quality: u32,
    /// External program invoked as `<decoder> <input.heic> <output.png>`.
    pub decoder: String,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            quality: 70,
            decoder: "heif-convert".to_string(),
        }
    }
}

/// Colors and grid layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Grid columns on wide screens.
    pub columns: u32,
    /// Gap between grid tiles (CSS value).
    pub gap: String,
    pub background: String,
    pub text: String,
    /// Secondary text and placeholder tiles.
    pub muted: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            columns: 4,
            gap: "1.5rem".to_string(),
            background: "#ffffff".to_string(),
            text: "#111111".to_string(),
            muted: "#6b7280".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GalleryConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the library config from `config.toml` in `library_root`.
pub fn load_config(library_root: &Path) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(library_root)?;
    resolve_config(base, overlay)
}

/// A fully-commented stock `config.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# yeargal Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
#
# Place this file at <library>/config.toml.

# ---------------------------------------------------------------------------
# Gallery pages
# ---------------------------------------------------------------------------
[gallery]
title = "Gallery"

# Markdown shown under the overview heading.
intro = "A collection of memorable moments from our annual reunions."

# Items shown per year on the overview page ("See more" links to the rest).
preview_count = 4

# Skeleton tiles rendered while a year has nothing to show yet.
placeholder_count = 8

# ---------------------------------------------------------------------------
# Upload form
# ---------------------------------------------------------------------------
[upload]
# Years offered by the year picker. Uploads to other years are refused.
years = [2024, 2023, 2021, 2020]

# Accepted file types, by extension (case-insensitive).
accepted_types = ["JPG", "JPEG", "PNG", "GIF", "MP4", "MOV", "HEIC", "HEIF"]

# Per-file size ceiling, in MB.
max_file_size_mb = 50

# ---------------------------------------------------------------------------
# HEIC/HEIF conversion
# ---------------------------------------------------------------------------
[transcode]
# JPEG quality for converted files (1 = worst, 100 = best).
quality = 70

# External converter, invoked as: <decoder> <input.heic> <output.png>
# heif-convert ships with libheif (apt install libheif-examples).
decoder = "heif-convert"

# ---------------------------------------------------------------------------
# Theme
# ---------------------------------------------------------------------------
[theme]
columns = 4
gap = "1.5rem"
background = "#ffffff"
text = "#111111"
muted = "#6b7280"
"##
}

/// Generate CSS custom properties from the theme.
pub fn generate_theme_css(theme: &ThemeConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {background};
    --color-text: {text};
    --color-muted: {muted};
    --grid-columns: {columns};
    --grid-gap: {gap};
}}"#,
        background = theme.background,
        text = theme.text,
        muted = theme.muted,
        columns = theme.columns,
        gap = theme.gap,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_upload_rules() {
        let config = GalleryConfig::default();
        assert_eq!(config.upload.years, vec![2024, 2023, 2021, 2020]);
        assert_eq!(config.upload.max_file_size_mb, 50);
        assert_eq!(config.upload.max_file_size_bytes(), 52_428_800);
        assert_eq!(config.upload.accepted_types.len(), 8);
        assert_eq!(config.transcode.quality, 70);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[upload]
years = [2025]
"#;
        let config: GalleryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.upload.years, vec![2025]);
        assert_eq!(config.upload.max_file_size_mb, 50);
        assert_eq!(config.gallery.title, "Gallery");
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.transcode.decoder, "heif-convert");
        assert_eq!(config.gallery.preview_count, 4);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[gallery]
title = "Reunions"

[transcode]
quality = 85
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.gallery.title, "Reunions");
        assert_eq!(config.transcode.quality, 85);
        // Unspecified values stay at their defaults
        assert_eq!(config.transcode.decoder, "heif-convert");
        assert_eq!(config.gallery.placeholder_count, 8);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not valid toml [[[").unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[transcode]
quality = 0
"#,
        )
        .unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn huge_size_ceiling_is_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            "[upload]\nmax_file_size_mb = 9223372036854775807\n",
        )
        .unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn size_ceiling_upper_bound_is_accepted() {
        let mut config = GalleryConfig::default();
        config.upload.max_file_size_mb = MAX_FILE_SIZE_MB;
        assert!(config.validate().is_ok());
        assert_eq!(config.upload.max_file_size_bytes(), 1 << 40);
    }

    #[test]
    fn size_ceiling_bytes_saturate() {
        let upload = UploadConfig {
            max_file_size_mb: u64::MAX,
            ..UploadConfig::default()
        };
        assert_eq!(upload.max_file_size_bytes(), u64::MAX);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[upload]
years = [2024]
max_file_size_mb = 50
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[upload]
max_file_size_mb = 10
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let upload = merged.get("upload").unwrap();
        assert_eq!(upload.get("max_file_size_mb").unwrap().as_integer(), Some(10));
        assert_eq!(upload.get("years").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn merge_toml_arrays_replace_rather_than_append() {
        let base: toml::Value = toml::from_str("years = [2024, 2023]").unwrap();
        let overlay: toml::Value = toml::from_str("years = [2019]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("years").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // Unknown key rejection and validation tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<GalleryConfig, _> = toml::from_str(
            r#"
[upload]
max_size = 10
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<GalleryConfig, _> = toml::from_str("[uploads]\nyears = [1]\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(GalleryConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = GalleryConfig::default();
        config.transcode.quality = 100;
        assert!(config.validate().is_ok());
        config.transcode.quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));
    }

    #[test]
    fn validate_rejects_unknown_accepted_type() {
        let mut config = GalleryConfig::default();
        config.upload.accepted_types.push("TIFF".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("TIFF"));
    }

    #[test]
    fn validate_rejects_empty_years() {
        let mut config = GalleryConfig::default();
        config.upload.years.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_size_ceiling() {
        let mut config = GalleryConfig::default();
        config.upload.max_file_size_mb = 0;
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // stock config and CSS tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: GalleryConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = GalleryConfig::default();
        assert_eq!(config.upload.years, defaults.upload.years);
        assert_eq!(config.upload.accepted_types, defaults.upload.accepted_types);
        assert_eq!(config.transcode.quality, defaults.transcode.quality);
        assert_eq!(config.gallery.intro, defaults.gallery.intro);
        assert_eq!(config.theme.gap, defaults.theme.gap);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        for section in ["gallery", "upload", "transcode", "theme"] {
            assert!(val.get(section).is_some(), "missing [{section}]");
        }
    }

    #[test]
    fn theme_css_includes_grid_variables() {
        let css = generate_theme_css(&ThemeConfig::default());
        assert!(css.contains("--grid-columns: 4"));
        assert!(css.contains("--grid-gap: 1.5rem"));
        assert!(css.contains("--color-bg: #ffffff"));
    }
}
