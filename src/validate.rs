//! Type and size screening for selected files.
//!
//! Runs before anything else touches a selection: a file that fails here is
//! reported to the user and never converted, previewed or uploaded.

use crate::config::UploadConfig;
use crate::media::PendingFile;
use std::fmt;

/// Why a file was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    WrongType { accepted: Vec<String> },
    TooLarge { size: u64, limit: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub reason: RejectReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RejectReason::WrongType { accepted } => write!(
                f,
                "{} is not a supported file type (accepted: {})",
                self.name,
                accepted.join(", ")
            ),
            RejectReason::TooLarge { size, limit } => write!(
                f,
                "{} is too large ({}, limit {})",
                self.name,
                human_size(*size),
                human_size(*limit)
            ),
        }
    }
}

/// Format a byte count the way file pickers do (`52.4 MB` style, base 1024).
pub fn human_size(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;
    if bytes >= MB {
        let tenths = bytes * 10 / MB;
        if tenths % 10 == 0 {
            format!("{} MB", tenths / 10)
        } else {
            format!("{}.{} MB", tenths / 10, tenths % 10)
        }
    } else if bytes >= KB {
        format!("{} KB", bytes / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Files split into what may proceed and what was turned away.
#[derive(Debug, Default)]
pub struct Screened {
    pub accepted: Vec<PendingFile>,
    pub rejections: Vec<Rejection>,
}

/// Accepted extensions and the per-file size ceiling.
#[derive(Debug, Clone)]
pub struct UploadRules {
    accepted_types: Vec<String>,
    max_bytes: u64,
}

impl UploadRules {
    pub fn new(accepted_types: &[String], max_bytes: u64) -> Self {
        Self {
            accepted_types: accepted_types.iter().map(|t| t.to_ascii_uppercase()).collect(),
            max_bytes,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.accepted_types, config.max_file_size_bytes())
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn accepts_type(&self, file: &PendingFile) -> bool {
        file.extension()
            .is_some_and(|ext| self.accepted_types.contains(&ext.to_ascii_uppercase()))
    }

    pub fn check_one(&self, file: &PendingFile) -> Result<(), Rejection> {
        if !self.accepts_type(file) {
            return Err(Rejection {
                name: file.name.clone(),
                reason: RejectReason::WrongType {
                    accepted: self.accepted_types.clone(),
                },
            });
        }
        if file.size() > self.max_bytes {
            return Err(Rejection {
                name: file.name.clone(),
                reason: RejectReason::TooLarge {
                    size: file.size(),
                    limit: self.max_bytes,
                },
            });
        }
        Ok(())
    }

    /// Screen a selection, keeping the order of accepted files.
    pub fn check(&self, files: Vec<PendingFile>) -> Screened {
        let mut screened = Screened::default();
        for file in files {
            match self.check_one(&file) {
                Ok(()) => screened.accepted.push(file),
                Err(rejection) => screened.rejections.push(rejection),
            }
        }
        screened
    }
}

impl Default for UploadRules {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(name: &str, size: usize) -> PendingFile {
        PendingFile::new(name, crate::media::guess_mime(name), vec![0; size])
    }

    fn small_rules() -> UploadRules {
        UploadRules::new(&["JPG".to_string(), "mov".to_string()], 10)
    }

    #[test]
    fn default_rules_cover_all_media_types() {
        let rules = UploadRules::default();
        for name in [
            "a.jpg", "a.JPEG", "a.png", "a.gif", "a.mp4", "a.MOV", "a.heic", "a.heif",
        ] {
            assert!(rules.accepts_type(&sized(name, 1)), "{name} should be accepted");
        }
        assert_eq!(rules.max_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn wrong_type_rejected() {
        let err = small_rules().check_one(&sized("notes.txt", 1)).unwrap_err();
        assert!(matches!(err.reason, RejectReason::WrongType { .. }));
        assert_eq!(
            err.to_string(),
            "notes.txt is not a supported file type (accepted: JPG, MOV)"
        );
    }

    #[test]
    fn missing_extension_rejected() {
        assert!(small_rules().check_one(&sized("README", 1)).is_err());
    }

    #[test]
    fn size_limit_is_inclusive() {
        let rules = small_rules();
        assert!(rules.check_one(&sized("a.jpg", 10)).is_ok());
        let err = rules.check_one(&sized("a.jpg", 11)).unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::TooLarge {
                size: 11,
                limit: 10
            }
        );
    }

    #[test]
    fn check_splits_and_keeps_order() {
        let screened = small_rules().check(vec![
            sized("a.jpg", 1),
            sized("big.jpg", 20),
            sized("b.mov", 2),
            sized("c.txt", 1),
        ]);
        let names: Vec<&str> = screened.accepted.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.mov"]);
        assert_eq!(screened.rejections.len(), 2);
        assert_eq!(screened.rejections[0].name, "big.jpg");
    }

    #[test]
    fn human_size_formats() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2 KB");
        assert_eq!(human_size(50 * 1024 * 1024), "50 MB");
        assert_eq!(human_size(50 * 1024 * 1024 + 512 * 1024), "50.5 MB");
    }

    #[test]
    fn too_large_message_mentions_limit() {
        let rules = UploadRules::default();
        let err = rules
            .check_one(&sized("huge.mp4", 51 * 1024 * 1024))
            .unwrap_err();
        assert_eq!(err.to_string(), "huge.mp4 is too large (51 MB, limit 50 MB)");
    }
}
