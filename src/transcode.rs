//! HEIC/HEIF → JPEG conversion for selected files.
//!
//! Phones hand out HEIC by default and browsers cannot display it, so every
//! HEIC/HEIF selection is re-encoded as JPEG before it is previewed or
//! uploaded. Everything else passes through untouched.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Detect | [`is_heic`]: MIME or `.heic`/`.heif` suffix |
//! | Decode | [`HeicDecoder`] ([`CommandDecoder`] shells out to `heif-convert`) |
//! | Encode | `image::codecs::jpeg::JpegEncoder` at [`Quality`] |
//!
//! Conversion failures are never fatal: the original file is kept and a
//! [`TranscodeError`] is returned alongside it as a warning.

use crate::media::PendingFile;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, warn};

/// JPEG quality (1-100). Clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    /// 70, i.e. the 0.7 quality phones' web uploaders settle on.
    fn default() -> Self {
        Self(70)
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("Failed to read decoded image: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Could not decode {name}: {source}")]
    Decode { name: String, source: DecodeError },
    #[error("Could not encode {name} as JPEG: {source}")]
    Encode {
        name: String,
        source: image::ImageError,
    },
}

impl TranscodeError {
    pub fn file_name(&self) -> &str {
        match self {
            TranscodeError::Decode { name, .. } | TranscodeError::Encode { name, .. } => name,
        }
    }
}

/// Turns HEIC/HEIF bytes into pixels.
pub trait HeicDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DecodeError>;
}

/// Decoder backed by an external converter invoked as
/// `<program> <input.heic> <output.png>`.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    program: String,
}

impl CommandDecoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CommandDecoder {
    fn default() -> Self {
        Self::new("heif-convert")
    }
}

impl HeicDecoder for CommandDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        let scratch = tempfile::TempDir::new()?;
        let input = scratch.path().join("input.heic");
        let output = scratch.path().join("output.png");
        std::fs::write(&input, bytes)?;

        let result = Command::new(&self.program)
            .arg(&input)
            .arg(&output)
            .output()
            .map_err(|source| DecodeError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !result.status.success() {
            return Err(DecodeError::Failed {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        load_png(&output)
    }
}

fn load_png(path: &Path) -> Result<DynamicImage, DecodeError> {
    Ok(image::ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

/// True for HEIC/HEIF files, judged by MIME or file name (case-insensitive).
pub fn is_heic(file: &PendingFile) -> bool {
    let mime_match = file.mime.eq_ignore_ascii_case("image/heic")
        || file.mime.eq_ignore_ascii_case("image/heif");
    let name = file.name.to_ascii_lowercase();
    mime_match || name.ends_with(".heic") || name.ends_with(".heif")
}

/// Swap a `.heic`/`.heif` extension for `.jpg`; append `.jpg` otherwise.
pub fn jpeg_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if ext.eq_ignore_ascii_case("heic") || ext.eq_ignore_ascii_case("heif") =>
        {
            format!("{stem}.jpg")
        }
        _ => format!("{name}.jpg"),
    }
}

/// Encode pixels as baseline JPEG. Alpha is dropped; JPEG has none.
pub fn encode_jpeg(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut out = Vec::new();
    // Quality is clamped to 1..=100, so the cast cannot truncate.
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality.value() as u8))?;
    Ok(out)
}

/// Outcome of converting one file.
#[derive(Debug)]
pub struct Converted {
    pub file: PendingFile,
    /// Set when a HEIC file could not be converted and was kept as-is.
    pub warning: Option<TranscodeError>,
}

/// Outcome of converting a selection.
#[derive(Debug, Default)]
pub struct ConvertedBatch {
    pub files: Vec<PendingFile>,
    pub warnings: Vec<TranscodeError>,
    /// Names of zero-byte files that were left out.
    pub dropped: Vec<String>,
}

/// Applies HEIC conversion to selected files.
pub struct Preprocessor<D: HeicDecoder> {
    decoder: D,
    quality: Quality,
}

impl<D: HeicDecoder> Preprocessor<D> {
    pub fn new(decoder: D, quality: Quality) -> Self {
        Self { decoder, quality }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Convert one file. Non-HEIC input is returned unchanged.
    pub fn convert(&self, file: PendingFile) -> Converted {
        if !is_heic(&file) {
            return Converted {
                file,
                warning: None,
            };
        }
        match self.transcode(&file) {
            Ok(converted) => {
                debug!(
                    from = %file.name,
                    to = %converted.name,
                    before = file.size(),
                    after = converted.size(),
                    "converted HEIC to JPEG"
                );
                Converted {
                    file: converted,
                    warning: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "keeping original format");
                Converted {
                    file,
                    warning: Some(e),
                }
            }
        }
    }

    fn transcode(&self, file: &PendingFile) -> Result<PendingFile, TranscodeError> {
        let pixels = self
            .decoder
            .decode(&file.bytes)
            .map_err(|source| TranscodeError::Decode {
                name: file.name.clone(),
                source,
            })?;
        let bytes = encode_jpeg(&pixels, self.quality).map_err(|source| TranscodeError::Encode {
            name: file.name.clone(),
            source,
        })?;
        Ok(PendingFile::new(jpeg_name(&file.name), "image/jpeg", bytes))
    }

    /// Convert a selection in order. Zero-byte files resolve to nothing and
    /// are dropped.
    pub fn convert_batch(&self, files: Vec<PendingFile>) -> ConvertedBatch {
        let mut batch = ConvertedBatch::default();
        for file in files {
            if file.bytes.is_empty() {
                debug!(name = %file.name, "dropping empty file");
                batch.dropped.push(file.name);
                continue;
            }
            let Converted { file, warning } = self.convert(file);
            batch.files.push(file);
            batch.warnings.extend(warning);
        }
        batch
    }
}
