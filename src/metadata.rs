//! Parsed view of an audio's `metadata.toml`.
//!
//! The server only reads this shape for listings; it never mutates or
//! regenerates the file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("i/o failure reading metadata: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("metadata has no source path")]
    MissingPath,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct AudioMetadata {
    #[serde(default)]
    pub audio_parser: FileInfo,
    #[serde(default)]
    pub metadata: Tags,
    #[serde(default)]
    pub stream_0: Option<StreamInfo>,
    #[serde(default)]
    pub stream_1: Option<StreamInfo>,
}

/// `[audio_parser]`: file-level facts recorded at packaging time.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileInfo {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub file_format: String,
    #[serde(default)]
    pub file_format_long: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub bitrate: i64,
    /// Bitrates the owner transcoded this audio into.
    #[serde(default)]
    pub transcoded_bitrates: Vec<i64>,
}

/// `[metadata]`: free-form tags carried over from the source file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Tags {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub album_artist: String,
    /// `a/b` fraction, e.g. `3/12`.
    #[serde(default)]
    pub track: String,
    /// `a/b` fraction.
    #[serde(default)]
    pub disc: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub encoder: String,
    #[serde(default)]
    pub encoded_by: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub copyright: String,
    #[serde(default, rename = "TSRC")]
    pub tsrc: String,
}

impl Tags {
    pub fn track_pair(&self) -> (i64, i64) {
        parse_fraction(&self.track)
    }

    pub fn disc_pair(&self) -> (i64, i64) {
        parse_fraction(&self.disc)
    }
}

/// `[stream_N]`: per-stream probe results.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct StreamInfo {
    #[serde(default)]
    pub codec: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub bitrate: i64,
    #[serde(default)]
    pub sample_rate: i64,
    #[serde(default)]
    pub channels: i64,
    #[serde(default)]
    pub channel_layout: String,
    #[serde(default)]
    pub sample_format: String,
}

/// Parses `a/b`; a missing `/b` half yields 0.
pub fn parse_fraction(value: &str) -> (i64, i64) {
    match value.split_once('/') {
        Some((a, b)) => (
            a.trim().parse().unwrap_or(0),
            b.trim().parse().unwrap_or(0),
        ),
        None => (value.trim().parse().unwrap_or(0), 0),
    }
}

/// Parses metadata and rejects documents without a source `path`, which is
/// what distinguishes a real Wavy metadata file from arbitrary TOML.
pub fn parse_validated(content: &str) -> Result<AudioMetadata, MetadataError> {
    let meta: AudioMetadata = toml::from_str(content)?;
    if meta.audio_parser.path.is_empty() {
        return Err(MetadataError::MissingPath);
    }
    Ok(meta)
}

pub fn parse_file(path: &Path) -> Result<AudioMetadata, MetadataError> {
    let content = std::fs::read_to_string(path)?;
    parse_validated(&content)
}
