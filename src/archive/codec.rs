//! Streaming reader for uploaded `.tar.gz` payloads.
//!
//! Entries whose name carries the `zst` marker are Zstandard single frames:
//! after extraction they are decompressed in place, the compressed copy is
//! deleted and the logical file takes its place. Transport streams and
//! playlists compress well, so owners usually ship them pre-compressed;
//! fMP4 segments do not, so they arrive raw. Both must be accepted.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::{debug, info};

use crate::common::consts::ZSTD_FILE_EXT;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Malformed gzip, malformed tar header, or plain filesystem trouble.
    #[error("archive i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive entry has no usable file name")]
    BadEntryName,

    #[error("{path}: not a zstd frame")]
    ZstdBadFrame { path: String },

    /// Frames without a pledged content size are refused outright; the
    /// packager always writes single frames with the size recorded.
    #[error("{path}: zstd frame does not advertise its content size")]
    ZstdUnknownSize { path: String },

    #[error("{path}: decompressed {actual} bytes, frame advertised {expected}")]
    ZstdSizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("archive contained no file entries")]
    Empty,
}

/// Extracts a gzip-wrapped tar into `dest_dir` and resolves compressed
/// entries, returning the logical files in archive order.
///
/// Entry names are flattened to their final component; the payload format
/// is a flat archive, and this also keeps entries from escaping `dest_dir`.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    info!(archive = %archive_path.display(), "extracting payload");
    fs::create_dir_all(dest_dir)?;

    let file = File::open(archive_path)?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    let mut produced = Vec::new();
    for entry in tar.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = entry
            .path()?
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or(ArchiveError::BadEntryName)?;
        let out_path = dest_dir.join(&name);

        let mut out = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;
        debug!(file = %out_path.display(), "entry extracted");

        if out_path.extension().and_then(|e| e.to_str()) == Some(ZSTD_FILE_EXT) {
            produced.push(decompress_entry(&out_path)?);
        } else {
            produced.push(out_path);
        }
    }

    if produced.is_empty() {
        return Err(ArchiveError::Empty);
    }
    Ok(produced)
}

/// Inflates one single-frame zstd file next to itself, deletes the
/// compressed copy and returns the logical path (marker stripped).
fn decompress_entry(path: &Path) -> Result<PathBuf, ArchiveError> {
    let display = path.display().to_string();
    let data = fs::read(path)?;

    let expected = match zstd::zstd_safe::get_frame_content_size(&data) {
        Ok(Some(size)) => size,
        Ok(None) => {
            return Err(ArchiveError::ZstdUnknownSize { path: display });
        }
        Err(_) => {
            return Err(ArchiveError::ZstdBadFrame { path: display });
        }
    };

    let decompressed = zstd::bulk::decompress(&data, expected as usize)?;
    if decompressed.len() as u64 != expected {
        return Err(ArchiveError::ZstdSizeMismatch {
            path: display,
            expected,
            actual: decompressed.len() as u64,
        });
    }

    let target = path.with_extension("");
    fs::write(&target, &decompressed)?;
    fs::remove_file(path)?;
    debug!(file = %target.display(), "zstd entry inflated");
    Ok(target)
}
