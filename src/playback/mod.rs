//! Audio-backend plugin seam.
//!
//! Decoding and playback live outside this crate; a backend receives the
//! fetched byte stream plus enough stream facts to configure itself. The
//! file sink below is the debug implementation used in tests and by the
//! fetch examples.

use std::path::PathBuf;

use tracing::{error, info};

/// Capability set a playback backend provides.
pub trait AudioBackend: Send {
    /// Hands the backend the full fetched stream. Returns false when the
    /// backend cannot handle the format.
    fn initialize(
        &mut self,
        buffer: Vec<u8>,
        is_flac: bool,
        sample_rate: u32,
        channels: u16,
        bit_depth: Option<u16>,
    ) -> bool;

    /// Plays the initialized buffer to completion.
    fn play(&mut self) -> bool;

    fn name(&self) -> &'static str;
}

/// Debug backend: concatenates the fetched segments into a raw file
/// instead of playing them.
pub struct FileSinkBackend {
    path: PathBuf,
    buffer: Option<Vec<u8>>,
}

impl FileSinkBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer: None,
        }
    }
}

impl AudioBackend for FileSinkBackend {
    fn initialize(
        &mut self,
        buffer: Vec<u8>,
        is_flac: bool,
        sample_rate: u32,
        channels: u16,
        _bit_depth: Option<u16>,
    ) -> bool {
        info!(
            bytes = buffer.len(),
            is_flac, sample_rate, channels,
            "file sink initialized"
        );
        self.buffer = Some(buffer);
        true
    }

    fn play(&mut self) -> bool {
        let Some(buffer) = self.buffer.take() else {
            error!("file sink played before initialize");
            return false;
        };
        match std::fs::write(&self.path, &buffer) {
            Ok(()) => {
                info!(path = %self.path.display(), bytes = buffer.len(), "stream written");
                true
            }
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "stream write failed");
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "file-sink"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_writes_the_buffer() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("audio.raw");
        let mut backend = FileSinkBackend::new(&path);

        assert!(backend.initialize(b"raw stream".to_vec(), false, 44_100, 2, None));
        assert!(backend.play());
        assert_eq!(std::fs::read(&path).unwrap(), b"raw stream");
    }

    #[test]
    fn play_without_initialize_fails() {
        let mut backend = FileSinkBackend::new("/nonexistent/audio.raw");
        assert!(!backend.play());
        assert_eq!(backend.name(), "file-sink");
    }
}
