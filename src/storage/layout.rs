//! On-disk layout of the artifact tree. Every component that touches the
//! tree goes through this type; nothing else computes storage paths.
//!
//! ```text
//! <storage_root>/<owner>/<audio_id>/{index.m3u8, hls_*.m3u8, *.ts|*.m4s, init.mp4, metadata.toml}
//! <storage_root>/.keys/<audio_id>.key
//! <temp_root>/<audio_id>.tar.gz
//! <temp_root>/<audio_id>/
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::common::consts::{COMPRESSED_ARCHIVE_EXT, KEY_FILE_EXT, KEYS_DIR};
use crate::common::types::{AudioId, OwnerNickname};
use crate::configs::StorageConfig;

#[derive(Debug, Clone)]
pub struct StorageLayout {
    storage_root: PathBuf,
    temp_root: PathBuf,
}

impl StorageLayout {
    pub fn new(storage_root: impl Into<PathBuf>, temp_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            temp_root: temp_root.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.root, &config.temp)
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    pub fn ensure_roots(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.storage_root)?;
        std::fs::create_dir_all(&self.temp_root)?;
        std::fs::create_dir_all(self.keys_dir())
    }

    pub fn owner_dir(&self, owner: &OwnerNickname) -> PathBuf {
        self.storage_root.join(&owner.0)
    }

    pub fn audio_dir(&self, owner: &OwnerNickname, audio: &AudioId) -> PathBuf {
        self.owner_dir(owner).join(&audio.0)
    }

    pub fn artifact_path(
        &self,
        owner: &OwnerNickname,
        audio: &AudioId,
        filename: &str,
    ) -> PathBuf {
        self.audio_dir(owner, audio).join(filename)
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.storage_root.join(KEYS_DIR)
    }

    pub fn key_path(&self, audio: &AudioId) -> PathBuf {
        self.keys_dir().join(format!("{audio}{KEY_FILE_EXT}"))
    }

    pub fn temp_archive_path(&self, audio: &AudioId) -> PathBuf {
        self.temp_root
            .join(format!("{audio}{COMPRESSED_ARCHIVE_EXT}"))
    }

    pub fn temp_extract_dir(&self, audio: &AudioId) -> PathBuf {
        self.temp_root.join(&audio.0)
    }

    /// Moves a validated temp file into the audio directory, keeping the
    /// source file name. Renames when possible; falls back to
    /// copy-then-remove across filesystems (`fs::copy` carries POSIX
    /// permissions along).
    pub fn place(
        &self,
        src: &Path,
        owner: &OwnerNickname,
        audio: &AudioId,
    ) -> io::Result<PathBuf> {
        let name = src
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"))?;
        let dst = self.audio_dir(owner, audio).join(name);

        match std::fs::rename(src, &dst) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
                debug!(src = %src.display(), dst = %dst.display(), "cross-device move, copying");
                std::fs::copy(src, &dst)?;
                std::fs::remove_file(src)?;
            }
            Err(err) => return Err(err),
        }
        Ok(dst)
    }

    /// Recursively removes the audio directory and its deletion-key file.
    /// Idempotent; returns whether the directory existed.
    pub fn remove_audio(&self, owner: &OwnerNickname, audio: &AudioId) -> io::Result<bool> {
        let dir = self.audio_dir(owner, audio);
        let existed = dir.is_dir();
        if existed {
            std::fs::remove_dir_all(&dir)?;
            info!(owner = %owner, audio = %audio, "audio directory removed");
        }

        let key = self.key_path(audio);
        if key.is_file() {
            std::fs::remove_file(&key)?;
        }
        Ok(existed)
    }

    /// Total size of one audio directory's files, for per-owner accounting.
    pub fn audio_dir_size(&self, owner: &OwnerNickname, audio: &AudioId) -> u64 {
        let dir = self.audio_dir(owner, audio);
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };
        entries
            .flatten()
            .filter_map(|e| e.metadata().ok())
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .sum()
    }
}

/// True for names that stay within one directory level; used on every
/// path component taken from a request or an archive.
pub fn safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
