//! Deletion-key files: `<storage_root>/.keys/<audio_id>.key` holding the
//! hex SHA-256 of the uploaded archive plus a trailing newline. Only the
//! upload handler creates them and only the delete handler removes them.

use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::common::consts::KEY_FILE_EXT;
use crate::common::types::AudioId;

#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, audio: &AudioId) -> PathBuf {
        self.dir.join(format!("{audio}{KEY_FILE_EXT}"))
    }

    pub fn persist(&self, audio: &AudioId, digest: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        trace!(audio = %audio, "persisting deletion key");
        std::fs::write(self.path(audio), format!("{digest}\n"))
    }

    /// First line of the key file, or `None` when no key exists.
    pub fn load(&self, audio: &AudioId) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path(audio)) {
            Ok(content) => Ok(Some(content.lines().next().unwrap_or("").to_owned())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn exists(&self, audio: &AudioId) -> bool {
        self.path(audio).is_file()
    }

    /// Returns whether a key file was actually removed.
    pub fn remove(&self, audio: &AudioId) -> io::Result<bool> {
        match std::fs::remove_file(self.path(audio)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl From<&Path> for KeyStore {
    fn from(dir: &Path) -> Self {
        Self::new(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_digest_with_newline() {
        let tmp = tempfile::tempdir().unwrap();
        let keys = KeyStore::new(tmp.path().join(".keys"));
        let audio = AudioId::from("a1");
        let digest = "ab".repeat(32);

        keys.persist(&audio, &digest).unwrap();
        let raw = std::fs::read_to_string(keys.path(&audio)).unwrap();
        assert_eq!(raw, format!("{digest}\n"));
        assert_eq!(keys.load(&audio).unwrap(), Some(digest));
    }

    #[test]
    fn missing_key_loads_none() {
        let tmp = tempfile::tempdir().unwrap();
        let keys = KeyStore::new(tmp.path());
        assert_eq!(keys.load(&AudioId::from("ghost")).unwrap(), None);
        assert!(!keys.exists(&AudioId::from("ghost")));
    }

    #[test]
    fn remove_reports_presence() {
        let tmp = tempfile::tempdir().unwrap();
        let keys = KeyStore::new(tmp.path());
        let audio = AudioId::from("a1");
        keys.persist(&audio, "deadbeef").unwrap();

        assert!(keys.remove(&audio).unwrap());
        assert!(!keys.remove(&audio).unwrap());
    }
}
