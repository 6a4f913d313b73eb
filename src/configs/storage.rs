use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Authoritative artifact tree (`<root>/<owner>/<audio_id>/...`).
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Ephemeral ingestion scratch. Keep on the same filesystem as `root`
    /// so final placement is a rename; the copy fallback is best-effort.
    #[serde(default = "default_temp")]
    pub temp: PathBuf,
    /// Body cap for `POST /toml/upload`, MiB.
    #[serde(default = "default_upload_limit")]
    pub upload_limit_mib: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            temp: default_temp(),
            upload_limit_mib: default_upload_limit(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("/tmp/wavy_storage")
}

fn default_temp() -> PathBuf {
    PathBuf::from("/tmp/wavy_temp")
}

fn default_upload_limit() -> u64 {
    200
}
