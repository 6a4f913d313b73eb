use std::io;
use std::time::Instant;

use crate::configs::Config;
use crate::monitoring::Metrics;
use crate::storage::{KeyStore, OwnerAudioIndex, StorageLayout};

/// Top-level application state shared by every handler.
pub struct AppState {
    pub start_time: Instant,
    pub config: Config,
    pub layout: StorageLayout,
    pub index: OwnerAudioIndex,
    pub keys: KeyStore,
    pub metrics: Metrics,
}

impl AppState {
    /// Builds the state and makes sure the storage, temp and key roots
    /// exist before any request can touch them.
    pub fn new(config: Config) -> io::Result<Self> {
        let layout = StorageLayout::from_config(&config.storage);
        layout.ensure_roots()?;
        let keys = KeyStore::new(layout.keys_dir());

        Ok(Self {
            start_time: Instant::now(),
            config,
            layout,
            index: OwnerAudioIndex::new(),
            keys,
            metrics: Metrics::new(),
        })
    }
}
