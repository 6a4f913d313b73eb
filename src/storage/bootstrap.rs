//! Startup rebuild of the owner/audio index from the on-disk tree.
//!
//! Storage is persistent across restarts; the index is not. Walking
//! `<storage_root>/<owner>/<audio_id>/` through the single-shot bulk
//! initializer restores the index before the server accepts requests.

use std::io;

use tracing::info;

use crate::common::consts::KEYS_DIR;
use crate::common::types::{AudioId, OwnerNickname};
use crate::storage::index::{IndexError, OwnerAudioIndex};
use crate::storage::layout::StorageLayout;

/// Per-owner aggregate discovered during the walk, used to seed metrics.
#[derive(Debug, PartialEq, Eq)]
pub struct OwnerUsage {
    pub owner: OwnerNickname,
    pub songs: u64,
    pub storage_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Index(#[from] IndexError),
}

pub fn rebuild_index(
    layout: &StorageLayout,
    index: &OwnerAudioIndex,
) -> Result<Vec<OwnerUsage>, BootstrapError> {
    let mut discovered: Vec<(OwnerNickname, AudioId)> = Vec::new();

    for owner_entry in std::fs::read_dir(layout.storage_root())? {
        let owner_entry = owner_entry?;
        if !owner_entry.file_type()?.is_dir() {
            continue;
        }
        let Some(owner_name) = owner_entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if owner_name == KEYS_DIR {
            continue;
        }
        let owner = OwnerNickname::from(owner_name);

        for audio_entry in std::fs::read_dir(owner_entry.path())? {
            let audio_entry = audio_entry?;
            if !audio_entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(audio_name) = audio_entry.file_name().to_str() {
                discovered.push((owner.clone(), AudioId::from(audio_name)));
            }
        }
    }

    index.update_db(|db| {
        for (owner, audio) in &discovered {
            db.insert(owner.clone(), audio.clone());
        }
    })?;

    let mut usage: Vec<OwnerUsage> = Vec::new();
    for (owner, audio) in &discovered {
        let bytes = layout.audio_dir_size(owner, audio);
        match usage.iter_mut().find(|u| &u.owner == owner) {
            Some(entry) => {
                entry.songs += 1;
                entry.storage_bytes += bytes;
            }
            None => usage.push(OwnerUsage {
                owner: owner.clone(),
                songs: 1,
                storage_bytes: bytes,
            }),
        }
    }

    info!(
        owners = usage.len(),
        audios = discovered.len(),
        "index rebuilt from storage tree"
    );
    Ok(usage)
}
