//! In-memory owner→audio index, the single source of truth for membership.
//!
//! Read-heavy: listings walk every owner on each request. Writes happen
//! once per upload and once per delete, behind the write half of a
//! reader/writer lock so readers always observe a consistent snapshot.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use thiserror::Error;

use crate::common::types::{AudioId, OwnerNickname};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("bulk initialization may only run once")]
    AlreadyInitialized,
    #[error("index already mutated; bulk initialization refused")]
    AlreadyModified,
}

#[derive(Default)]
struct Inner {
    relations: HashMap<OwnerNickname, HashSet<AudioId>>,
    initialized: bool,
    modified: bool,
}

/// Mutable view handed to the bulk initializer closure.
pub struct BulkLoader<'a> {
    relations: &'a mut HashMap<OwnerNickname, HashSet<AudioId>>,
}

impl BulkLoader<'_> {
    pub fn insert(&mut self, owner: OwnerNickname, audio: AudioId) {
        self.relations.entry(owner).or_default().insert(audio);
    }
}

#[derive(Default)]
pub struct OwnerAudioIndex {
    inner: RwLock<Inner>,
}

impl OwnerAudioIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-shot bulk initialization, used to rebuild the index from the
    /// on-disk tree at startup. Refuses to run twice, and refuses to run
    /// after any incremental insert/delete: initialization strictly
    /// precedes the first mutation, so a live index can never be wiped
    /// retroactively.
    pub fn update_db<F>(&self, init_fn: F) -> Result<(), IndexError>
    where
        F: FnOnce(&mut BulkLoader),
    {
        let mut inner = self.inner.write();
        if inner.modified {
            return Err(IndexError::AlreadyModified);
        }
        if inner.initialized {
            return Err(IndexError::AlreadyInitialized);
        }
        init_fn(&mut BulkLoader {
            relations: &mut inner.relations,
        });
        inner.initialized = true;
        Ok(())
    }

    /// Returns true when the relation is new.
    pub fn insert(&self, owner: OwnerNickname, audio: AudioId) -> bool {
        let mut inner = self.inner.write();
        inner.modified = true;
        inner.relations.entry(owner).or_default().insert(audio)
    }

    /// Removes one relation; the owner entry survives empty so listings
    /// keep showing the owner until its directory is reaped.
    pub fn remove(&self, owner: &OwnerNickname, audio: &AudioId) -> bool {
        let mut inner = self.inner.write();
        inner.modified = true;
        inner
            .relations
            .get_mut(owner)
            .map(|audios| audios.remove(audio))
            .unwrap_or(false)
    }

    pub fn has(&self, owner: &OwnerNickname, audio: &AudioId) -> bool {
        self.inner
            .read()
            .relations
            .get(owner)
            .is_some_and(|audios| audios.contains(audio))
    }

    pub fn has_owner(&self, owner: &OwnerNickname) -> bool {
        self.inner.read().relations.contains_key(owner)
    }

    /// Sorted audio ids for one owner.
    pub fn audios(&self, owner: &OwnerNickname) -> Vec<AudioId> {
        let inner = self.inner.read();
        let mut ids: Vec<AudioId> = inner
            .relations
            .get(owner)
            .map(|audios| audios.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Consistent whole-index snapshot, owners and ids sorted.
    pub fn snapshot(&self) -> Vec<(OwnerNickname, Vec<AudioId>)> {
        let inner = self.inner.read();
        let mut entries: Vec<(OwnerNickname, Vec<AudioId>)> = inner
            .relations
            .iter()
            .map(|(owner, audios)| {
                let mut ids: Vec<AudioId> = audios.iter().cloned().collect();
                ids.sort();
                (owner.clone(), ids)
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn for_each_owner<F>(&self, mut f: F)
    where
        F: FnMut(&OwnerNickname, &HashSet<AudioId>),
    {
        let inner = self.inner.read();
        for (owner, audios) in &inner.relations {
            f(owner, audios);
        }
    }

    pub fn owner_count(&self) -> usize {
        self.inner.read().relations.len()
    }

    pub fn relation_count(&self) -> usize {
        self.inner.read().relations.values().map(HashSet::len).sum()
    }
}
