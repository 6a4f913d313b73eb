//! The ingestion pipeline: receive → temp write → hash → extract →
//! validate → place → index → key persist → cleanup.
//!
//! Temp artifacts are removed on every exit path. Once anything has been
//! placed under the storage tree, a failure reverts the partially
//! populated audio directory, the key file and the index entry before the
//! original error surfaces.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::archive::codec::{ArchiveError, extract_archive};
use crate::archive::hasher::sha256_hex_file;
use crate::archive::validator::{self, FileKind};
use crate::common::types::{AudioId, OwnerNickname};
use crate::storage::index::OwnerAudioIndex;
use crate::storage::keys::KeyStore;
use crate::storage::layout::{StorageLayout, safe_component};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("empty upload body")]
    EmptyBody,

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("archive carries no owner marker")]
    NoOwnerMarker,

    #[error("owner nickname is not a legal directory name: {0}")]
    BadOwnerNickname(String),

    #[error("no valid files remain after validation")]
    NoValidFiles,

    #[error("archive mixes transport-stream and fMP4 segments")]
    MixedSegments,

    #[error("audio id {0} already exists on disk")]
    Collision(AudioId),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Client-caused failures map to 400; the rest are server faults.
    pub fn is_client_fault(&self) -> bool {
        !matches!(self, Self::Collision(_) | Self::Io(_))
    }
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub audio_id: AudioId,
    pub owner: OwnerNickname,
    pub sha256: String,
    pub key_persisted: bool,
    /// Compressed wire size of the uploaded archive.
    pub archive_bytes: u64,
    /// Decompressed size of the files placed under the audio directory;
    /// this is what per-owner storage accounting tracks.
    pub stored_bytes: u64,
    pub files_stored: usize,
}

/// Runs one upload through the full pipeline. Blocking; callers on the
/// async side wrap this in `spawn_blocking`.
pub fn ingest_archive(
    layout: &StorageLayout,
    index: &OwnerAudioIndex,
    keys: &KeyStore,
    audio_id: &AudioId,
    body: &[u8],
) -> Result<IngestOutcome, IngestError> {
    if body.is_empty() {
        return Err(IngestError::EmptyBody);
    }

    fs::create_dir_all(layout.temp_root())?;
    let archive_path = layout.temp_archive_path(audio_id);
    let extract_dir = layout.temp_extract_dir(audio_id);
    let _temp = TempCleanup {
        archive: archive_path.clone(),
        dir: extract_dir.clone(),
    };

    fs::write(&archive_path, body)?;
    // Digest over the byte-exact archive, before the temp copy goes away.
    let digest = sha256_hex_file(&archive_path)?;

    let entries = extract_archive(&archive_path, &extract_dir)?;

    let mut owner: Option<OwnerNickname> = None;
    let mut kept: Vec<PathBuf> = Vec::new();
    let (mut ts_count, mut m4s_count, mut metadata_count) = (0usize, 0usize, 0usize);

    for path in entries {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned();
        let kind = validator::classify(&name);

        match kind {
            // The marker conveys the nickname and is consumed here; it
            // never reaches the storage tree.
            FileKind::OwnerMarker => {
                if owner.is_none() {
                    owner = validator::owner_nickname(&name).map(OwnerNickname::from);
                }
                fs::remove_file(&path)?;
                continue;
            }
            FileKind::Unknown => {
                warn!(file = %name, "unknown entry dropped");
                fs::remove_file(&path)?;
                continue;
            }
            FileKind::Metadata if metadata_count > 0 => {
                warn!(file = %name, "surplus metadata file dropped");
                fs::remove_file(&path)?;
                continue;
            }
            _ => {}
        }

        let data = fs::read(&path)?;
        if !validator::validate(kind, &name, &data) {
            warn!(file = %name, "entry failed validation, dropped");
            fs::remove_file(&path)?;
            continue;
        }

        match kind {
            FileKind::TransportStream => ts_count += 1,
            FileKind::FragmentSegment => m4s_count += 1,
            FileKind::Metadata => metadata_count += 1,
            _ => {}
        }
        kept.push(path);
    }

    let owner = owner.ok_or(IngestError::NoOwnerMarker)?;
    if !safe_component(&owner) {
        return Err(IngestError::BadOwnerNickname(owner.0));
    }
    if kept.is_empty() {
        return Err(IngestError::NoValidFiles);
    }
    // One audio is either all transport-stream or all fMP4.
    if ts_count > 0 && m4s_count > 0 {
        return Err(IngestError::MixedSegments);
    }

    let audio_dir = layout.audio_dir(&owner, audio_id);
    if audio_dir.exists() {
        return Err(IngestError::Collision(audio_id.clone()));
    }
    fs::create_dir_all(&audio_dir)?;

    let mut revert = RevertGuard {
        layout,
        index,
        owner: &owner,
        audio: audio_id,
        armed: true,
    };

    let files_stored = kept.len();
    for path in &kept {
        layout.place(path, &owner, audio_id)?;
    }
    let stored_bytes = layout.audio_dir_size(&owner, audio_id);
    index.insert(owner.clone(), audio_id.clone());
    keys.persist(audio_id, &digest)?;
    revert.armed = false;
    drop(revert);

    info!(owner = %owner, audio = %audio_id, files = files_stored, "ingest complete");

    Ok(IngestOutcome {
        audio_id: audio_id.clone(),
        owner,
        sha256: digest,
        key_persisted: true,
        archive_bytes: body.len() as u64,
        stored_bytes,
        files_stored,
    })
}

/// Removes the temp archive and extract tree on all exit paths.
struct TempCleanup {
    archive: PathBuf,
    dir: PathBuf,
}

impl Drop for TempCleanup {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.archive);
        let _ = fs::remove_dir_all(&self.dir);
    }
}

/// Undoes a partially persisted audio when the pipeline fails after
/// placement began.
struct RevertGuard<'a> {
    layout: &'a StorageLayout,
    index: &'a OwnerAudioIndex,
    owner: &'a OwnerNickname,
    audio: &'a AudioId,
    armed: bool,
}

impl Drop for RevertGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(owner = %self.owner, audio = %self.audio, "reverting partial ingest");
            let _ = self.layout.remove_audio(self.owner, self.audio);
            self.index.remove(self.owner, self.audio);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &[u8] = b"[audio_parser]\npath = \"source.flac\"\n";
    const PLAYLIST: &[u8] = b"#EXTM3U\n#EXT-X-VERSION:3\n";
    const FLAC_PLAYLIST: &[u8] =
        b"#EXTM3U\n#EXT-X-MAP:URI=\"init.mp4\"\n#EXTINF:4.0,\nhls_flac_0.m4s\n";

    struct Fixture {
        _tmp: tempfile::TempDir,
        layout: StorageLayout,
        index: OwnerAudioIndex,
        keys: KeyStore,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(tmp.path().join("storage"), tmp.path().join("temp"));
        layout.ensure_roots().unwrap();
        let keys = KeyStore::new(layout.keys_dir());
        Fixture {
            _tmp: tmp,
            layout,
            index: OwnerAudioIndex::new(),
            keys,
        }
    }

    fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(gz);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn lossy_archive() -> Vec<u8> {
        build_archive(&[
            ("alice.owner", b"".as_slice()),
            ("metadata.toml", METADATA),
            ("index.m3u8", PLAYLIST),
            ("hls_mp3_64.m3u8", PLAYLIST),
            ("hls_mp3_64_0.ts", b"\x47seg0".as_slice()),
            ("hls_mp3_64_1.ts", b"\x47seg1".as_slice()),
        ])
    }

    fn temp_is_clean(f: &Fixture, audio: &AudioId) -> bool {
        !f.layout.temp_archive_path(audio).exists() && !f.layout.temp_extract_dir(audio).exists()
    }

    #[test]
    fn happy_path_lossy() {
        let f = fixture();
        let audio = AudioId::generate();
        let body = lossy_archive();

        let outcome = ingest_archive(&f.layout, &f.index, &f.keys, &audio, &body).unwrap();
        assert_eq!(outcome.owner, OwnerNickname::from("alice"));
        assert_eq!(outcome.files_stored, 5);
        assert_eq!(outcome.sha256.len(), 64);
        assert!(outcome.key_persisted);

        let owner = OwnerNickname::from("alice");
        let dir = f.layout.audio_dir(&owner, &audio);
        let mut names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "hls_mp3_64.m3u8",
                "hls_mp3_64_0.ts",
                "hls_mp3_64_1.ts",
                "index.m3u8",
                "metadata.toml"
            ]
        );

        // The marker is consumed, never placed.
        assert!(!dir.join("alice.owner").exists());

        // Storage accounting reflects the placed files, not the archive.
        assert_eq!(outcome.stored_bytes, f.layout.audio_dir_size(&owner, &audio));
        assert!(outcome.stored_bytes > 0);
        assert_eq!(outcome.archive_bytes, body.len() as u64);

        // Key file holds the digest plus newline.
        let key_raw = std::fs::read_to_string(f.layout.key_path(&audio)).unwrap();
        assert_eq!(key_raw, format!("{}\n", outcome.sha256));

        assert!(f.index.has(&owner, &audio));
        assert!(temp_is_clean(&f, &audio));
    }

    #[test]
    fn lossless_with_init_segment() {
        let f = fixture();
        let audio = AudioId::generate();
        let body = build_archive(&[
            ("bob.owner", b"".as_slice()),
            ("metadata.toml", METADATA),
            ("index.m3u8", PLAYLIST),
            ("hls_flac.m3u8", FLAC_PLAYLIST),
            ("init.mp4", b"ftyp-init".as_slice()),
            ("hls_flac_0.m4s", b"frag0".as_slice()),
            ("hls_flac_1.m4s", b"frag1".as_slice()),
        ]);

        let outcome = ingest_archive(&f.layout, &f.index, &f.keys, &audio, &body).unwrap();
        assert_eq!(outcome.files_stored, 6);

        let owner = OwnerNickname::from("bob");
        assert!(f.layout.artifact_path(&owner, &audio, "init.mp4").exists());
        assert!(
            f.layout
                .artifact_path(&owner, &audio, "hls_flac_1.m4s")
                .exists()
        );
    }

    #[test]
    fn zstd_entries_are_inflated_before_placement() {
        let f = fixture();
        let audio = AudioId::generate();
        let segment = b"\x47transport".repeat(2000);
        let compressed = zstd::bulk::compress(&segment, 3).unwrap();
        let body = build_archive(&[
            ("alice.owner", b"".as_slice()),
            ("index.m3u8", PLAYLIST),
            ("hls_mp3_64_0.ts.zst", compressed.as_slice()),
        ]);

        let outcome = ingest_archive(&f.layout, &f.index, &f.keys, &audio, &body).unwrap();

        let owner = OwnerNickname::from("alice");
        let placed = f.layout.artifact_path(&owner, &audio, "hls_mp3_64_0.ts");
        assert_eq!(std::fs::read(placed).unwrap(), segment);
        // The gauge input counts the inflated segment, bigger than the
        // compressed archive that carried it.
        assert!(outcome.stored_bytes > outcome.archive_bytes);
        assert!(
            !f.layout
                .artifact_path(&owner, &audio, "hls_mp3_64_0.ts.zst")
                .exists()
        );
    }

    #[test]
    fn missing_owner_marker_fails_clean() {
        let f = fixture();
        let audio = AudioId::generate();
        let body = build_archive(&[("index.m3u8", PLAYLIST)]);

        let err = ingest_archive(&f.layout, &f.index, &f.keys, &audio, &body).unwrap_err();
        assert!(matches!(err, IngestError::NoOwnerMarker));
        assert!(err.is_client_fault());
        assert!(temp_is_clean(&f, &audio));
        assert_eq!(f.index.relation_count(), 0);
    }

    #[test]
    fn invalid_playlist_is_dropped_but_upload_survives() {
        let f = fixture();
        let audio = AudioId::generate();
        let body = build_archive(&[
            ("alice.owner", b"".as_slice()),
            ("index.m3u8", b"no header here".as_slice()),
            ("hls_mp3_64_0.ts", b"\x47seg".as_slice()),
        ]);

        let outcome = ingest_archive(&f.layout, &f.index, &f.keys, &audio, &body).unwrap();
        assert_eq!(outcome.files_stored, 1);

        let owner = OwnerNickname::from("alice");
        assert!(
            !f.layout
                .artifact_path(&owner, &audio, "index.m3u8")
                .exists()
        );
        assert!(
            f.layout
                .artifact_path(&owner, &audio, "hls_mp3_64_0.ts")
                .exists()
        );
    }

    #[test]
    fn all_entries_invalid_fails() {
        let f = fixture();
        let audio = AudioId::generate();
        let body = build_archive(&[
            ("alice.owner", b"".as_slice()),
            ("index.m3u8", b"bogus".as_slice()),
            ("hls_mp3_64_0.ts", b"\x00wrong sync".as_slice()),
        ]);

        let err = ingest_archive(&f.layout, &f.index, &f.keys, &audio, &body).unwrap_err();
        assert!(matches!(err, IngestError::NoValidFiles));
        assert!(!f.layout.owner_dir(&OwnerNickname::from("alice")).exists());
        assert!(temp_is_clean(&f, &audio));
    }

    #[test]
    fn mixed_segment_kinds_abort() {
        let f = fixture();
        let audio = AudioId::generate();
        let body = build_archive(&[
            ("alice.owner", b"".as_slice()),
            ("hls_mp3_64_0.ts", b"\x47seg".as_slice()),
            ("hls_flac_0.m4s", b"frag".as_slice()),
        ]);

        let err = ingest_archive(&f.layout, &f.index, &f.keys, &audio, &body).unwrap_err();
        assert!(matches!(err, IngestError::MixedSegments));
        assert!(temp_is_clean(&f, &audio));
        assert!(!f.keys.exists(&audio));
    }

    #[test]
    fn surplus_metadata_is_dropped() {
        let f = fixture();
        let audio = AudioId::generate();
        let body = build_archive(&[
            ("alice.owner", b"".as_slice()),
            ("metadata.toml", METADATA),
            ("extra.toml", METADATA),
            ("hls_mp3_64_0.ts", b"\x47seg".as_slice()),
        ]);

        let outcome = ingest_archive(&f.layout, &f.index, &f.keys, &audio, &body).unwrap();
        assert_eq!(outcome.files_stored, 2);

        let owner = OwnerNickname::from("alice");
        assert!(
            f.layout
                .artifact_path(&owner, &audio, "metadata.toml")
                .exists()
        );
        assert!(!f.layout.artifact_path(&owner, &audio, "extra.toml").exists());
    }

    #[test]
    fn empty_body_is_rejected() {
        let f = fixture();
        let audio = AudioId::generate();
        let err = ingest_archive(&f.layout, &f.index, &f.keys, &audio, b"").unwrap_err();
        assert!(matches!(err, IngestError::EmptyBody));
    }

    #[test]
    fn preexisting_audio_dir_is_never_overwritten() {
        let f = fixture();
        let audio = AudioId::generate();
        let owner = OwnerNickname::from("alice");
        let dir = f.layout.audio_dir(&owner, &audio);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.m3u8"), b"#EXTM3U\noriginal\n").unwrap();

        let err = ingest_archive(&f.layout, &f.index, &f.keys, &audio, &lossy_archive())
            .unwrap_err();
        assert!(matches!(err, IngestError::Collision(_)));
        assert!(!err.is_client_fault());
        // Original content untouched.
        assert_eq!(
            std::fs::read(dir.join("index.m3u8")).unwrap(),
            b"#EXTM3U\noriginal\n"
        );
    }

    #[test]
    fn corrupt_archive_is_client_fault() {
        let f = fixture();
        let audio = AudioId::generate();
        let err =
            ingest_archive(&f.layout, &f.index, &f.keys, &audio, b"not a gzip").unwrap_err();
        assert!(matches!(err, IngestError::Archive(_)));
        assert!(err.is_client_fault());
        assert!(temp_is_clean(&f, &audio));
    }
}
