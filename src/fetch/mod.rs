//! Client-side segment fetch protocol: master playlist → variant by
//! bandwidth → media playlist → init segment (fMP4) → sequenced segments,
//! handed to a pluggable audio backend.

pub mod client;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{error, info, warn};

use crate::common::consts::{MASTER_PLAYLIST, METADATA_FILE, PLAYLIST_VARIANT_TAG};
use crate::common::types::{AnyResult, AudioId, OwnerNickname};
use crate::fetch::client::{HlsClient, artifact_endpoint};
use crate::hls::parser::{parse_master, parse_media};
use crate::metadata;
use crate::playback::AudioBackend;

/// Fetcher strategy seam: implementations decide how segments are pulled
/// (aggregate up front, preemptive windows, ...).
#[async_trait]
pub trait SegmentFetcher: Send + Sync {
    /// Fetches one audio at the desired bitrate and plays it through the
    /// backend. Returns false on any failure.
    async fn fetch_and_play(
        &self,
        owner: &OwnerNickname,
        audio: &AudioId,
        bitrate: u64,
        backend: &mut dyn AudioBackend,
    ) -> bool;

    fn name(&self) -> &'static str;
}

/// Everything fetched for one audio, in playback order. For fMP4 the init
/// segment is the first element.
pub struct FetchedAudio {
    pub segments: Vec<Bytes>,
    pub is_flac: bool,
}

impl FetchedAudio {
    pub fn into_buffer(self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.segments.iter().map(Bytes::len).sum());
        for segment in self.segments {
            buffer.extend_from_slice(&segment);
        }
        buffer
    }
}

/// Fetches the whole audio up front, then plays.
pub struct AggregatedFetcher {
    client: HlsClient,
}

impl AggregatedFetcher {
    pub fn new(client: HlsClient) -> Self {
        Self { client }
    }

    pub async fn fetch(
        &self,
        owner: &OwnerNickname,
        audio: &AudioId,
        bitrate: u64,
    ) -> AnyResult<FetchedAudio> {
        let base = format!("/hls/{owner}/{audio}");
        let master_text = self
            .client
            .get_text(&artifact_endpoint(owner, audio, MASTER_PLAYLIST))
            .await?;

        // A master without variants is already a media playlist.
        let media = if master_text.contains(PLAYLIST_VARIANT_TAG) {
            let master = parse_master(&master_text, &base);
            let variant = master
                .select_variant(bitrate)
                .ok_or("master playlist lists no variants")?;
            if variant.bitrate != bitrate {
                warn!(
                    desired = bitrate,
                    selected = variant.bitrate,
                    "no exact bitrate match, using the highest variant"
                );
            }
            let media_text = self.client.get_text(&variant.uri).await?;
            parse_media(&media_text, variant.bitrate, &base)
        } else {
            parse_media(&master_text, bitrate, &base)
        };

        let mut segments = Vec::with_capacity(media.segments.len() + 1);
        let is_flac = media.is_fmp4();

        if let Some(init_uri) = &media.init_uri {
            segments.push(self.client.get_bytes(init_uri).await?);
            info!(uri = %init_uri, "init segment fetched");
        }

        for segment in &media.segments {
            segments.push(self.client.get_bytes(&segment.uri).await?);
        }
        info!(count = segments.len(), is_flac, "all segments fetched");

        Ok(FetchedAudio { segments, is_flac })
    }

    /// Stream facts from the server-side metadata, with sane fallbacks
    /// when the audio carries none.
    async fn stream_facts(&self, owner: &OwnerNickname, audio: &AudioId) -> (u32, u16, Option<u16>) {
        let Ok(text) = self
            .client
            .get_text(&artifact_endpoint(owner, audio, METADATA_FILE))
            .await
        else {
            return (44_100, 2, None);
        };
        match metadata::parse_validated(&text) {
            Ok(meta) => {
                let stream = meta.stream_0.unwrap_or_default();
                (
                    u32::try_from(stream.sample_rate).unwrap_or(44_100),
                    u16::try_from(stream.channels).ok().filter(|c| *c > 0).unwrap_or(2),
                    bit_depth_from_sample_format(&stream.sample_format),
                )
            }
            Err(_) => (44_100, 2, None),
        }
    }
}

#[async_trait]
impl SegmentFetcher for AggregatedFetcher {
    async fn fetch_and_play(
        &self,
        owner: &OwnerNickname,
        audio: &AudioId,
        bitrate: u64,
        backend: &mut dyn AudioBackend,
    ) -> bool {
        info!(owner = %owner, audio = %audio, bitrate, backend = backend.name(), "fetch starting");

        let fetched = match self.fetch(owner, audio, bitrate).await {
            Ok(fetched) => fetched,
            Err(err) => {
                error!(owner = %owner, audio = %audio, error = %err, "fetch failed");
                return false;
            }
        };

        let (sample_rate, channels, bit_depth) = self.stream_facts(owner, audio).await;
        let is_flac = fetched.is_flac;
        backend.initialize(fetched.into_buffer(), is_flac, sample_rate, channels, bit_depth)
            && backend.play()
    }

    fn name(&self) -> &'static str {
        "aggregated"
    }
}

/// `s16` → 16, `s32p` → 32; anything else is unknown.
fn bit_depth_from_sample_format(format: &str) -> Option<u16> {
    let digits: String = format
        .strip_prefix('s')?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_depth_parsing() {
        assert_eq!(bit_depth_from_sample_format("s16"), Some(16));
        assert_eq!(bit_depth_from_sample_format("s32p"), Some(32));
        assert_eq!(bit_depth_from_sample_format("fltp"), None);
        assert_eq!(bit_depth_from_sample_format(""), None);
    }

    #[test]
    fn fetched_audio_concatenates_in_order() {
        let fetched = FetchedAudio {
            segments: vec![Bytes::from_static(b"init"), Bytes::from_static(b"seg0")],
            is_flac: true,
        };
        assert_eq!(fetched.into_buffer(), b"initseg0");
    }
}
