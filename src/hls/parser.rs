//! Line-oriented M3U8 parser for the playlists Wavy itself produces.
//!
//! Not a universal HLS parser; it covers the master/media grammar from the
//! packaging side (`#EXT-X-STREAM-INF`, `#EXTINF`, `#EXT-X-MAP`) and leaves
//! every other tag alone.

use tracing::{debug, warn};

use crate::common::consts::{PLAYLIST_INF_TAG, PLAYLIST_MAP_TAG, PLAYLIST_VARIANT_TAG};
use crate::hls::ast::{MasterPlaylist, MediaPlaylist, Segment, VariantStream};

/// Parses a master playlist. Relative variant URIs are joined onto
/// `base`; the media map is left empty for the caller to fill.
pub fn parse_master(content: &str, base: &str) -> MasterPlaylist {
    let mut master = MasterPlaylist::default();
    let mut pending: Option<VariantStream> = None;

    for line in content.lines() {
        let line = line.trim();
        if let Some(attrs) = line.strip_prefix(PLAYLIST_VARIANT_TAG) {
            pending = Some(parse_variant_info(attrs));
        } else if !line.is_empty() && !line.starts_with('#') {
            if let Some(mut variant) = pending.take() {
                variant.uri = resolve_uri(base, line);
                debug!(bitrate = variant.bitrate, uri = %variant.uri, "variant parsed");
                master.variants.push(variant);
            }
        }
    }
    master
}

/// Parses a media playlist at one bitrate. Segment and init URIs are
/// joined onto `base`.
pub fn parse_media(content: &str, bitrate: u64, base: &str) -> MediaPlaylist {
    let mut media = MediaPlaylist {
        bitrate,
        ..Default::default()
    };
    let mut pending_duration: Option<f32> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(PLAYLIST_MAP_TAG) {
            if let Some(uri) = quoted_attr(rest, "URI=") {
                media.init_uri = Some(resolve_uri(base, &uri));
            }
        } else if let Some(rest) = line.strip_prefix(PLAYLIST_INF_TAG) {
            let duration_str = rest.split(',').next().unwrap_or(rest);
            match duration_str.trim().parse::<f32>() {
                Ok(d) => pending_duration = Some(d),
                Err(_) => {
                    warn!(line, "unparseable EXTINF duration");
                    pending_duration = None;
                }
            }
        } else if !line.starts_with('#') {
            match pending_duration.take() {
                Some(duration) => media.segments.push(Segment {
                    duration,
                    uri: resolve_uri(base, line),
                }),
                None => warn!(line, "segment URI without preceding EXTINF, skipping"),
            }
        }
    }

    media
}

fn parse_variant_info(attrs: &str) -> VariantStream {
    let mut vs = VariantStream::default();

    for (key, value) in attr_pairs(attrs) {
        match key {
            // AVERAGE-BANDWIDTH wins over BANDWIDTH when both are present.
            "AVERAGE-BANDWIDTH" => {
                if let Ok(bw) = value.parse() {
                    vs.bitrate = bw;
                }
            }
            "BANDWIDTH" => {
                if vs.bitrate == 0 {
                    if let Ok(bw) = value.parse() {
                        vs.bitrate = bw;
                    }
                }
            }
            "RESOLUTION" => vs.resolution = Some(value.to_owned()),
            "CODECS" => vs.codecs = Some(value.to_owned()),
            _ => {}
        }
    }
    vs
}

/// Splits an attribute list on commas outside quotes and yields
/// `(KEY, value)` pairs with surrounding quotes stripped.
fn attr_pairs(attrs: &str) -> impl Iterator<Item = (&str, &str)> {
    let mut pairs = Vec::new();
    let mut depth_quoted = false;
    let mut start = 0;

    let bytes = attrs.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => depth_quoted = !depth_quoted,
            b',' if !depth_quoted => {
                pairs.push(&attrs[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pairs.push(&attrs[start..]);

    pairs.into_iter().filter_map(|item| {
        let (key, value) = item.split_once('=')?;
        Some((key.trim(), value.trim().trim_matches('"')))
    })
}

fn quoted_attr(line: &str, key: &str) -> Option<String> {
    let rest = &line[line.find(key)? + key.len()..];
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(rest[..end].to_owned())
}

fn resolve_uri(base: &str, uri: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") || base.is_empty() {
        uri.to_owned()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U\n\
        #EXT-X-VERSION:3\n\
        #EXT-X-STREAM-INF:BANDWIDTH=64000,CODECS=\"mp4a.40.2\"\n\
        hls_mp3_64.m3u8\n\
        #EXT-X-STREAM-INF:BANDWIDTH=128000,CODECS=\"mp4a.40.2\"\n\
        hls_mp3_128.m3u8\n\
        #EXT-X-STREAM-INF:BANDWIDTH=975360,CODECS=\"fLaC\"\n\
        hls_flac.m3u8\n";

    #[test]
    fn master_variants_in_order() {
        let master = parse_master(MASTER, "/hls/alice/a1");
        assert_eq!(master.variants.len(), 3);
        assert_eq!(master.variants[0].bitrate, 64_000);
        assert_eq!(master.variants[0].uri, "/hls/alice/a1/hls_mp3_64.m3u8");
        assert_eq!(master.variants[2].codecs.as_deref(), Some("fLaC"));
    }

    #[test]
    fn variant_selection_prefers_exact_then_max() {
        let master = parse_master(MASTER, "");
        assert_eq!(master.select_variant(128_000).unwrap().bitrate, 128_000);
        assert_eq!(master.select_variant(42).unwrap().bitrate, 975_360);
    }

    #[test]
    fn average_bandwidth_wins() {
        let master = parse_master(
            "#EXT-X-STREAM-INF:BANDWIDTH=90000,AVERAGE-BANDWIDTH=64000\nv.m3u8\n",
            "",
        );
        assert_eq!(master.variants[0].bitrate, 64_000);
    }

    #[test]
    fn media_playlist_ts() {
        let media = parse_media(
            "#EXTM3U\n#EXTINF:10.0,\nhls_mp3_64_0.ts\n#EXTINF:8.5,\nhls_mp3_64_1.ts\n",
            64_000,
            "",
        );
        assert!(!media.is_fmp4());
        assert_eq!(media.segments.len(), 2);
        assert_eq!(media.segments[1].duration, 8.5);
        assert_eq!(media.segments[1].uri, "hls_mp3_64_1.ts");
    }

    #[test]
    fn media_playlist_fmp4_map() {
        let media = parse_media(
            "#EXTM3U\n#EXT-X-MAP:URI=\"init.mp4\"\n#EXTINF:4.0,\nhls_flac_0.m4s\n",
            975_360,
            "/hls/bob/a2",
        );
        assert_eq!(media.init_uri.as_deref(), Some("/hls/bob/a2/init.mp4"));
        assert!(media.is_fmp4());
    }

    #[test]
    fn media_map_is_keyed_by_bitrate() {
        let mut master = parse_master(MASTER, "");
        let media = parse_media(
            "#EXTM3U\n#EXTINF:10.0,\nhls_mp3_64_0.ts\n#EXTINF:8.5,\nhls_mp3_64_1.ts\n",
            64_000,
            "",
        );
        master.media.insert(media.bitrate, media);

        let selected = master.select_variant(64_000).unwrap();
        let attached = &master.media[&selected.bitrate];
        assert_eq!(attached.segments.len(), 2);
    }

    #[test]
    fn segment_without_extinf_is_skipped() {
        let media = parse_media("#EXTM3U\norphan.ts\n#EXTINF:1.0,\nok.ts\n", 64_000, "");
        assert_eq!(media.segments.len(), 1);
        assert_eq!(media.segments[0].uri, "ok.ts");
    }

    #[test]
    fn bad_extinf_duration_drops_following_uri() {
        let media = parse_media("#EXTINF:abc,\nbad.ts\n", 64_000, "");
        assert!(media.segments.is_empty());
    }
}
