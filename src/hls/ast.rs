use std::collections::BTreeMap;

/// One `#EXT-X-STREAM-INF` entry of a master playlist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantStream {
    /// Bits per second; keys the media-playlist map.
    pub bitrate: u64,
    /// Resolved URI (absolute, or joined onto the master's base).
    pub uri: String,
    pub resolution: Option<String>,
    pub codecs: Option<String>,
}

/// Master playlist: the ordered variant list plus media playlists keyed by
/// bitrate. Variants and map entries share nothing but the bitrate key, so
/// no back-references are needed.
#[derive(Debug, Clone, Default)]
pub struct MasterPlaylist {
    pub variants: Vec<VariantStream>,
    pub media: BTreeMap<u64, MediaPlaylist>,
}

impl MasterPlaylist {
    /// Picks the variant with the exact bitrate, or the highest one when no
    /// exact match exists.
    pub fn select_variant(&self, desired: u64) -> Option<&VariantStream> {
        self.variants
            .iter()
            .find(|v| v.bitrate == desired)
            .or_else(|| self.variants.iter().max_by_key(|v| v.bitrate))
    }
}

/// Media playlist at a single bitrate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaPlaylist {
    pub bitrate: u64,
    pub segments: Vec<Segment>,
    /// `#EXT-X-MAP` URI; present exactly when the segments are fMP4.
    pub init_uri: Option<String>,
}

impl MediaPlaylist {
    pub fn is_fmp4(&self) -> bool {
        self.init_uri.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Seconds.
    pub duration: f32,
    pub uri: String,
}
