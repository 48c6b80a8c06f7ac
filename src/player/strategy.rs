//! Source attachment strategies

use serde::Serialize;

use super::PlayerVariant;
use crate::platform::{MediaElement, StreamingProvider};

/// MIME type of HLS manifests, checked to detect native playback
pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// How a player binds its source, chosen once at first attach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttachStrategy {
    /// The element plays the manifest itself
    Native,
    /// An adaptive streaming client feeds the element
    StreamingClient,
    /// The URI is bound as an ordinary file
    PlainFile,
}

impl AttachStrategy {
    /// Pick the first usable strategy: native, then streaming client, then
    /// plain file. Simple players always bind a plain file.
    pub fn select(
        variant: PlayerVariant,
        media: &dyn MediaElement,
        provider: Option<&dyn StreamingProvider>,
    ) -> Self {
        if variant == PlayerVariant::Simple {
            return AttachStrategy::PlainFile;
        }
        if media.can_play_type(HLS_MIME).is_playable() {
            return AttachStrategy::Native;
        }
        match provider {
            Some(p) if p.is_supported() => AttachStrategy::StreamingClient,
            _ => AttachStrategy::PlainFile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MemoryMedia, MemoryStreamingProvider};

    #[test]
    fn native_wins_over_streaming_client() {
        let media = MemoryMedia::native_hls();
        let provider = MemoryStreamingProvider::with_default_ladder();
        let s = AttachStrategy::select(PlayerVariant::Adaptive, &media, Some(&provider));
        assert_eq!(s, AttachStrategy::Native);
    }

    #[test]
    fn streaming_client_when_supported() {
        let media = MemoryMedia::new();
        let provider = MemoryStreamingProvider::with_default_ladder();
        let s = AttachStrategy::select(PlayerVariant::Adaptive, &media, Some(&provider));
        assert_eq!(s, AttachStrategy::StreamingClient);
    }

    #[test]
    fn unsupported_or_missing_client_falls_back_to_plain_file() {
        let media = MemoryMedia::new();
        let provider = MemoryStreamingProvider::with_default_ladder();
        provider.set_supported(false);
        assert_eq!(
            AttachStrategy::select(PlayerVariant::Adaptive, &media, Some(&provider)),
            AttachStrategy::PlainFile
        );
        assert_eq!(
            AttachStrategy::select(PlayerVariant::Adaptive, &media, None),
            AttachStrategy::PlainFile
        );
    }

    #[test]
    fn simple_players_always_bind_plain_files() {
        let media = MemoryMedia::native_hls();
        assert_eq!(
            AttachStrategy::select(PlayerVariant::Simple, &media, None),
            AttachStrategy::PlainFile
        );
    }
}
