// SPDX-License-Identifier: MPL-2.0-only

//! File type detection for the video file player.
//!
//! Detection relies on:
//! 1. File extension (quick filter for potentially supported files)
//! 2. Available GStreamer decoders on the current system (logged once)

use std::path::Path;

/// Video container extensions that may contain playable video.
/// These are checked case-insensitively.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4",  // MPEG-4 container (typically H.264/H.265 codec)
    "webm", // WebM container (VP8/VP9/AV1)
    "mkv",  // Matroska container (any codec)
    "avi",  // AVI container (legacy format)
    "mov",  // QuickTime container (typically H.264)
    "m4v",  // MPEG-4 Video (Apple variant of MP4)
    "ogv",  // Ogg Video container (Theora codec)
];

/// Check if a path points to a video file by extension.
#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };

    let ext_lower = ext.to_lowercase();
    VIDEO_EXTENSIONS.contains(&ext_lower.as_str())
}

#[cfg(feature = "gstreamer")]
pub use codecs::{CodecSupport, get_codec_support};

#[cfg(feature = "gstreamer")]
mod codecs {
    use std::sync::OnceLock;

    use tracing::{info, warn};

    /// Cached system codec capabilities.
    static CODEC_SUPPORT: OnceLock<CodecSupport> = OnceLock::new();

    const NVIDIA_DECODERS: &[&str] = &[
        "nvh264dec",
        "nvh265dec",
        "nvvp9dec",
        "nvav1dec",
        "nvmpegvideodec",
        "nvmpeg4videodec",
    ];

    const VAAPI_DECODERS: &[&str] = &[
        "vaapih264dec",
        "vaapih265dec",
        "vaapivp8dec",
        "vaapivp9dec",
        "vaapiav1dec",
        // New VA-API plugin element names (GStreamer 1.22+)
        "vah264dec",
        "vah265dec",
        "vavp8dec",
        "vavp9dec",
        "vaav1dec",
    ];

    /// Codec capabilities detected at runtime.
    #[derive(Debug, Clone, Default)]
    pub struct CodecSupport {
        /// GStreamer initialised and `decodebin` is available
        pub has_decodebin: bool,
        /// NVIDIA hardware decode available (NVDEC)
        pub has_nvidia: bool,
        /// AMD/Intel VAAPI decode available
        pub has_vaapi: bool,
        /// Hardware decoder element names found in the registry
        pub hw_decoders: Vec<String>,
    }

    /// Probe GStreamer for decoders. Performed once, then cached.
    pub fn get_codec_support() -> &'static CodecSupport {
        CODEC_SUPPORT.get_or_init(detect_codec_support)
    }

    fn detect_codec_support() -> CodecSupport {
        if let Err(e) = gstreamer::init() {
            warn!(error = %e, "GStreamer failed to initialise, no video can be decoded");
            return CodecSupport::default();
        }

        let mut support = CodecSupport {
            has_decodebin: gstreamer::ElementFactory::find("decodebin").is_some(),
            ..CodecSupport::default()
        };

        for decoder in NVIDIA_DECODERS {
            if gstreamer::ElementFactory::find(decoder).is_some() {
                support.has_nvidia = true;
                support.hw_decoders.push((*decoder).to_string());
            }
        }

        for decoder in VAAPI_DECODERS {
            if gstreamer::ElementFactory::find(decoder).is_some() {
                support.has_vaapi = true;
                support.hw_decoders.push((*decoder).to_string());
            }
        }

        if support.hw_decoders.is_empty() {
            info!("No hardware video decoders found, using software decoding");
        }

        info!(
            decodebin = support.has_decodebin,
            has_nvidia = support.has_nvidia,
            has_vaapi = support.has_vaapi,
            decoders = ?support.hw_decoders,
            "Detected video codec support"
        );

        support
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("test.mp4")));
        assert!(is_video_file(Path::new("test.MP4")));
        assert!(is_video_file(Path::new("test.webm")));
        assert!(is_video_file(Path::new("test.WebM")));
        assert!(is_video_file(Path::new("test.mkv")));
        assert!(is_video_file(Path::new("test.m4v")));
        assert!(is_video_file(Path::new("test.mov")));
        assert!(is_video_file(Path::new("test.ogv")));
        assert!(!is_video_file(Path::new("test.gif")));
        assert!(!is_video_file(Path::new("test.png")));
        assert!(!is_video_file(Path::new("test.wav")));
    }

    #[test]
    fn test_all_extensions_recognized() {
        for ext in VIDEO_EXTENSIONS {
            let filename = format!("clip.{ext}");
            assert!(
                is_video_file(Path::new(&filename)),
                "Extension {ext} should be recognized as video"
            );
        }
    }

    #[test]
    fn test_edge_cases() {
        // No extension
        assert!(!is_video_file(Path::new("clip")));
        assert!(!is_video_file(Path::new("/path/to/file")));

        // Hidden files and multiple dots
        assert!(is_video_file(Path::new(".hidden.mp4")));
        assert!(is_video_file(Path::new("my.video.file.mkv")));

        // Relative paths
        assert!(is_video_file(Path::new("./clip.mp4")));
        assert!(is_video_file(Path::new("../clip.avi")));
    }
}
