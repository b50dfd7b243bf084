// SPDX-License-Identifier: MPL-2.0-only

//! Where the player's frames come from.
//!
//! The player never decodes anything itself. It asks a [`MediaOpener`] for a
//! [`FrameSource`] on `Open` and pulls frames from it on every tick.
//!
//! - [`detection`]: file type detection utilities
//! - `gst`: GStreamer-backed source (feature `gstreamer`)

mod detection;
#[cfg(feature = "gstreamer")]
mod gst;

use std::{path::Path, time::Duration};

use video_file_player_config::BufferSizeMode;

use crate::{filter::FilterError, frame_queue::QueuedFrame};

pub use detection::{VIDEO_EXTENSIONS, is_video_file};
#[cfg(feature = "gstreamer")]
pub use detection::{CodecSupport, get_codec_support};
#[cfg(feature = "gstreamer")]
pub use gst::{GstOpener, GstSource};

/// Default frame duration if the source cannot report one (60 FPS).
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(16);

/// Outcome of asking a source for its next frame.
#[derive(Debug)]
pub enum Pull {
    Frame(QueuedFrame),
    /// Nothing decoded yet; ask again on a later tick.
    Pending,
    /// The stream has no further data until it is rewound.
    Eof,
}

/// An opened media stream producing decoded frames.
pub trait FrameSource: Send {
    /// Fetch the next decoded frame without blocking.
    fn pull(&mut self) -> Result<Pull, FilterError>;

    /// Go back to the first frame.
    fn rewind(&mut self) -> Result<(), FilterError>;

    /// Resume or pause decoding.
    fn set_playing(&mut self, playing: bool) -> Result<(), FilterError> {
        let _ = playing;
        Ok(())
    }

    fn set_buffer_size_mode(&mut self, mode: BufferSizeMode) {
        let _ = mode;
    }

    /// Nominal duration of one frame.
    fn frame_duration(&self) -> Duration {
        DEFAULT_FRAME_DURATION
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Turns a path into a [`FrameSource`].
pub trait MediaOpener: Send {
    /// # Errors
    ///
    /// [`FilterError::Io`] if the path cannot be read, [`FilterError::Format`]
    /// if its content cannot be played.
    fn open(&self, path: &Path, mode: BufferSizeMode) -> Result<Box<dyn FrameSource>, FilterError>;
}

/// Make sure a path names a readable regular file.
///
/// # Errors
///
/// Returns [`FilterError::Io`] when the metadata lookup fails and
/// [`FilterError::Format`] when the path is not a file.
pub fn check_readable(path: &Path) -> Result<(), FilterError> {
    let metadata = std::fs::metadata(path).map_err(|source| FilterError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if !metadata.is_file() {
        return Err(FilterError::Format {
            path: path.to_path_buf(),
            reason: "not a regular file".into(),
        });
    }

    std::fs::File::open(path).map_err(|source| FilterError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
