// SPDX-License-Identifier: MPL-2.0-only

//! GStreamer-backed frame source.
//!
//! ```text
//! filesrc → decodebin → videoconvert (BGRx) → appsink
//! ```
//!
//! - `decodebin` auto-selects the best available decoder, hardware or software
//! - the appsink runs with `sync=false drop=false`: pacing happens in the
//!   player, and a full appsink back-pressures the decoder instead of losing frames
//! - `max-buffers` follows the buffer-size mode
//! - looping is a flushing seek to zero

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use gstreamer::prelude::*;
use tracing::{debug, info, warn};
use video_file_player_config::{BufferSizeMode, PlayerConfig};

use super::{
    DEFAULT_FRAME_DURATION, FrameSource, MediaOpener, Pull, check_readable,
    detection::{get_codec_support, is_video_file},
};
use crate::{filter::FilterError, frame_queue::QueuedFrame};

/// How long to wait for the pipeline to preroll before declaring the file unplayable.
const PREROLL_TIMEOUT_MS: u64 = 2000;

/// Opens files through GStreamer.
#[derive(Debug, Clone)]
pub struct GstOpener {
    normal_buffers: u32,
    big_buffers: u32,
}

impl GstOpener {
    /// Size the appsink after the player's output queue capacities.
    #[must_use]
    pub fn from_config(config: &PlayerConfig) -> Self {
        let buffers = |mode| u32::try_from(config.queue_capacity(mode) + 1).unwrap_or(u32::MAX);
        Self {
            normal_buffers: buffers(BufferSizeMode::Normal),
            big_buffers: buffers(BufferSizeMode::Big),
        }
    }

    fn buffers_for(&self, mode: BufferSizeMode) -> u32 {
        match mode {
            BufferSizeMode::Normal => self.normal_buffers,
            BufferSizeMode::Big => self.big_buffers,
        }
    }
}

impl Default for GstOpener {
    fn default() -> Self {
        Self::from_config(&PlayerConfig::default())
    }
}

impl MediaOpener for GstOpener {
    fn open(&self, path: &Path, mode: BufferSizeMode) -> Result<Box<dyn FrameSource>, FilterError> {
        check_readable(path)?;

        if !is_video_file(path) {
            return Err(FilterError::Format {
                path: path.to_path_buf(),
                reason: "unsupported file extension".into(),
            });
        }

        let source = GstSource::new(path, self.clone(), mode)?;
        Ok(Box::new(source))
    }
}

/// A prerolled GStreamer pipeline ending in an appsink.
pub struct GstSource {
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    source_path: PathBuf,
    opener: GstOpener,
    frame_duration: Duration,
    dimensions: Option<(u32, u32)>,
}

impl GstSource {
    /// Build the pipeline and preroll it in `PAUSED`.
    ///
    /// # Errors
    ///
    /// [`FilterError::Format`] if GStreamer cannot build or preroll a pipeline
    /// for the file.
    pub fn new(path: &Path, opener: GstOpener, mode: BufferSizeMode) -> Result<Self, FilterError> {
        let format_error = |reason: String| FilterError::Format {
            path: path.to_path_buf(),
            reason,
        };

        let support = get_codec_support();
        if !support.has_decodebin {
            return Err(format_error("GStreamer decodebin is unavailable".into()));
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| format_error("path is not valid UTF-8".into()))?;
        let escaped_path = path_str.replace('\\', "\\\\").replace('"', "\\\"");

        let pipeline_str = format!(
            concat!(
                "filesrc location=\"{path}\" ! ",
                "decodebin ! ",
                "videoconvert ! ",
                "video/x-raw,format=BGRx ! ",
                "appsink name=sink sync=false max-buffers={buffers} drop=false"
            ),
            path = escaped_path,
            buffers = opener.buffers_for(mode),
        );

        debug!(pipeline = %pipeline_str, "Creating GStreamer pipeline");

        let pipeline = gstreamer::parse::launch(&pipeline_str)
            .map_err(|e| format_error(e.to_string()))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| format_error("launch line did not produce a pipeline".into()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| format_error("pipeline has no appsink".into()))?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| format_error("element 'sink' is not an AppSink".into()))?;

        let mut source = Self {
            pipeline,
            appsink,
            source_path: path.to_path_buf(),
            opener,
            frame_duration: DEFAULT_FRAME_DURATION,
            dimensions: None,
        };

        source.preroll().map_err(format_error)?;
        source.detect_video_info();

        info!(
            path = %path.display(),
            dimensions = ?source.dimensions,
            frame_ms = source.frame_duration.as_millis(),
            "Opened video file"
        );

        Ok(source)
    }

    fn preroll(&self) -> Result<(), String> {
        if self.pipeline.set_state(gstreamer::State::Paused).is_err() {
            return Err(self
                .bus_error()
                .unwrap_or_else(|| "pipeline refused to pause".into()));
        }

        let (result, state, _) = self
            .pipeline
            .state(gstreamer::ClockTime::from_mseconds(PREROLL_TIMEOUT_MS));

        if result.is_err() || state != gstreamer::State::Paused {
            return Err(self
                .bus_error()
                .unwrap_or_else(|| format!("pipeline did not preroll (state {state:?})")));
        }

        Ok(())
    }

    /// First error message waiting on the bus, if any.
    fn bus_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        while let Some(msg) = bus.pop() {
            if let gstreamer::MessageView::Error(err) = msg.view() {
                return Some(err.error().to_string());
            }
        }
        None
    }

    fn detect_video_info(&mut self) {
        let Some(caps) = self
            .appsink
            .static_pad("sink")
            .and_then(|pad| pad.current_caps())
        else {
            debug!("No negotiated caps on appsink, keeping default frame duration");
            return;
        };

        let Ok(video_info) = gstreamer_video::VideoInfo::from_caps(&caps) else {
            return;
        };

        self.dimensions = Some((video_info.width(), video_info.height()));

        let fps = video_info.fps();
        if fps.numer() > 0 && fps.denom() > 0 {
            self.frame_duration =
                Duration::from_secs_f64(f64::from(fps.denom()) / f64::from(fps.numer()));
            debug!(fps = format!("{}/{}", fps.numer(), fps.denom()), "Detected video framerate");
        }
    }

    /// Drain the bus, turning pipeline errors into decode errors.
    fn check_bus(&self) -> Result<(), FilterError> {
        let Some(bus) = self.pipeline.bus() else {
            return Ok(());
        };

        while let Some(msg) = bus.pop() {
            use gstreamer::MessageView;

            match msg.view() {
                MessageView::Error(err) => {
                    return Err(FilterError::Decode(format!(
                        "{}: {}",
                        err.src()
                            .map(|s| s.path_string().to_string())
                            .unwrap_or_default(),
                        err.error()
                    )));
                }
                MessageView::Warning(warning) => {
                    warn!(
                        src = ?warning.src().map(|s| s.path_string()),
                        error = %warning.error(),
                        "GStreamer pipeline warning"
                    );
                }
                MessageView::StateChanged(state) => {
                    if state.src().map(|s| s == &self.pipeline).unwrap_or(false) {
                        debug!(old = ?state.old(), new = ?state.current(), "Pipeline state changed");
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn frame_from_sample(&mut self, sample: &gstreamer::Sample) -> Option<QueuedFrame> {
        let buffer = sample.buffer()?;
        let caps = sample.caps()?;
        let video_info = gstreamer_video::VideoInfo::from_caps(caps).ok()?;

        let width = video_info.width();
        let height = video_info.height();
        self.dimensions = Some((width, height));

        let pts_ns = buffer.pts().map(|p| p.nseconds());
        let Ok(map) = buffer.map_readable() else {
            tracing::trace!("Skipped frame: buffer map failed");
            return None;
        };

        Some(QueuedFrame::new(map.as_slice().to_vec(), width, height, pts_ns))
    }
}

impl FrameSource for GstSource {
    fn pull(&mut self) -> Result<Pull, FilterError> {
        self.check_bus()?;

        if let Some(sample) = self.appsink.try_pull_sample(gstreamer::ClockTime::ZERO) {
            return Ok(self
                .frame_from_sample(&sample)
                .map_or(Pull::Pending, Pull::Frame));
        }

        if self.appsink.is_eos() {
            return Ok(Pull::Eof);
        }

        Ok(Pull::Pending)
    }

    fn rewind(&mut self) -> Result<(), FilterError> {
        let seek_flags = gstreamer::SeekFlags::FLUSH | gstreamer::SeekFlags::KEY_UNIT;

        self.pipeline
            .seek_simple(seek_flags, gstreamer::ClockTime::ZERO)
            .map_err(|e| FilterError::Decode(format!("seek to start failed: {e}")))?;

        debug!(path = %self.source_path.display(), "Seeked to start");
        Ok(())
    }

    fn set_playing(&mut self, playing: bool) -> Result<(), FilterError> {
        let target = if playing {
            gstreamer::State::Playing
        } else {
            gstreamer::State::Paused
        };

        self.pipeline
            .set_state(target)
            .map_err(|e| FilterError::Decode(format!("failed to enter {target:?}: {e:?}")))?;
        Ok(())
    }

    fn set_buffer_size_mode(&mut self, mode: BufferSizeMode) {
        self.appsink.set_max_buffers(self.opener.buffers_for(mode));
    }

    fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }
}

impl Drop for GstSource {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(?e, path = %self.source_path.display(), "Failed to stop video pipeline on drop");
        }
    }
}
