// SPDX-License-Identifier: MPL-2.0-only

//! The video file player filter.
//!
//! ## Architecture
//!
//! ```text
//! FrameSource (pull) → pacing against Tick → FrameQueue → host
//!                   ↘ EndOfFile events → host
//! ```
//!
//! - **Paced output**: a frame is pushed once the playback position reaches its
//!   presentation timestamp; the position only advances while playing
//! - **Media-timed end**: a lap ends when the position passes the last frame's
//!   timestamp plus one frame duration, not when the source runs dry
//! - **Seek-based looping**: at the end of a lap the source is rewound, either
//!   in the same tick or once the loop delay has elapsed since the lap ended
//! - **One event per lap**: `EndOfFile` is queued every time a lap ends

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::{debug, info, warn};
use video_file_player_config::{BufferSizeMode, LoopMode, PlayerConfig};

use super::{
    contract::{Command, Event, Method, Response, VIDEO_FILE_PLAYER_ID},
    state::PlayerState,
};
use crate::{
    filter::{EventCode, Filter, FilterDesc, FilterError, Opcode, Payload, Tick},
    frame_queue::{QueuedFrame, SharedFrameQueue, new_shared_queue},
    source::{DEFAULT_FRAME_DURATION, FrameSource, MediaOpener, Pull},
};

pub static VIDEO_FILE_PLAYER_DESC: FilterDesc = FilterDesc {
    id: VIDEO_FILE_PLAYER_ID,
    name: "VideoFilePlayer",
    text: "Plays a video file, optionally looping it",
};

/// Source currently attached to the player.
struct OpenSource {
    path: PathBuf,
    stream: Box<dyn FrameSource>,
}

/// Video file player filter.
///
/// Driven synchronously: the host issues commands and calls
/// [`process`](Self::process) on every tick, then drains events and frames.
pub struct VideoFilePlayer {
    opener: Box<dyn MediaOpener>,
    config: PlayerConfig,
    state: PlayerState,
    source: Option<OpenSource>,
    loop_mode: LoopMode,
    buffer_size_mode: BufferSizeMode,
    /// Decoded frames ready for the host.
    output: SharedFrameQueue,
    events: VecDeque<Event>,
    /// Playback position within the current lap.
    position: Duration,
    /// Time of the previous tick while playing.
    last_tick: Option<Duration>,
    /// Frame pulled from the source but not due yet.
    pending: Option<QueuedFrame>,
    /// Frames pulled since the last rewind, for stamping frames without pts.
    frames_pulled: u64,
    /// Timestamp of the last frame pulled in the current lap.
    last_pts: Option<Duration>,
    /// Position at which the current lap ends, once the source has run dry.
    lap_end: Option<Duration>,
    /// Time at which the current lap ended.
    eof_at: Option<Duration>,
    rewind_count: u32,
}

impl VideoFilePlayer {
    pub fn new(opener: Box<dyn MediaOpener>, config: PlayerConfig) -> Self {
        let output = new_shared_queue(config.queue_capacity(config.buffer_size_mode));

        Self {
            opener,
            state: PlayerState::Unopened,
            source: None,
            loop_mode: config.loop_mode,
            buffer_size_mode: config.buffer_size_mode,
            output,
            events: VecDeque::new(),
            position: Duration::ZERO,
            last_tick: None,
            pending: None,
            frames_pulled: 0,
            last_pts: None,
            lap_end: None,
            eof_at: None,
            rewind_count: 0,
            config,
        }
    }

    /// Player backed by GStreamer.
    #[cfg(feature = "gstreamer")]
    pub fn with_gstreamer(config: PlayerConfig) -> Self {
        let opener = crate::source::GstOpener::from_config(&config);
        Self::new(Box::new(opener), config)
    }

    /// Execute a typed command.
    ///
    /// # Errors
    ///
    /// See the error column of each method in [`super::contract`].
    pub fn handle_command(&mut self, command: Command) -> Result<Response, FilterError> {
        debug!(?command, state = %self.state, "Handling command");

        match command {
            Command::Open(path) => self.open(path)?,
            Command::Start => self.start()?,
            Command::Stop => self.stop()?,
            Command::Close => self.close(),
            Command::SetLoopMode(mode) => self.set_loop_mode(mode),
            Command::QueryDone => return Ok(Response::Done(self.is_done())),
            Command::SetBufferSizeMode(mode) => self.set_buffer_size_mode(mode),
        }

        Ok(Response::None)
    }

    /// Take the events queued since the last call.
    pub fn poll_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// Queue the host reads decoded frames from.
    #[must_use]
    pub fn output(&self) -> SharedFrameQueue {
        SharedFrameQueue::clone(&self.output)
    }

    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.state
    }

    #[must_use]
    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    #[must_use]
    pub fn buffer_size_mode(&self) -> BufferSizeMode {
        self.buffer_size_mode
    }

    /// Number of times the source was rewound since it was opened.
    #[must_use]
    pub fn rewind_count(&self) -> u32 {
        self.rewind_count
    }

    /// Playback position within the current lap.
    #[must_use]
    pub fn position(&self) -> Duration {
        self.position
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.source.as_ref().map(|s| s.path.as_path())
    }

    #[must_use]
    pub fn video_dimensions(&self) -> Option<(u32, u32)> {
        self.output
            .last_frame_dimensions()
            .or_else(|| self.source.as_ref()?.stream.dimensions())
    }

    /// Playback reached end-of-stream and will not loop.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.eof_at.is_some() && !self.loop_mode.is_looping()
    }

    fn open(&mut self, path: PathBuf) -> Result<(), FilterError> {
        if self.source.is_some() {
            debug!(path = %path.display(), "Open while a source is attached, closing it first");
            self.close();
        }

        let stream = self.opener.open(&path, self.buffer_size_mode).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to open video file");
        })?;

        self.reset_playback();
        self.output.reset();
        info!(path = %path.display(), "Video file opened");
        self.source = Some(OpenSource { path, stream });
        self.state = PlayerState::Opened;
        Ok(())
    }

    fn start(&mut self) -> Result<(), FilterError> {
        if !self.require_source(Method::Start)? {
            return Ok(());
        }

        if self.is_done() {
            debug!("Start after completion, restarting from the beginning");
            self.rewind()?;
        }

        if self.state == PlayerState::Playing {
            return Ok(());
        }

        self.stream_mut(Method::Start.name())?.set_playing(true)?;
        self.state = PlayerState::Playing;
        self.last_tick = None;
        info!(path = ?self.path(), "Playback started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), FilterError> {
        if !self.require_source(Method::Stop)? {
            return Ok(());
        }

        if self.state != PlayerState::Playing {
            debug!(state = %self.state, "Stop while not playing, ignoring");
            return Ok(());
        }

        self.stream_mut(Method::Stop.name())?.set_playing(false)?;
        self.state = PlayerState::Stopped;
        self.last_tick = None;
        info!(position_ms = self.position.as_millis(), "Playback stopped");
        Ok(())
    }

    fn close(&mut self) {
        match self.source.take() {
            Some(source) => info!(path = %source.path.display(), "Video file closed"),
            None => debug!(state = %self.state, "Close without a source"),
        }

        self.output.reset();
        self.output.stop();
        self.reset_playback();
        self.state = PlayerState::Closed;
    }

    fn set_loop_mode(&mut self, mode: LoopMode) {
        info!(?mode, "Loop mode set");
        self.loop_mode = mode;
    }

    fn set_buffer_size_mode(&mut self, mode: BufferSizeMode) {
        let capacity = self.config.queue_capacity(mode);
        info!(?mode, capacity, "Buffer size mode set");

        self.buffer_size_mode = mode;
        self.output.set_capacity(capacity);
        if let Some(source) = self.source.as_mut() {
            source.stream.set_buffer_size_mode(mode);
        }
    }

    /// Advance to `tick`, pushing due frames and handling the end of each lap.
    ///
    /// # Errors
    ///
    /// Propagates source errors; the player stays in its current state.
    pub fn process(&mut self, tick: &Tick) -> Result<(), FilterError> {
        if self.state != PlayerState::Playing {
            return Ok(());
        }

        let elapsed = self
            .last_tick
            .map_or(Duration::ZERO, |last| tick.time.saturating_sub(last));
        self.last_tick = Some(tick.time);

        let mut rewound = false;
        if let Some(eof_at) = self.eof_at {
            match self.loop_mode.delay() {
                None => return Ok(()),
                Some(delay) if tick.time.saturating_sub(eof_at) < delay => return Ok(()),
                Some(_) => {
                    self.rewind()?;
                    rewound = true;
                }
            }
        } else {
            self.position = self.position.saturating_add(elapsed);
        }

        loop {
            if let Some(lap_end) = self.lap_end {
                if self.position < lap_end {
                    break;
                }

                let overshoot = self.position - lap_end;
                self.end_of_stream(tick.time.saturating_sub(overshoot));

                // At most one immediate rewind per tick.
                if self.loop_mode.delay() == Some(Duration::ZERO) && !rewound {
                    self.rewind()?;
                    rewound = true;
                    self.position = carry_into_lap(overshoot, lap_end);
                    continue;
                }
                break;
            }

            let frame = match self.pending.take() {
                Some(frame) => frame,
                None => match self.stream_mut("process")?.pull()? {
                    Pull::Frame(frame) => self.stamp(frame),
                    Pull::Pending => break,
                    Pull::Eof => {
                        self.lap_end = Some(self.lap_length());
                        continue;
                    }
                },
            };

            let due = Duration::from_nanos(frame.pts_ns.unwrap_or_default());
            if due > self.position {
                self.pending = Some(frame);
                break;
            }

            self.output.push(frame);
        }

        Ok(())
    }

    fn stamp(&mut self, mut frame: QueuedFrame) -> QueuedFrame {
        if frame.pts_ns.is_none() {
            let frame_duration = self
                .source
                .as_ref()
                .map_or(DEFAULT_FRAME_DURATION, |s| s.stream.frame_duration());
            let index = u32::try_from(self.frames_pulled).unwrap_or(u32::MAX);
            let pts = frame_duration.saturating_mul(index);
            frame.pts_ns = Some(u64::try_from(pts.as_nanos()).unwrap_or(u64::MAX));
        }
        self.frames_pulled += 1;
        self.last_pts = frame.pts_ns.map(Duration::from_nanos);
        frame
    }

    /// Media length of the current lap: the last frame stays on screen for one
    /// frame duration.
    fn lap_length(&self) -> Duration {
        let Some(last_pts) = self.last_pts else {
            return Duration::ZERO;
        };
        let frame_duration = self
            .source
            .as_ref()
            .map_or(DEFAULT_FRAME_DURATION, |s| s.stream.frame_duration());
        last_pts.saturating_add(frame_duration)
    }

    fn end_of_stream(&mut self, at: Duration) {
        self.eof_at = Some(at);
        self.lap_end = None;
        self.pending = None;
        self.events.push_back(Event::EndOfFile);
        info!(
            path = ?self.path(),
            loop_mode = ?self.loop_mode,
            laps = self.rewind_count + 1,
            "End of file"
        );
    }

    fn rewind(&mut self) -> Result<(), FilterError> {
        self.stream_mut("rewind")?.rewind()?;
        self.rewind_count += 1;
        self.position = Duration::ZERO;
        self.pending = None;
        self.frames_pulled = 0;
        self.last_pts = None;
        self.lap_end = None;
        self.eof_at = None;
        debug!(rewinds = self.rewind_count, "Rewound to start");
        Ok(())
    }

    fn reset_playback(&mut self) {
        self.position = Duration::ZERO;
        self.last_tick = None;
        self.pending = None;
        self.frames_pulled = 0;
        self.last_pts = None;
        self.lap_end = None;
        self.eof_at = None;
        self.rewind_count = 0;
    }

    /// Whether a lifecycle method may proceed.
    ///
    /// Without a source this is an error in strict mode and a logged no-op otherwise.
    fn require_source(&self, method: Method) -> Result<bool, FilterError> {
        if self.source.is_some() {
            return Ok(true);
        }

        if self.config.strict_lifecycle {
            return Err(FilterError::InvalidState {
                operation: method.name(),
                state: self.state.as_str(),
            });
        }

        warn!(
            operation = method.name(),
            state = %self.state,
            "Ignoring command, no video file open"
        );
        Ok(false)
    }

    fn stream_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut Box<dyn FrameSource>, FilterError> {
        let state = self.state.as_str();
        self.source
            .as_mut()
            .map(|s| &mut s.stream)
            .ok_or(FilterError::InvalidState { operation, state })
    }
}

/// Position in the next lap after running `overshoot` past the end of a lap
/// of length `lap`.
fn carry_into_lap(overshoot: Duration, lap: Duration) -> Duration {
    if lap.is_zero() {
        return Duration::ZERO;
    }
    let nanos = overshoot.as_nanos() % lap.as_nanos();
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

impl Filter for VideoFilePlayer {
    fn desc(&self) -> &'static FilterDesc {
        &VIDEO_FILE_PLAYER_DESC
    }

    fn call_method(&mut self, opcode: Opcode, payload: Payload) -> Result<Payload, FilterError> {
        VIDEO_FILE_PLAYER_DESC.check(opcode.filter())?;
        let command = Command::from_wire(opcode, payload)?;
        self.handle_command(command).map(Response::to_payload)
    }

    fn process(&mut self, tick: &Tick) -> Result<(), FilterError> {
        VideoFilePlayer::process(self, tick)
    }

    fn drain_events(&mut self) -> Vec<(EventCode, Payload)> {
        self.poll_events().into_iter().map(Event::to_wire).collect()
    }
}

impl std::fmt::Debug for VideoFilePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFilePlayer")
            .field("state", &self.state)
            .field("path", &self.path())
            .field("loop_mode", &self.loop_mode)
            .field("buffer_size_mode", &self.buffer_size_mode)
            .field("position", &self.position)
            .field("lap_end", &self.lap_end)
            .field("eof_at", &self.eof_at)
            .field("rewind_count", &self.rewind_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UnusedOpener;

    impl MediaOpener for UnusedOpener {
        fn open(
            &self,
            path: &Path,
            _mode: BufferSizeMode,
        ) -> Result<Box<dyn FrameSource>, FilterError> {
            Err(FilterError::Format {
                path: path.to_path_buf(),
                reason: "no media".into(),
            })
        }
    }

    #[test]
    fn missing_source_errors_name_the_operation() {
        let mut player = VideoFilePlayer::new(Box::new(UnusedOpener), PlayerConfig::default());

        assert!(matches!(
            player.rewind(),
            Err(FilterError::InvalidState {
                operation: "rewind",
                state: "unopened"
            })
        ));

        player.state = PlayerState::Playing;
        assert!(matches!(
            player.process(&Tick::default()),
            Err(FilterError::InvalidState {
                operation: "process",
                state: "playing"
            })
        ));
    }

    #[test]
    fn overshoot_wraps_into_the_next_lap() {
        let lap = Duration::from_millis(40);
        assert_eq!(carry_into_lap(Duration::ZERO, lap), Duration::ZERO);
        assert_eq!(
            carry_into_lap(Duration::from_millis(90), lap),
            Duration::from_millis(10)
        );
        assert_eq!(carry_into_lap(Duration::from_millis(5), Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn position_saturates_on_extreme_ticks() {
        let mut player = VideoFilePlayer::new(Box::new(UnusedOpener), PlayerConfig::default());
        player.position = Duration::MAX - Duration::from_secs(1);
        player.last_tick = Some(Duration::ZERO);
        player.state = PlayerState::Playing;

        // Fails on the missing source, after the position has advanced.
        let _ = player.process(&Tick::at(Duration::MAX));
        assert_eq!(player.position, Duration::MAX);
    }
}
