// SPDX-License-Identifier: MPL-2.0-only

//! `vfplay`: drives a single video file player from a calloop timer.
//!
//! The host ticks the player at the configured interval, drains its frames and
//! events, and exits once playback is done or a signal arrives.

use std::{path::PathBuf, time::Duration, time::Instant};

use clap::Parser;
use eyre::eyre;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use video_file_player::{
    PlayerConfig,
    filter::{Filter, Payload, Tick},
    player::{Command, Event, Method, VideoFilePlayer},
};

#[derive(Parser)]
#[command(name = "vfplay")]
#[command(about = "Play a video file through the video file player filter", long_about = None)]
#[command(version)]
struct Cli {
    /// Video file to play
    path: PathBuf,

    /// -1 plays once, 0 loops immediately, N > 0 loops N ms after end of file
    #[arg(long = "loop", allow_hyphen_values = true)]
    loop_after: Option<i32>,

    /// Use the enlarged frame buffer
    #[arg(long)]
    big_buffer: bool,

    /// Read settings from this RON file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exit after this many end-of-file events, even when looping
    #[arg(long)]
    max_loops: Option<u32>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

/// Event loop state.
struct Host {
    player: VideoFilePlayer,
    started: Instant,
    interval: Duration,
    max_loops: Option<u32>,
    end_of_file_count: u32,
    frames_rendered: u64,
    logged_dimensions: bool,
    exit: bool,
}

impl Host {
    /// One timer beat. Returns `false` once the host should stop ticking.
    fn on_tick(&mut self) -> bool {
        let tick = Tick::at(self.started.elapsed());

        if let Err(e) = Filter::process(&mut self.player, &tick) {
            error!(error = %e, "Playback failed");
            self.shutdown();
            return false;
        }

        for event in self.player.poll_events() {
            match event {
                Event::EndOfFile => {
                    self.end_of_file_count += 1;
                    info!(
                        count = self.end_of_file_count,
                        frames = self.frames_rendered,
                        "End of file"
                    );
                }
            }
        }

        let output = self.player.output();
        while output.try_pop().is_some() {
            self.frames_rendered += 1;
        }

        if !self.logged_dimensions {
            if let Some((width, height)) = self.player.video_dimensions() {
                info!(width, height, "Video dimensions");
                self.logged_dimensions = true;
            }
        }

        let loops_exhausted = self
            .max_loops
            .is_some_and(|max| self.end_of_file_count >= max);

        if self.player.is_done() || loops_exhausted {
            info!(
                frames = self.frames_rendered,
                elapsed_ms = tick.time.as_millis(),
                "Playback finished"
            );
            self.shutdown();
            return false;
        }

        true
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.player.handle_command(Command::Close) {
            warn!(error = %e, "Failed to close player");
        }
        self.exit = true;
    }
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match cli.config.as_deref() {
        Some(path) => PlayerConfig::load_from(path)?,
        None => PlayerConfig::load().unwrap_or_else(|err| {
            warn!(error = %err, "Config file error, falling back to defaults");
            PlayerConfig::default()
        }),
    };

    let interval = Duration::from_millis(config.tick_interval_ms.max(1));
    let mut player = VideoFilePlayer::with_gstreamer(config);

    // Numeric arguments go through the generic method channel, like any host would send them.
    if let Some(raw) = cli.loop_after {
        player.call_method(Method::SetLoopMode.opcode(), Payload::Int(raw))?;
    }
    if cli.big_buffer {
        player.call_method(Method::SetBufferSizeMode.opcode(), Payload::Int(1))?;
    }

    player.handle_command(Command::Open(cli.path.clone()))?;
    player.handle_command(Command::Start)?;

    let mut event_loop = calloop::EventLoop::<Host>::try_new()?;
    let handle = event_loop.handle();

    handle
        .insert_source(
            calloop::timer::Timer::immediate(),
            |_, _, host: &mut Host| {
                if host.on_tick() {
                    calloop::timer::TimeoutAction::ToDuration(host.interval)
                } else {
                    calloop::timer::TimeoutAction::Drop
                }
            },
        )
        .map_err(|err| eyre!("{}", err))?;

    let signals = calloop::signals::Signals::new(&[
        calloop::signals::Signal::SIGINT,
        calloop::signals::Signal::SIGTERM,
    ])?;
    handle
        .insert_source(signals, |event, _, host: &mut Host| {
            info!(signal = ?event.signal(), "Received signal, closing");
            host.shutdown();
        })
        .map_err(|err| eyre!("{}", err))?;

    let mut host = Host {
        player,
        started: Instant::now(),
        interval,
        max_loops: cli.max_loops,
        end_of_file_count: 0,
        frames_rendered: 0,
        logged_dimensions: false,
        exit: false,
    };

    info!(path = %cli.path.display(), interval_ms = interval.as_millis(), "Playing");

    while !host.exit {
        event_loop.dispatch(None, &mut host)?;
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
