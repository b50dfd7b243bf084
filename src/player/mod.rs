// SPDX-License-Identifier: MPL-2.0-only

//! Video file player filter.
//!
//! Opens a video file through a [`MediaOpener`](crate::source::MediaOpener),
//! plays it against the host's clock and reports end-of-file.
//!
//! # Module Structure
//!
//! - [`contract`]: method and event codes, typed commands and their wire form
//! - [`state`]: lifecycle states
//! - [`video_file_player`]: the filter itself
//!
//! # Loop Modes
//!
//! | Raw value | Mode | On end-of-stream |
//! |-----------|------|------------------|
//! | `-1` | `Never` | stay at the end, `QueryDone` reports completion |
//! | `0` | `Immediate` | rewind within the same tick |
//! | `n > 0` | `AfterDelay(n)` | rewind once `n` ms have passed since end-of-stream |

pub mod contract;
pub mod state;
mod video_file_player;

pub use contract::{Command, EVENTS, Event, Method, Response, VIDEO_FILE_PLAYER_ID};
pub use state::PlayerState;
pub use video_file_player::{VIDEO_FILE_PLAYER_DESC, VideoFilePlayer};
