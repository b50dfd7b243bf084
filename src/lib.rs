// SPDX-License-Identifier: MPL-2.0-only

//! Video file player filter for a media filter graph.
//!
//! The host addresses the player through the generic [`filter::Filter`] trait
//! using numeric opcodes, or through the typed API of
//! [`player::VideoFilePlayer`]. Frames come from a pluggable
//! [`source::MediaOpener`]; the default one is backed by GStreamer.

pub mod filter;
pub mod frame_queue;
pub mod player;
pub mod source;

pub use video_file_player_config::{BufferSizeMode, LoopMode, PlayerConfig};
