// SPDX-License-Identifier: MPL-2.0-only

use std::fmt;

/// Lifecycle of a player instance.
///
/// ```text
/// Unopened --Open--> Opened --Start--> Playing <--Stop/Start--> Stopped
///    any --Close--> Closed --Open--> Opened
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlayerState {
    #[default]
    Unopened,
    /// A source is open but playback was never started.
    Opened,
    Playing,
    Stopped,
    Closed,
}

impl PlayerState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PlayerState::Unopened => "unopened",
            PlayerState::Opened => "opened",
            PlayerState::Playing => "playing",
            PlayerState::Stopped => "stopped",
            PlayerState::Closed => "closed",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
