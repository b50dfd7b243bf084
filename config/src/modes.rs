// SPDX-License-Identifier: MPL-2.0-only

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Behaviour of the player once the source reaches end-of-stream.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LoopMode {
    /// play once and stay at the end
    #[default]
    Never,
    /// rewind as soon as end-of-stream is detected
    Immediate,
    /// rewind after the given number of milliseconds past end-of-stream
    AfterDelay(u32),
}

impl LoopMode {
    /// Interpret the integer argument of the loop method.
    ///
    /// `-1` disables looping, `0` loops immediately and any positive value is
    /// a delay in milliseconds. Anything below `-1` is rejected.
    #[must_use]
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            -1 => Some(Self::Never),
            0 => Some(Self::Immediate),
            ms if ms > 0 => Some(Self::AfterDelay(ms.unsigned_abs())),
            _ => None,
        }
    }

    /// Integer form used on the command channel.
    #[must_use]
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Never => -1,
            Self::Immediate | Self::AfterDelay(0) => 0,
            Self::AfterDelay(ms) => i32::try_from(ms).unwrap_or(i32::MAX),
        }
    }

    /// Time to wait after end-of-stream before rewinding, if looping at all.
    #[must_use]
    pub fn delay(self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::Immediate => Some(Duration::ZERO),
            Self::AfterDelay(ms) => Some(Duration::from_millis(u64::from(ms))),
        }
    }

    #[must_use]
    pub fn is_looping(self) -> bool {
        self != Self::Never
    }
}

/// Internal buffering strategy of the player.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BufferSizeMode {
    #[default]
    Normal,
    /// enlarged buffering, for sources that decode in bursts
    Big,
}

impl BufferSizeMode {
    #[must_use]
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Normal),
            1 => Some(Self::Big),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::Big => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_mode_regimes_are_distinct() {
        let never = LoopMode::from_raw(-1).unwrap();
        let immediate = LoopMode::from_raw(0).unwrap();
        let delayed = LoopMode::from_raw(250).unwrap();

        assert_eq!(never, LoopMode::Never);
        assert_eq!(immediate, LoopMode::Immediate);
        assert_eq!(delayed, LoopMode::AfterDelay(250));
        assert_ne!(never, immediate);
        assert_ne!(immediate, delayed);

        assert_eq!(never.delay(), None);
        assert_eq!(immediate.delay(), Some(Duration::ZERO));
        assert_eq!(delayed.delay(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn loop_mode_rejects_below_minus_one() {
        assert_eq!(LoopMode::from_raw(-2), None);
        assert_eq!(LoopMode::from_raw(i32::MIN), None);
    }

    #[test]
    fn loop_mode_raw_values_survive() {
        for raw in [-1, 0, 1, 500, i32::MAX] {
            assert_eq!(LoopMode::from_raw(raw).map(LoopMode::as_raw), Some(raw));
        }
    }

    #[test]
    fn buffer_size_mode_accepts_only_known_values() {
        assert_eq!(BufferSizeMode::from_raw(0), Some(BufferSizeMode::Normal));
        assert_eq!(BufferSizeMode::from_raw(1), Some(BufferSizeMode::Big));
        assert_eq!(BufferSizeMode::from_raw(2), None);
        assert_eq!(BufferSizeMode::from_raw(-1), None);
    }
}
