// SPDX-License-Identifier: MPL-2.0-only

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

mod modes;

pub use modes::{BufferSizeMode, LoopMode};

pub const NAME: &str = "video-file-player";
pub const CONFIG_FILE: &str = "config.ron";

/// Errors raised while reading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Settings applied to every player instance when it is created.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Setters)]
#[serde(default, deny_unknown_fields)]
#[must_use]
pub struct PlayerConfig {
    /// loop mode in effect until the host sends its own
    pub loop_mode: LoopMode,
    /// buffering strategy in effect until the host sends its own
    pub buffer_size_mode: BufferSizeMode,
    /// output queue capacity in normal buffering mode
    pub normal_queue_capacity: usize,
    /// output queue capacity in big buffering mode
    pub big_queue_capacity: usize,
    /// whether Start/Stop before Open are errors rather than ignored
    pub strict_lifecycle: bool,
    /// interval at which a host should tick the player, in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            loop_mode: LoopMode::default(),
            buffer_size_mode: BufferSizeMode::default(),
            normal_queue_capacity: 3,
            big_queue_capacity: 12,
            strict_lifecycle: true,
            tick_interval_ms: 10,
        }
    }
}

impl PlayerConfig {
    /// Output queue capacity for the given buffering mode.
    #[must_use]
    pub fn queue_capacity(&self, mode: BufferSizeMode) -> usize {
        match mode {
            BufferSizeMode::Normal => self.normal_queue_capacity,
            BufferSizeMode::Big => self.big_queue_capacity,
        }
    }

    /// Default location of the configuration file.
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(NAME).join(CONFIG_FILE))
    }

    /// Load the configuration from its default location.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let Some(path) = Self::path() else {
            tracing::debug!("no config directory available, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load the configuration from a specific RON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not parse.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_use_normal_buffering_and_no_loop() {
        let config = PlayerConfig::default();
        assert_eq!(config.loop_mode, LoopMode::Never);
        assert_eq!(config.buffer_size_mode, BufferSizeMode::Normal);
        assert_eq!(config.queue_capacity(BufferSizeMode::Normal), 3);
        assert_eq!(config.queue_capacity(BufferSizeMode::Big), 12);
        assert!(config.strict_lifecycle);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config: PlayerConfig =
            ron::from_str("(loop_mode: AfterDelay(1500), big_queue_capacity: 32)").unwrap();
        assert_eq!(config.loop_mode, LoopMode::AfterDelay(1500));
        assert_eq!(config.big_queue_capacity, 32);
        assert_eq!(config.normal_queue_capacity, 3);
        assert_eq!(config.tick_interval_ms, 10);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ron::from_str::<PlayerConfig>("(colour: 3)").is_err());
    }

    #[test]
    fn setters_chain() {
        let config = PlayerConfig::default()
            .loop_mode(LoopMode::Immediate)
            .strict_lifecycle(false);
        assert_eq!(config.loop_mode, LoopMode::Immediate);
        assert!(!config.strict_lifecycle);
    }

    #[test]
    fn load_from_reads_ron_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(buffer_size_mode: Big, strict_lifecycle: false)").unwrap();

        let config = PlayerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.buffer_size_mode, BufferSizeMode::Big);
        assert!(!config.strict_lifecycle);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(loop_mode: Sometimes)").unwrap();

        let err = PlayerConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_from_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlayerConfig::load_from(&dir.path().join("absent.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
