// SPDX-License-Identifier: MPL-2.0-only

use std::{io, path::PathBuf};

use super::opcode::{ArgType, EventCode, FilterId, Opcode};

/// Everything a filter can report back through the command channel.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a playable video: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("{operation} is not allowed while the filter is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("{operation} does not accept {value}")]
    InvalidArgument { operation: &'static str, value: i32 },

    #[error("method {opcode} expects a {expected} argument, got {found}")]
    ArgumentMismatch {
        opcode: Opcode,
        expected: ArgType,
        found: ArgType,
    },

    #[error("unknown method {0}")]
    UnknownMethod(Opcode),

    #[error("unknown event {0}")]
    UnknownEvent(EventCode),

    #[error("code belongs to filter {found}, not {expected}")]
    WrongFilter { expected: FilterId, found: FilterId },
}
