// SPDX-License-Identifier: MPL-2.0-only

//! Command and event contract of the video file player.
//!
//! | Index | Method              | Argument        |
//! |-------|---------------------|-----------------|
//! | 0     | `Open`              | path (string)   |
//! | 1     | `Start`             | none            |
//! | 2     | `Stop`              | none            |
//! | 3     | `Close`             | none            |
//! | 4     | `SetLoopMode`       | int             |
//! | 5     | `QueryDone`         | int (returned)  |
//! | 6     | `SetBufferSizeMode` | int             |
//!
//! | Index | Event       | Argument |
//! |-------|-------------|----------|
//! | 0     | `EndOfFile` | none     |

use std::path::PathBuf;

use video_file_player_config::{BufferSizeMode, LoopMode};

use crate::filter::{ArgType, EventCode, FilterError, FilterId, Opcode, Payload};

/// Filter id shared by every code of the video file player.
pub const VIDEO_FILE_PLAYER_ID: FilterId = FilterId(0x0056);

/// Methods of the video file player, in index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Open,
    Start,
    Stop,
    Close,
    SetLoopMode,
    QueryDone,
    SetBufferSizeMode,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Open,
        Method::Start,
        Method::Stop,
        Method::Close,
        Method::SetLoopMode,
        Method::QueryDone,
        Method::SetBufferSizeMode,
    ];

    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Method::Open => 0,
            Method::Start => 1,
            Method::Stop => 2,
            Method::Close => 3,
            Method::SetLoopMode => 4,
            Method::QueryDone => 5,
            Method::SetBufferSizeMode => 6,
        }
    }

    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Argument slot encoded in the opcode.
    ///
    /// For [`Method::QueryDone`] the slot carries the result back.
    #[must_use]
    pub const fn arg_type(self) -> ArgType {
        match self {
            Method::Open => ArgType::Str,
            Method::Start | Method::Stop | Method::Close => ArgType::None,
            Method::SetLoopMode | Method::QueryDone | Method::SetBufferSizeMode => ArgType::Int,
        }
    }

    /// Whether the argument slot is filled by the filter rather than the caller.
    #[must_use]
    pub const fn returns_value(self) -> bool {
        matches!(self, Method::QueryDone)
    }

    #[must_use]
    pub const fn opcode(self) -> Opcode {
        Opcode::new(VIDEO_FILE_PLAYER_ID, self.index(), self.arg_type())
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Method::Open => "open",
            Method::Start => "start",
            Method::Stop => "stop",
            Method::Close => "close",
            Method::SetLoopMode => "set_loop_mode",
            Method::QueryDone => "query_done",
            Method::SetBufferSizeMode => "set_buffer_size_mode",
        }
    }

    /// Resolve an opcode, checking filter id, index and argument size.
    ///
    /// # Errors
    ///
    /// Fails with [`FilterError::WrongFilter`], [`FilterError::UnknownMethod`] or
    /// [`FilterError::ArgumentMismatch`].
    pub fn from_opcode(opcode: Opcode) -> Result<Self, FilterError> {
        if opcode.filter() != VIDEO_FILE_PLAYER_ID {
            return Err(FilterError::WrongFilter {
                expected: VIDEO_FILE_PLAYER_ID,
                found: opcode.filter(),
            });
        }

        let method =
            Self::from_index(opcode.index()).ok_or(FilterError::UnknownMethod(opcode))?;

        if opcode.arg_size() != method.arg_type().size() {
            return Err(FilterError::UnknownMethod(opcode));
        }

        Ok(method)
    }
}

/// An operation sent to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(PathBuf),
    Start,
    Stop,
    Close,
    SetLoopMode(LoopMode),
    QueryDone,
    SetBufferSizeMode(BufferSizeMode),
}

impl Command {
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Command::Open(_) => Method::Open,
            Command::Start => Method::Start,
            Command::Stop => Method::Stop,
            Command::Close => Method::Close,
            Command::SetLoopMode(_) => Method::SetLoopMode,
            Command::QueryDone => Method::QueryDone,
            Command::SetBufferSizeMode(_) => Method::SetBufferSizeMode,
        }
    }

    /// Encode as an `(opcode, payload)` pair for the command channel.
    ///
    /// # Errors
    ///
    /// [`FilterError::Format`] if an `Open` path is not valid UTF-8, since the
    /// channel carries paths as strings.
    pub fn to_wire(&self) -> Result<(Opcode, Payload), FilterError> {
        let payload = match self {
            Command::Open(path) => {
                let text = path.to_str().ok_or_else(|| FilterError::Format {
                    path: path.clone(),
                    reason: "path is not valid UTF-8".into(),
                })?;
                Payload::Str(text.to_owned())
            }
            Command::SetLoopMode(mode) => Payload::Int(mode.as_raw()),
            Command::SetBufferSizeMode(mode) => Payload::Int(mode.as_raw()),
            Command::Start | Command::Stop | Command::Close | Command::QueryDone => Payload::None,
        };
        Ok((self.method().opcode(), payload))
    }

    /// Decode an `(opcode, payload)` pair received on the command channel.
    ///
    /// # Errors
    ///
    /// Fails if the opcode is not a player method, if the payload does not have
    /// the method's argument shape, or if an integer argument is out of range.
    pub fn from_wire(opcode: Opcode, payload: Payload) -> Result<Self, FilterError> {
        let method = Method::from_opcode(opcode)?;

        let mismatch = |found: &Payload| FilterError::ArgumentMismatch {
            opcode,
            expected: method.arg_type(),
            found: found.arg_type(),
        };

        // Out-parameters may arrive empty or holding a stale value.
        if method.returns_value() {
            return match payload {
                Payload::None | Payload::Int(_) => Ok(Command::QueryDone),
                other => Err(mismatch(&other)),
            };
        }

        match (method, payload) {
            (Method::Open, Payload::Str(path)) => Ok(Command::Open(PathBuf::from(path))),
            (Method::Start, Payload::None) => Ok(Command::Start),
            (Method::Stop, Payload::None) => Ok(Command::Stop),
            (Method::Close, Payload::None) => Ok(Command::Close),
            (Method::SetLoopMode, Payload::Int(value)) => LoopMode::from_raw(value)
                .map(Command::SetLoopMode)
                .ok_or(FilterError::InvalidArgument {
                    operation: method.name(),
                    value,
                }),
            (Method::SetBufferSizeMode, Payload::Int(value)) => BufferSizeMode::from_raw(value)
                .map(Command::SetBufferSizeMode)
                .ok_or(FilterError::InvalidArgument {
                    operation: method.name(),
                    value,
                }),
            (_, other) => Err(mismatch(&other)),
        }
    }
}

/// Result of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    None,
    Done(bool),
}

impl Response {
    #[must_use]
    pub fn to_payload(self) -> Payload {
        match self {
            Response::None => Payload::None,
            Response::Done(done) => Payload::Int(i32::from(done)),
        }
    }
}

/// Notification the player emits toward its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    EndOfFile,
}

/// Event kinds, in index order.
pub const EVENTS: [Event; 1] = [Event::EndOfFile];

impl Event {
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Event::EndOfFile => 0,
        }
    }

    #[must_use]
    pub const fn code(self) -> EventCode {
        EventCode::new(VIDEO_FILE_PLAYER_ID, self.index(), ArgType::None)
    }

    #[must_use]
    pub fn to_wire(self) -> (EventCode, Payload) {
        (self.code(), Payload::None)
    }

    /// # Errors
    ///
    /// Fails if the code is not a player event or the payload is not empty.
    pub fn from_wire(code: EventCode, payload: Payload) -> Result<Self, FilterError> {
        if code.filter() != VIDEO_FILE_PLAYER_ID {
            return Err(FilterError::WrongFilter {
                expected: VIDEO_FILE_PLAYER_ID,
                found: code.filter(),
            });
        }

        let event = EVENTS
            .iter()
            .copied()
            .find(|event| event.code() == code)
            .ok_or(FilterError::UnknownEvent(code))?;

        match payload {
            Payload::None => Ok(event),
            other => Err(FilterError::ArgumentMismatch {
                opcode: Opcode::from_raw(code.raw()),
                expected: ArgType::None,
                found: other.arg_type(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn method_opcodes_are_unique() {
        let codes: HashSet<u32> = Method::ALL.iter().map(|m| m.opcode().raw()).collect();
        assert_eq!(codes.len(), Method::ALL.len());

        let indexes: HashSet<u8> = Method::ALL.iter().map(|m| m.index()).collect();
        assert_eq!(indexes.len(), Method::ALL.len());
    }

    #[test]
    fn event_codes_are_unique() {
        let codes: HashSet<u32> = EVENTS.iter().map(|e| e.code().raw()).collect();
        assert_eq!(codes.len(), EVENTS.len());
    }

    #[test]
    fn every_code_carries_the_player_id() {
        for method in Method::ALL {
            assert_eq!(method.opcode().filter(), VIDEO_FILE_PLAYER_ID);
            assert_eq!(Method::from_opcode(method.opcode()).unwrap(), method);
        }
        assert_eq!(Event::EndOfFile.code().filter(), VIDEO_FILE_PLAYER_ID);
    }

    #[test]
    fn argument_shapes_are_fixed() {
        assert_eq!(Method::Open.arg_type(), ArgType::Str);
        assert_eq!(Method::Start.arg_type(), ArgType::None);
        assert_eq!(Method::Stop.arg_type(), ArgType::None);
        assert_eq!(Method::Close.arg_type(), ArgType::None);
        assert_eq!(Method::SetLoopMode.arg_type(), ArgType::Int);
        assert_eq!(Method::QueryDone.arg_type(), ArgType::Int);
        assert!(Method::QueryDone.returns_value());
        assert_eq!(Method::SetBufferSizeMode.arg_type(), ArgType::Int);
    }

    #[test]
    fn commands_decode_from_their_own_encoding() {
        let commands = [
            Command::Open(PathBuf::from("clip.mp4")),
            Command::Start,
            Command::Stop,
            Command::Close,
            Command::SetLoopMode(LoopMode::Never),
            Command::SetLoopMode(LoopMode::Immediate),
            Command::SetLoopMode(LoopMode::AfterDelay(400)),
            Command::QueryDone,
            Command::SetBufferSizeMode(BufferSizeMode::Big),
        ];

        for command in commands {
            let (opcode, payload) = command.to_wire().unwrap();
            assert_eq!(Command::from_wire(opcode, payload).unwrap(), command);
        }
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_open_path_is_not_encoded() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let path = PathBuf::from(OsStr::from_bytes(b"clip\xff.mp4"));
        let err = Command::Open(path.clone()).to_wire().unwrap_err();
        assert!(matches!(err, FilterError::Format { path: p, .. } if p == path));
    }

    #[test]
    fn wrong_payload_is_rejected() {
        let err = Command::from_wire(Method::Open.opcode(), Payload::Int(1)).unwrap_err();
        assert!(matches!(
            err,
            FilterError::ArgumentMismatch {
                expected: ArgType::Str,
                found: ArgType::Int,
                ..
            }
        ));

        let err = Command::from_wire(Method::Start.opcode(), Payload::Str("x".into())).unwrap_err();
        assert!(matches!(err, FilterError::ArgumentMismatch { .. }));

        let err = Command::from_wire(Method::SetLoopMode.opcode(), Payload::None).unwrap_err();
        assert!(matches!(err, FilterError::ArgumentMismatch { .. }));
    }

    #[test]
    fn query_done_accepts_empty_or_int_slot() {
        let opcode = Method::QueryDone.opcode();
        assert_eq!(
            Command::from_wire(opcode, Payload::None).unwrap(),
            Command::QueryDone
        );
        assert_eq!(
            Command::from_wire(opcode, Payload::Int(-7)).unwrap(),
            Command::QueryDone
        );
        assert!(Command::from_wire(opcode, Payload::Str(String::new())).is_err());
    }

    #[test]
    fn out_of_range_integers_are_invalid_arguments() {
        let err = Command::from_wire(Method::SetLoopMode.opcode(), Payload::Int(-5)).unwrap_err();
        assert!(matches!(err, FilterError::InvalidArgument { value: -5, .. }));

        let err =
            Command::from_wire(Method::SetBufferSizeMode.opcode(), Payload::Int(9)).unwrap_err();
        assert!(matches!(err, FilterError::InvalidArgument { value: 9, .. }));
    }

    #[test]
    fn foreign_and_unknown_opcodes_are_rejected() {
        let foreign = Opcode::new(FilterId(0x0001), 0, ArgType::Str);
        assert!(matches!(
            Command::from_wire(foreign, Payload::Str("a".into())),
            Err(FilterError::WrongFilter { .. })
        ));

        let unknown = Opcode::new(VIDEO_FILE_PLAYER_ID, 42, ArgType::None);
        assert!(matches!(
            Command::from_wire(unknown, Payload::None),
            Err(FilterError::UnknownMethod(_))
        ));

        // Right index, wrong argument size.
        let resized = Opcode::new(VIDEO_FILE_PLAYER_ID, Method::Start.index(), ArgType::Int);
        assert!(matches!(
            Command::from_wire(resized, Payload::None),
            Err(FilterError::UnknownMethod(_))
        ));
    }

    #[test]
    fn end_of_file_has_empty_payload() {
        let (code, payload) = Event::EndOfFile.to_wire();
        assert_eq!(payload, Payload::None);
        assert_eq!(code.arg_size(), 0);
        assert_eq!(code.index(), 0);
        assert_eq!(Event::from_wire(code, payload).unwrap(), Event::EndOfFile);
        assert!(Event::from_wire(code, Payload::Int(1)).is_err());
    }

    #[test]
    fn done_response_is_an_integer_flag() {
        assert_eq!(Response::Done(true).to_payload(), Payload::Int(1));
        assert_eq!(Response::Done(false).to_payload(), Payload::Int(0));
        assert_eq!(Response::None.to_payload(), Payload::None);
    }
}
