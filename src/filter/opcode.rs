// SPDX-License-Identifier: MPL-2.0-only

//! Numeric method and event codes.
//!
//! A code packs three fields into a `u32`:
//!
//! ```text
//!  31            16 15      8 7       0
//! ┌────────────────┬─────────┬─────────┐
//! │   filter id    │  index  │ argsize │
//! └────────────────┴─────────┴─────────┘
//! ```
//!
//! so a host can route an opaque `(code, payload)` pair to the right filter and
//! check the payload shape without knowing anything else about the filter.

use std::fmt;

/// Identifies a filter kind. All codes of a kind share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(pub u16);

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Shape of the single argument a method takes or an event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    None,
    Int,
    Str,
}

impl ArgType {
    /// Argument size as encoded in the low byte of a code.
    ///
    /// Strings travel by reference, so they take the size of a pointer.
    #[must_use]
    pub const fn size(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Int => std::mem::size_of::<i32>() as u8,
            Self::Str => std::mem::size_of::<usize>() as u8,
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Int => "int",
            Self::Str => "string",
        })
    }
}

/// Value travelling alongside a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    Int(i32),
    Str(String),
}

impl Payload {
    #[must_use]
    pub fn arg_type(&self) -> ArgType {
        match self {
            Self::None => ArgType::None,
            Self::Int(_) => ArgType::Int,
            Self::Str(_) => ArgType::Str,
        }
    }
}

macro_rules! packed_code {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[must_use]
            pub const fn new(filter: FilterId, index: u8, arg: ArgType) -> Self {
                Self(((filter.0 as u32) << 16) | ((index as u32) << 8) | arg.size() as u32)
            }

            #[must_use]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[must_use]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[must_use]
            pub const fn filter(self) -> FilterId {
                FilterId((self.0 >> 16) as u16)
            }

            #[must_use]
            pub const fn index(self) -> u8 {
                (self.0 >> 8) as u8
            }

            #[must_use]
            pub const fn arg_size(self) -> u8 {
                self.0 as u8
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#010x}", self.0)
            }
        }
    };
}

packed_code!(
    /// Code of a method a host can call on a filter.
    Opcode
);

packed_code!(
    /// Code of a notification a filter emits toward its host.
    EventCode
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_pack_and_unpack() {
        let code = Opcode::new(FilterId(0x1234), 5, ArgType::Int);
        assert_eq!(code.raw(), 0x1234_0504);
        assert_eq!(code.filter(), FilterId(0x1234));
        assert_eq!(code.index(), 5);
        assert_eq!(code.arg_size(), 4);
        assert_eq!(Opcode::from_raw(code.raw()), code);
    }

    #[test]
    fn no_arg_codes_have_zero_size() {
        let code = EventCode::new(FilterId(7), 0, ArgType::None);
        assert_eq!(code.raw(), 0x0007_0000);
        assert_eq!(code.arg_size(), 0);
    }

    #[test]
    fn string_arguments_are_pointer_sized() {
        assert_eq!(
            usize::from(ArgType::Str.size()),
            std::mem::size_of::<*const u8>()
        );
    }

    #[test]
    fn payload_reports_its_shape() {
        assert_eq!(Payload::None.arg_type(), ArgType::None);
        assert_eq!(Payload::Int(3).arg_type(), ArgType::Int);
        assert_eq!(Payload::Str("a".into()).arg_type(), ArgType::Str);
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Opcode::from_raw(0x10).to_string(), "0x00000010");
        assert_eq!(FilterId(0xab).to_string(), "0x00ab");
    }
}
