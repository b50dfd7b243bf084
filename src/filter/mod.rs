// SPDX-License-Identifier: MPL-2.0-only

//! Host-facing filter abstraction.
//!
//! A host drives every filter kind the same way: it calls methods by
//! [`Opcode`], ticks the filter with the graph clock, and drains the events
//! the filter queued while processing. Nothing here knows about any concrete
//! filter.

mod error;
mod opcode;

use std::time::Duration;

pub use error::FilterError;
pub use opcode::{ArgType, EventCode, FilterId, Opcode, Payload};

/// Static description of a filter kind.
#[derive(Debug)]
pub struct FilterDesc {
    pub id: FilterId,
    pub name: &'static str,
    pub text: &'static str,
}

impl FilterDesc {
    /// Reject codes that belong to another filter kind.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::WrongFilter`] if `found` is not this kind's id.
    pub fn check(&self, found: FilterId) -> Result<(), FilterError> {
        if found == self.id {
            Ok(())
        } else {
            Err(FilterError::WrongFilter {
                expected: self.id,
                found,
            })
        }
    }
}

/// One beat of the host clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick {
    /// Time elapsed since the graph started.
    pub time: Duration,
}

impl Tick {
    #[must_use]
    pub fn at(time: Duration) -> Self {
        Self { time }
    }

    #[must_use]
    pub fn at_millis(ms: u64) -> Self {
        Self::at(Duration::from_millis(ms))
    }
}

/// A processing unit the host can address without compile-time knowledge of it.
pub trait Filter {
    fn desc(&self) -> &'static FilterDesc;

    /// Execute a method synchronously.
    ///
    /// Methods without a result return [`Payload::None`].
    fn call_method(&mut self, opcode: Opcode, payload: Payload) -> Result<Payload, FilterError>;

    /// Advance the filter to `tick`.
    fn process(&mut self, tick: &Tick) -> Result<(), FilterError>;

    /// Take the events queued since the last call, oldest first.
    fn drain_events(&mut self) -> Vec<(EventCode, Payload)>;
}
