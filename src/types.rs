//! Core data types shared by every queue and task in the crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifies a participant in the simulation. Assigned during the
/// out-of-scope handshake (spec §6) and fixed for the lifetime of the run.
pub type HostId = u32;

/// A monotonically increasing tick/frame identifier, shared by every
/// participant. Wraps a `u64` rather than exposing raw arithmetic so that
/// window and ordering comparisons read the same way everywhere they're
/// used, the way `other_examples` sequence-number wrappers (laminar, ggrs)
/// keep comparison logic out of call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameNumber(pub u64);

impl FrameNumber {
    /// The very first frame number a run may start from.
    pub const ZERO: FrameNumber = FrameNumber(0);

    /// Returns `self + n`, saturating rather than wrapping: frame numbers
    /// are not expected to approach `u64::MAX` in any real run.
    pub fn advance(self, n: u64) -> FrameNumber {
        FrameNumber(self.0.saturating_add(n))
    }

    /// Returns `self + 1`.
    pub fn next(self) -> FrameNumber {
        self.advance(1)
    }

    /// `self - 1`, saturating at zero. Used to seed `lastInOrder = base - 1`.
    pub fn prev_saturating(self) -> FrameNumber {
        FrameNumber(self.0.saturating_sub(1))
    }

    /// Offset of `self` from `base`, or `None` if `self < base`.
    pub fn offset_from(self, base: FrameNumber) -> Option<u64> {
        self.0.checked_sub(base.0)
    }
}

impl std::fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque application command. The core never interprets the payload; it
/// only reassembles, orders, and acknowledges it.
pub type Command = Vec<u8>;

/// One input for one tick, produced by exactly one participant.
///
/// Immutable once constructed (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInput {
    /// Tick this input applies to.
    pub frame_number: FrameNumber,
    /// Application-defined payload.
    pub command: Command,
}

impl FrameInput {
    /// Builds a new `FrameInput`.
    pub fn new(frame_number: FrameNumber, command: Command) -> Self {
        Self {
            frame_number,
            command,
        }
    }
}

/// A cumulative+selective acknowledgement snapshot for one `ReceiveQueue`.
///
/// `cumulative_ack` of `None` means "no frame has ever been received from
/// `base`" (the initial `lastInOrder = base - 1` state, which cannot be
/// represented by a `FrameNumber` once `base` is zero).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameAck {
    /// Highest frame number such that every frame `<=` it has been received.
    pub cumulative_ack: Option<FrameNumber>,
    /// Frame numbers `> cumulative_ack` that have also been received.
    pub selective_acks: BTreeSet<FrameNumber>,
}

impl FrameAck {
    /// An ack snapshot reflecting nothing received yet.
    pub fn empty() -> Self {
        Self {
            cumulative_ack: None,
            selective_acks: BTreeSet::new(),
        }
    }
}
