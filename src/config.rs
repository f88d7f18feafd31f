//! Tunable parameters plus the optional `.env`/CLI overlay used by the demo
//! binary. The library itself never reads the environment; it only consumes
//! a [`LockstepConfig`] value the host constructs.

use crate::types::FrameNumber;
use std::time::Duration;

/// Receive buffer slots per sender. Must exceed max in-flight frames times
/// retransmit cycles, or a fast sender will repeatedly hit window closure
/// against a slow consumer.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Milliseconds between ticks, absent any other guidance.
pub const DEFAULT_INTERFRAME_MS: u64 = 16;

/// Milliseconds before a pending send is retransmitted, absent a measured
/// RTT. Spec §6 recommends 2-5x RTT; this is a conservative placeholder.
pub const DEFAULT_RETRANSMIT_MS: u64 = 150;

/// Runtime-tunable parameters for one lockstep session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockstepConfig {
    /// Receive buffer slots per sender.
    pub capacity: usize,
    /// Time between successive ticks.
    pub interframe_time: Duration,
    /// Time a pending send waits for an ack before being retransmitted.
    pub retransmit_interval: Duration,
    /// First frame number, identical across all participants.
    pub first_frame_number: FrameNumber,
}

impl Default for LockstepConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            interframe_time: Duration::from_millis(DEFAULT_INTERFRAME_MS),
            retransmit_interval: Duration::from_millis(DEFAULT_RETRANSMIT_MS),
            first_frame_number: FrameNumber::ZERO,
        }
    }
}

impl LockstepConfig {
    /// Starts from the defaults; use the `with_*` setters to override.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides `capacity`.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Overrides `interframe_time`.
    pub fn with_interframe_time(mut self, interframe_time: Duration) -> Self {
        self.interframe_time = interframe_time;
        self
    }

    /// Overrides `retransmit_interval`.
    pub fn with_retransmit_interval(mut self, retransmit_interval: Duration) -> Self {
        self.retransmit_interval = retransmit_interval;
        self
    }

    /// Overrides `first_frame_number`.
    pub fn with_first_frame_number(mut self, first_frame_number: FrameNumber) -> Self {
        self.first_frame_number = first_frame_number;
        self
    }
}
