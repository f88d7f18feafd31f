//! Error taxonomy.
//!
//! Transient network conditions and protocol misuse by a peer are never
//! represented as `Err` here — they are absorbed at the point they're
//! detected and surfaced only through `tracing`. Only the fatal conditions
//! that require tearing the simulation down produce a [`LockstepError`].

use crate::types::HostId;
use thiserror::Error;

/// Shorthand result alias used throughout the crate.
pub type Result<T, E = LockstepError> = core::result::Result<T, E>;

/// Conditions that cause the core to stop and hand control back to the host
/// application.
#[derive(Debug, Error)]
pub enum LockstepError {
    /// The datagram socket closed or errored outside of a requested
    /// shutdown.
    #[error("transport closed unexpectedly: {0}")]
    TransportClosed(#[source] std::io::Error),

    /// A decoded datagram referenced a sender ID that was never enrolled in
    /// the handshake.
    #[error("unknown sender id {0}")]
    UnknownSender(HostId),

    /// A decoded frame number violated the "monotonic non-negative
    /// integer" invariant (only reachable on a codec that permits
    /// out-of-range values, e.g. a custom `Codec` impl).
    #[error("decode invariant violated: {0}")]
    DecodeInvariant(String),

    /// The codec failed to decode a datagram body after it otherwise
    /// passed framing checks; reported up as fatal only when the host asks
    /// the default codec to treat this as such (see
    /// [`crate::codec::Codec`]). Everyday malformed-datagram drops (§7,
    /// "Protocol misuse") never reach this variant.
    #[error("codec failure: {0}")]
    Codec(String),

    /// The simulation was asked to start without a complete peer set from
    /// the handshake.
    #[error("invalid configuration: {0}")]
    Config(String),
}
