//! In-memory network simulation used by integration tests and the demo
//! binary — never by the production `Receiver`/`Transmitter` path, which
//! talks to a real [`crate::transport::DatagramTransport`] instead.
//!
//! Built around a Gilbert-Elliot channel throughput study: the channel
//! model ([`channel`]) and discrete event scheduler ([`event_loop`]) keep
//! their original shape, wired together behind a
//! [`crate::transport::DatagramTransport`] impl ([`loopback`]) so the same
//! lossy-link behavior can drive either a property test or the multi-peer
//! demo harness ([`harness`]).

/// The Gilbert-Elliot two-state loss/corruption model.
pub mod channel;
/// A minimal discrete-time event scheduler.
pub mod event_loop;
/// Multi-peer loopback harness driving a full demo run.
pub mod harness;
/// A `DatagramTransport` backed by the channel model and event scheduler.
pub mod loopback;
