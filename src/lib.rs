//! Deterministic lockstep multiplayer sync core.
//!
//! This crate implements the reliability layer and frame-advance barrier
//! that sit between an unreliable datagram transport and a deterministic
//! simulation loop: a per-sender reassembly queue with selective
//! acknowledgement ([`receive_queue`]), a retransmission-oriented send
//! queue ([`send_queue`]), and the tick loop that couples every remote
//! participant's input availability to local simulation advance
//! ([`tick_coordinator`]).
//!
//! Out of scope, by design: the initial handshake that enrolls
//! participants and assigns ids, the datagram wire codec (a reference one
//! is still provided in [`codec`] so the crate is exercisable end to end),
//! server-side input fan-out, and rollback/prediction — this is pure
//! lockstep, where every host waits for the same inputs before advancing.

#![forbid(unsafe_code)]
#![warn(clippy::all, missing_docs)]

/// Frame-advance barrier and its readiness-notification contract.
pub mod barrier;
/// Wire message shapes and the reference codec.
pub mod codec;
/// Tunable parameters for one lockstep run.
pub mod config;
/// The error taxonomy for fatal (non-absorbed) conditions.
pub mod error;
/// Callback capability set consumed from the host application.
pub mod host;
/// C1: per-sender reassembly queue.
pub mod receive_queue;
/// C3: demultiplexes inbound datagrams into queue operations.
pub mod receiver;
/// C2: retransmission-oriented outbound queue.
pub mod send_queue;
/// One run's fixed peer set, queues, and barrier.
pub mod session;
/// The shared shutdown signal.
pub mod shutdown;
/// In-memory, lossy network simulation used by tests and the demo binary.
pub mod sim;
/// C5: the local tick loop.
pub mod tick_coordinator;
/// C4: periodic SendQueue drain and datagram emission.
pub mod transmitter;
/// The datagram transport boundary and a real UDP implementation.
pub mod transport;
/// Core data types: frame numbers, inputs, and ack snapshots.
pub mod types;

pub use barrier::Barrier;
pub use codec::{Codec, PostcardCodec, WireMessage};
pub use config::LockstepConfig;
pub use error::{LockstepError, Result};
pub use host::SimulationHost;
pub use receive_queue::ReceiveQueue;
pub use receiver::Receiver;
pub use send_queue::SendQueue;
pub use session::Session;
pub use shutdown::Shutdown;
pub use tick_coordinator::TickCoordinator;
pub use transmitter::Transmitter;
pub use transport::{DatagramTransport, UdpTransport};
pub use types::{Command, FrameAck, FrameInput, FrameNumber, HostId};
