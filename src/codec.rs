//! Wire message shapes and a reference codec.
//!
//! The datagram codec itself is an external collaborator this crate only
//! consumes through a trait; this module exists so the crate is exercisable
//! end-to-end without forcing every consumer to write one. `Codec` is a
//! trait precisely so a host can swap in its own framing — the default here
//! is not part of the contract. Grounded on
//! `jamesmunns-erdnuss-pub/source/comms`, a small serde-driven wire protocol
//! crate from the same postcard lineage.

use serde::{Deserialize, Serialize};

use crate::error::LockstepError;
use crate::types::{FrameAck, FrameInput, HostId};

/// The two message shapes that cross the UDP boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WireMessage {
    /// A batch of input frames from `sender_id`.
    FrameInputBatch {
        /// Who produced these frames.
        sender_id: HostId,
        /// The frames themselves, any order (the `ReceiveQueue` reorders).
        inputs: Vec<FrameInput>,
    },
    /// A batch of ack snapshots from `sender_id`.
    AckBatch {
        /// Who is acknowledging.
        sender_id: HostId,
        /// One ack snapshot per `ReceiveQueue` `sender_id` maintains for the
        /// recipient. In this core's point-to-point link model that's
        /// always exactly one entry; the type stays a `Vec` so a fan-out
        /// collaborator — explicitly out of scope here — can reuse the same
        /// wire shape for several flows in one datagram.
        acks: Vec<FrameAck>,
    },
}

/// Encodes/decodes [`WireMessage`]s to/from datagram bytes.
pub trait Codec: Send + Sync {
    /// Serializes a message for transmission.
    fn encode(&self, message: &WireMessage) -> Vec<u8>;

    /// Parses a received datagram. A decode failure is always a protocol
    /// misuse by the peer — logged and dropped by the caller, never fatal.
    fn decode(&self, bytes: &[u8]) -> Result<WireMessage, LockstepError>;
}

/// A reference [`Codec`] backed by `postcard`, a compact binary format well
/// suited to the fixed, serde-derived shapes above.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostcardCodec;

impl Codec for PostcardCodec {
    fn encode(&self, message: &WireMessage) -> Vec<u8> {
        postcard::to_allocvec(message).expect("WireMessage is always serializable")
    }

    fn decode(&self, bytes: &[u8]) -> Result<WireMessage, LockstepError> {
        postcard::from_bytes(bytes).map_err(|e| LockstepError::Codec(e.to_string()))
    }
}
