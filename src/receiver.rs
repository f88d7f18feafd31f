//! C3 — the Receiver execution context.
//!
//! The sole writer of `ReceiveQueue` slots and the sole caller of
//! `SendQueue::on_ack`. Grounded on the receive side of
//! `layers/link.rs::SimplexLink` (demultiplex a decoded frame into either a
//! buffering/delivery path or an ack-application path), generalized from a
//! 4-variant Rr/Srej/Data/Corrupted enum to the two-message
//! FrameInputBatch/AckBatch shape used here.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::codec::{Codec, WireMessage};
use crate::error::LockstepError;
use crate::session::Session;
use crate::shutdown::Shutdown;
use crate::transport::DatagramTransport;
use crate::types::{FrameAck, FrameInput, HostId};

/// Demultiplexes inbound datagrams into `ReceiveQueue` pushes and
/// `SendQueue` ack applications.
pub struct Receiver<C: Codec> {
    session: Arc<Session>,
    transport: Arc<dyn DatagramTransport>,
    codec: C,
    /// Acks produced by pushes, handed to the Transmitter to piggyback on
    /// its next outgoing datagram — piggybacked rather than sent as its
    /// own datagram, an implementer choice.
    outgoing_acks: mpsc::UnboundedSender<(HostId, FrameAck)>,
    shutdown: Shutdown,
}

impl<C: Codec> Receiver<C> {
    /// Builds a Receiver over `transport`, reporting freshly produced acks
    /// on `outgoing_acks` for the Transmitter to pick up.
    pub fn new(
        session: Arc<Session>,
        transport: Arc<dyn DatagramTransport>,
        codec: C,
        outgoing_acks: mpsc::UnboundedSender<(HostId, FrameAck)>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            session,
            transport,
            codec,
            outgoing_acks,
            shutdown,
        }
    }

    /// Runs until shutdown is signalled or the transport is fatally closed.
    #[tracing::instrument(skip(self), fields(local_id = self.session.local_id))]
    pub async fn run(&self) -> crate::error::Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.wait() => {
                    tracing::info!("receiver stopping");
                    return Ok(());
                }
                datagram = self.transport.recv() => {
                    let (_from, bytes) = datagram?;
                    self.handle_datagram(&bytes)?;
                }
            }
        }
    }

    fn handle_datagram(&self, bytes: &[u8]) -> crate::error::Result<()> {
        let message = match self.codec.decode(bytes) {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(%error, "dropping malformed datagram");
                return Ok(());
            }
        };

        match message {
            WireMessage::FrameInputBatch { sender_id, inputs } => {
                self.handle_input_batch(sender_id, inputs)
            }
            WireMessage::AckBatch { sender_id, acks } => self.handle_ack_batch(sender_id, &acks),
        }
    }

    /// An unenrolled `sender_id` here is the decode-invariant violation §7
    /// classifies as Fatal — not protocol misuse — since the handshake is
    /// supposed to make every sender id the Receiver will ever see known in
    /// advance. Propagated up through `run()` rather than dropped.
    fn handle_input_batch(&self, sender_id: HostId, inputs: Vec<FrameInput>) -> crate::error::Result<()> {
        let queue = self
            .session
            .receive_queues
            .get(&sender_id)
            .ok_or(LockstepError::UnknownSender(sender_id))?;

        let ack = {
            let mut queue = queue.lock().unwrap();
            queue.push_batch(inputs, &self.session.barrier)
        };

        // A send failure here just means the Transmitter has already shut
        // down; nothing to retry, nothing fatal.
        let _ = self.outgoing_acks.send((sender_id, ack));
        Ok(())
    }

    fn handle_ack_batch(&self, sender_id: HostId, acks: &[FrameAck]) -> crate::error::Result<()> {
        let queue = self
            .session
            .send_queues
            .get(&sender_id)
            .ok_or(LockstepError::UnknownSender(sender_id))?;

        let mut queue = queue.lock().unwrap();
        for ack in acks {
            queue.on_ack(ack);
        }
        Ok(())
    }
}
