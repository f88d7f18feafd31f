//! C4 — the Transmitter execution context.
//!
//! Periodically drains every peer's `SendQueue` and emits the resulting
//! datagrams, along with any `FrameAck` snapshots the Receiver produced
//! since the last tick. Grounded on the send side of
//! `layers/link.rs::SimplexLink` (periodic retransmission via a timer),
//! generalized from one self-rescheduling timer per sequence number to a
//! single periodic drain across the whole window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::codec::{Codec, WireMessage};
use crate::session::Session;
use crate::shutdown::Shutdown;
use crate::transport::DatagramTransport;
use crate::types::{FrameAck, HostId};

/// Drains SendQueues on a fixed period and emits outbound datagrams.
pub struct Transmitter<C: Codec> {
    session: Arc<Session>,
    transport: Arc<dyn DatagramTransport>,
    codec: C,
    incoming_acks: mpsc::UnboundedReceiver<(HostId, FrameAck)>,
    shutdown: Shutdown,
    tick_period: Duration,
}

impl<C: Codec> Transmitter<C> {
    /// Builds a Transmitter that ticks every `tick_period`, which should be
    /// well under the interframe interval so retransmission stays
    /// responsive relative to tick pacing.
    pub fn new(
        session: Arc<Session>,
        transport: Arc<dyn DatagramTransport>,
        codec: C,
        incoming_acks: mpsc::UnboundedReceiver<(HostId, FrameAck)>,
        shutdown: Shutdown,
        tick_period: Duration,
    ) -> Self {
        Self {
            session,
            transport,
            codec,
            incoming_acks,
            shutdown,
            tick_period,
        }
    }

    /// Runs until shutdown is signalled.
    #[tracing::instrument(skip(self), fields(local_id = self.session.local_id))]
    pub async fn run(&mut self) -> crate::error::Result<()> {
        let mut interval = tokio::time::interval(self.tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.wait() => {
                    tracing::info!("transmitter stopping");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.drain_and_send(Instant::now()).await?;
                }
            }
        }
    }

    fn collect_outstanding_acks(&mut self) -> HashMap<HostId, Vec<FrameAck>> {
        let mut by_peer: HashMap<HostId, Vec<FrameAck>> = HashMap::new();
        while let Ok((peer, ack)) = self.incoming_acks.try_recv() {
            by_peer.entry(peer).or_default().push(ack);
        }
        by_peer
    }

    async fn drain_and_send(&mut self, now: Instant) -> crate::error::Result<()> {
        let mut acks_by_peer = self.collect_outstanding_acks();

        for &peer in &self.session.peers {
            let frames = {
                let mut queue = self.session.send_queues[&peer].lock().unwrap();
                queue.drain_for_transmission(now, self.session.config.retransmit_interval)
            };
            let acks = acks_by_peer.remove(&peer).unwrap_or_default();

            if frames.is_empty() && acks.is_empty() {
                continue;
            }

            if !frames.is_empty() {
                let message = WireMessage::FrameInputBatch {
                    sender_id: self.session.local_id,
                    inputs: frames,
                };
                self.send(peer, &message).await?;
            }

            if !acks.is_empty() {
                let message = WireMessage::AckBatch {
                    sender_id: self.session.local_id,
                    acks,
                };
                self.send(peer, &message).await?;
            }
        }

        Ok(())
    }

    async fn send(&self, peer: HostId, message: &WireMessage) -> crate::error::Result<()> {
        let bytes = self.codec.encode(message);
        self.transport.send_to(peer, &bytes).await
    }
}
