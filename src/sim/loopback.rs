//! A [`crate::transport::DatagramTransport`] backed by an in-process
//! lossy network: every directed peer pair gets its own
//! [`GilbertElliotChannel`], and delivery is ordered deterministically
//! through an [`EventLoop`] instead of racing real tokio task scheduling.
//!
//! Grounded on `layers/physical.rs::SimplexChannel` (per-direction channel
//! state, bit-level success draw, propagation delay before delivery),
//! generalized from one hardcoded sender/receiver pair to an arbitrary
//! peer set addressed by [`HostId`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::LockstepError;
use crate::sim::channel::{ChannelParams, GilbertElliotChannel};
use crate::sim::event_loop::EventLoop;
use crate::transport::DatagramTransport;
use crate::types::HostId;

/// Frame header overhead assumed for the bit-error-rate draw (matches the
/// order of magnitude of a real UDP + lockstep header).
const FRAME_OVERHEAD_BITS: u64 = 24 * 8;

/// Shared state for one simulated network: one inbox per peer, and one
/// Gilbert-Elliot channel per directed pair.
struct NetworkCore {
    event_loop: Arc<EventLoop>,
    inboxes: HashMap<HostId, mpsc::UnboundedSender<(HostId, Vec<u8>)>>,
    channels: Mutex<HashMap<(HostId, HostId), GilbertElliotChannel>>,
    params: ChannelParams,
    bit_rate: f64,
    propagation_delay: Duration,
}

impl NetworkCore {
    fn channel_success(&self, from: HostId, to: HostId, num_bits: u64) -> bool {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry((from, to))
            .or_insert_with(|| GilbertElliotChannel::new(self.params))
            .frame_success(num_bits)
    }
}

/// A simulated in-process network. Build with [`SimNetwork::new`], then
/// call [`SimNetwork::transport_for`] once per participant.
pub struct SimNetwork {
    core: Arc<NetworkCore>,
    pending_inboxes: Mutex<HashMap<HostId, mpsc::UnboundedReceiver<(HostId, Vec<u8>)>>>,
}

impl SimNetwork {
    /// Creates a network for exactly `peers`, each peer's Gilbert-Elliot
    /// channel parameterized by `params`, with datagrams queued for
    /// delivery after `propagation_delay` at `bit_rate` bits/sec.
    pub fn new(
        peers: &[HostId],
        params: ChannelParams,
        bit_rate: f64,
        propagation_delay: Duration,
    ) -> Self {
        let mut inboxes = HashMap::new();
        let mut pending_inboxes = HashMap::new();
        for &peer in peers {
            let (tx, rx) = mpsc::unbounded_channel();
            inboxes.insert(peer, tx);
            pending_inboxes.insert(peer, rx);
        }

        let event_loop = Arc::new(EventLoop::new());
        let core = Arc::new(NetworkCore {
            event_loop: Arc::clone(&event_loop),
            inboxes,
            channels: Mutex::new(HashMap::new()),
            params,
            bit_rate,
            propagation_delay,
        });

        spawn_driver(Arc::clone(&event_loop));

        Self {
            core,
            pending_inboxes: Mutex::new(pending_inboxes),
        }
    }

    /// Builds the [`SimTransport`] for `peer`. Panics if called more than
    /// once for the same peer, or for a peer not passed to `new`.
    pub fn transport_for(&self, peer: HostId) -> SimTransport {
        let inbox = self
            .pending_inboxes
            .lock()
            .unwrap()
            .remove(&peer)
            .unwrap_or_else(|| panic!("no inbox registered for peer {peer}, or already taken"));

        SimTransport {
            local_id: peer,
            core: Arc::clone(&self.core),
            inbox: tokio::sync::Mutex::new(inbox),
        }
    }
}

fn spawn_driver(event_loop: Arc<EventLoop>) {
    tokio::spawn(async move {
        loop {
            while event_loop.pending_count().await > 0 {
                event_loop.advance().await;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    });
}

/// One participant's view of a [`SimNetwork`].
pub struct SimTransport {
    local_id: HostId,
    core: Arc<NetworkCore>,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<(HostId, Vec<u8>)>>,
}

#[async_trait]
impl DatagramTransport for SimTransport {
    async fn send_to(&self, peer: HostId, bytes: &[u8]) -> Result<(), LockstepError> {
        let Some(inbox) = self.core.inboxes.get(&peer).cloned() else {
            tracing::debug!(peer, "send to unknown simulated peer dropped");
            return Ok(());
        };

        let num_bits = bytes.len() as u64 * 8 + FRAME_OVERHEAD_BITS;
        let succeeds = self.core.channel_success(self.local_id, peer, num_bits);

        let delay_secs =
            num_bits as f64 / self.core.bit_rate + self.core.propagation_delay.as_secs_f64();

        let from = self.local_id;
        let payload = bytes.to_vec();
        let event: crate::sim::event_loop::EventFuture = Box::pin(async move {
            tokio::time::sleep(Duration::from_secs_f64(delay_secs)).await;
            if succeeds {
                let _ = inbox.send((from, payload));
            }
        });

        self.core.event_loop.schedule(event, delay_secs).await;
        Ok(())
    }

    async fn recv(&self) -> Result<(HostId, Vec<u8>), LockstepError> {
        let mut inbox = self.inbox.lock().await;
        inbox
            .recv()
            .await
            .ok_or_else(|| LockstepError::TransportClosed(std::io::Error::other("sim network shut down")))
    }
}
