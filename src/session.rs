//! Ties one run's fixed peer set, queues, and barrier together: every queue
//! is created during the handshake, and the set of peers is fixed from
//! simulation start.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::barrier::Barrier;
use crate::config::LockstepConfig;
use crate::receive_queue::ReceiveQueue;
use crate::send_queue::SendQueue;
use crate::types::HostId;

/// Shared state for one lockstep run, handed to the Receiver, Transmitter,
/// and TickCoordinator tasks as an `Arc<Session>`.
///
/// `receive_queues` and `send_queues` are keyed by *remote* peer only — the
/// local host has no entry in either: there is no self-destination send
/// queue, and the self-loopback receive queue lives inside the
/// `TickCoordinator` instead, since nothing else ever touches it.
pub struct Session {
    /// This participant's own id.
    pub local_id: HostId,
    /// Every other participant, fixed for the run.
    pub peers: Vec<HostId>,
    /// Tunables for this run.
    pub config: LockstepConfig,
    /// One inbound reassembly queue per remote sender.
    pub receive_queues: HashMap<HostId, Mutex<ReceiveQueue>>,
    /// One outbound retransmission queue per remote destination.
    pub send_queues: HashMap<HostId, Mutex<SendQueue>>,
    /// Frame-advance barrier tracking every remote peer's headReady state.
    pub barrier: Barrier,
}

impl Session {
    /// Builds a session for `local_id` among `peers`, per `config`.
    pub fn new(local_id: HostId, peers: Vec<HostId>, config: LockstepConfig) -> Self {
        let receive_queues = peers
            .iter()
            .map(|&peer| {
                (
                    peer,
                    Mutex::new(ReceiveQueue::new(
                        peer,
                        config.first_frame_number,
                        config.capacity,
                    )),
                )
            })
            .collect();

        let send_queues = peers
            .iter()
            .map(|&peer| (peer, Mutex::new(SendQueue::new(config.first_frame_number))))
            .collect();

        let barrier = Barrier::new(peers.iter().copied());

        Self {
            local_id,
            peers,
            config,
            receive_queues,
            send_queues,
            barrier,
        }
    }
}
