//! Multi-peer demo/soak harness: wires `N` full lockstep peers together
//! over a [`SimNetwork`] and runs them for a fixed duration, reporting each
//! peer's executed frame count.
//!
//! Plays the same role `simulate_arq` once did — drive one parameterized
//! run to completion and report aggregate stats — generalized from a
//! single sender/receiver throughput measurement to a full N-peer
//! lockstep session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::codec::PostcardCodec;
use crate::config::LockstepConfig;
use crate::error::LockstepError;
use crate::host::SimulationHost;
use crate::receiver::Receiver;
use crate::session::Session;
use crate::shutdown::Shutdown;
use crate::sim::channel::ChannelParams;
use crate::sim::loopback::SimNetwork;
use crate::tick_coordinator::TickCoordinator;
use crate::transmitter::Transmitter;
use crate::transport::DatagramTransport;
use crate::types::{Command, FrameInput, FrameNumber, HostId};

/// Parameters for one [`run_harness`] invocation.
#[derive(Debug, Clone)]
pub struct HarnessParams {
    /// How many peers take part, ids `0..peer_count`.
    pub peer_count: u32,
    /// How many ticks to let the run advance before signalling shutdown.
    pub ticks: u64,
    /// Queue capacity, interframe time, and retransmit interval.
    pub config: LockstepConfig,
    /// Loss/corruption model shared by every directed peer pair.
    pub channel: ChannelParams,
    /// Simulated link bit rate, bits/sec.
    pub bit_rate: f64,
    /// One-way propagation delay before a sent datagram is deliverable.
    pub propagation_delay: Duration,
}

impl Default for HarnessParams {
    fn default() -> Self {
        Self {
            peer_count: 2,
            ticks: 200,
            config: LockstepConfig::default(),
            channel: ChannelParams::default(),
            bit_rate: 1e7,
            propagation_delay: Duration::from_millis(20),
        }
    }
}

/// One peer's outcome from a harness run.
#[derive(Debug, Clone)]
pub struct PeerReport {
    /// The peer this report describes.
    pub peer_id: HostId,
    /// Total frames (local and remote) this peer's `TickCoordinator`
    /// handed to [`SimulationHost::execute_frame`].
    pub frames_executed: usize,
}

/// A deterministic [`SimulationHost`] that emits the frame number as its
/// own command and records every frame it executes, so the harness has
/// something to report.
struct RecordingHost {
    executed: Mutex<Vec<FrameInput>>,
}

impl RecordingHost {
    fn new() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
        }
    }

    fn frames_executed(&self) -> usize {
        self.executed.lock().unwrap().len()
    }
}

#[async_trait]
impl SimulationHost for RecordingHost {
    async fn read_input(&self, frame: FrameNumber) -> Command {
        frame.0.to_le_bytes().to_vec()
    }

    fn execute_frame(&self, input: &FrameInput) {
        self.executed.lock().unwrap().push(input.clone());
    }

    async fn suspend_simulation(&self) {
        tracing::debug!("suspended, waiting for every peer's head to be ready");
    }

    async fn resume_simulation(&self) {
        tracing::debug!("resumed, barrier satisfied");
    }

    async fn fill_commands(&self) -> Vec<Command> {
        Vec::new()
    }

    async fn on_fatal(&self, error: &LockstepError) {
        tracing::error!(%error, "fatal condition torn the run down");
    }
}

/// Runs `params.peer_count` peers lockstepped over a simulated lossy
/// network for roughly `params.ticks` interframe intervals, then reports
/// each peer's executed frame count.
pub async fn run_harness(params: HarnessParams) -> Vec<PeerReport> {
    let peers: Vec<HostId> = (0..params.peer_count).collect();
    let network = SimNetwork::new(
        &peers,
        params.channel,
        params.bit_rate,
        params.propagation_delay,
    );

    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();
    let mut hosts = Vec::new();

    for &local_id in &peers {
        let remote_peers: Vec<HostId> = peers.iter().copied().filter(|&p| p != local_id).collect();
        let session = Arc::new(Session::new(local_id, remote_peers, params.config.clone()));
        let transport: Arc<dyn DatagramTransport> = Arc::new(network.transport_for(local_id));
        let host = Arc::new(RecordingHost::new());
        hosts.push((local_id, Arc::clone(&host)));

        let (ack_tx, ack_rx) = mpsc::unbounded_channel();

        let receiver = Receiver::new(
            Arc::clone(&session),
            Arc::clone(&transport),
            PostcardCodec,
            ack_tx,
            shutdown.clone(),
        );
        let mut transmitter = Transmitter::new(
            Arc::clone(&session),
            transport,
            PostcardCodec,
            ack_rx,
            shutdown.clone(),
            params.config.interframe_time / 4,
        );
        let receiver_fatal = (shutdown.clone(), Arc::clone(&host));
        let transmitter_fatal = (shutdown.clone(), Arc::clone(&host));
        let mut coordinator = TickCoordinator::new(session, host, shutdown.clone());

        tasks.push(tokio::spawn(async move {
            if let Err(error) = receiver.run().await {
                tracing::error!(%error, "receiver hit a fatal condition, tearing down");
                let (shutdown, host) = receiver_fatal;
                shutdown.signal();
                host.on_fatal(&error).await;
            }
        }));
        tasks.push(tokio::spawn(async move {
            if let Err(error) = transmitter.run().await {
                tracing::error!(%error, "transmitter hit a fatal condition, tearing down");
                let (shutdown, host) = transmitter_fatal;
                shutdown.signal();
                host.on_fatal(&error).await;
            }
        }));
        tasks.push(tokio::spawn(async move {
            coordinator.run().await;
        }));
    }

    tokio::time::sleep(params.config.interframe_time * params.ticks as u32).await;
    shutdown.signal();

    for task in tasks {
        let _ = task.await;
    }

    hosts
        .into_iter()
        .map(|(peer_id, host)| PeerReport {
            peer_id,
            frames_executed: host.frames_executed(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lossless_channel() -> ChannelParams {
        ChannelParams {
            good_state_ber: 0.0,
            bad_state_ber: 0.0,
            good_to_bad_p: 0.0,
            bad_to_good_p: 0.0,
        }
    }

    #[tokio::test]
    #[test_log::test]
    async fn two_peers_converge_on_a_similar_frame_count_over_a_clean_link() {
        let params = HarnessParams {
            peer_count: 2,
            ticks: 30,
            config: LockstepConfig::default()
                .with_interframe_time(Duration::from_millis(5))
                .with_retransmit_interval(Duration::from_millis(20)),
            channel: lossless_channel(),
            bit_rate: 1e8,
            propagation_delay: Duration::from_millis(1),
        };

        let reports = tokio::time::timeout(Duration::from_secs(10), run_harness(params))
            .await
            .expect("harness run should finish well within the timeout");

        assert_eq!(reports.len(), 2);
        for report in &reports {
            // Every tick contributes one local and one remote execute_frame
            // call per peer once the pipeline is warmed up.
            assert!(
                report.frames_executed > 0,
                "peer {} executed no frames",
                report.peer_id
            );
        }
    }
}
