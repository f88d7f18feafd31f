//! C5 — the local tick loop.
//!
//! `CollectLocal → WaitBarrier → ExecuteFrame → Sleep`, with a bootstrap
//! priming pass before the first tick. This module has no direct
//! counterpart elsewhere in this codebase (nothing else here models an
//! application tick loop, only a throughput simulation) — it is built
//! directly in the `tokio`-task-plus-`tracing` idiom the rest of the crate
//! already uses.

use std::sync::Arc;

use crate::barrier::NoopNotifier;
use crate::host::SimulationHost;
use crate::receive_queue::ReceiveQueue;
use crate::session::Session;
use crate::shutdown::Shutdown;
use crate::types::{Command, FrameInput, FrameNumber};

/// Runs the local simulation tick loop, coupled to the shared `Session`'s
/// ReceiveQueues, SendQueues, and barrier.
pub struct TickCoordinator<H: SimulationHost> {
    session: Arc<Session>,
    host: Arc<H>,
    /// Self-loopback queue: local input is pushed here directly, never over
    /// the wire, and never tracked by the barrier.
    local_queue: ReceiveQueue,
    current_frame: FrameNumber,
    shutdown: Shutdown,
}

impl<H: SimulationHost> TickCoordinator<H> {
    /// Builds a coordinator for `session`, starting at its configured
    /// first frame number.
    pub fn new(session: Arc<Session>, host: Arc<H>, shutdown: Shutdown) -> Self {
        let local_queue = ReceiveQueue::new(
            session.local_id,
            session.config.first_frame_number,
            session.config.capacity,
        );
        let current_frame = session.config.first_frame_number;
        Self {
            session,
            host,
            local_queue,
            current_frame,
            shutdown,
        }
    }

    /// Primes the pipeline with `fillCommands()` before the tick loop
    /// starts.
    pub async fn bootstrap(&mut self) {
        let commands = self.host.fill_commands().await;
        let primed = commands.len();

        for command in commands {
            self.collect(command);
            self.current_frame = self.current_frame.next();
        }

        tracing::debug!(primed, "bootstrap complete");
    }

    /// Runs ticks until shutdown is signalled.
    #[tracing::instrument(skip(self), fields(local_id = self.session.local_id))]
    pub async fn run(&mut self) {
        self.bootstrap().await;

        while !self.shutdown.is_signalled() {
            self.collect_local().await;
            self.wait_barrier().await;
            self.execute_frame();
            self.sleep_interframe().await;
            self.current_frame = self.current_frame.next();
        }

        tracing::info!("tick coordinator stopping");
    }

    /// `CollectLocal`: ask the host for this tick's command, push it to the
    /// local loopback queue and every peer's SendQueue.
    async fn collect_local(&mut self) {
        let command = self.host.read_input(self.current_frame).await;
        self.collect(command);
    }

    fn collect(&mut self, command: Command) {
        let frame_number = self.current_frame;
        self.local_queue
            .push(FrameInput::new(frame_number, command.clone()), &NoopNotifier);

        for &peer in &self.session.peers {
            let mut queue = self.session.send_queues[&peer].lock().unwrap();
            queue.enqueue(FrameInput::new(frame_number, command.clone()));
        }
    }

    /// `WaitBarrier`: if any remote head isn't ready yet, suspend the
    /// simulation, wait, then resume. Skips both hooks if already ready.
    async fn wait_barrier(&self) {
        if self.session.barrier.all_ready() {
            return;
        }

        self.host.suspend_simulation().await;
        self.session.barrier.wait_all_ready().await;
        self.host.resume_simulation().await;
    }

    /// `ExecuteFrame`: pop exactly one input from every queue (local first,
    /// then peers in a fixed order) and hand each to the host.
    fn execute_frame(&mut self) {
        let local_input = self
            .local_queue
            .pop(&NoopNotifier)
            .expect("local input is always pushed before the barrier is awaited");
        self.host.execute_frame(&local_input);

        for &peer in &self.session.peers {
            let input = {
                let mut queue = self.session.receive_queues[&peer].lock().unwrap();
                queue.pop(&self.session.barrier)
            };
            let input = input.expect(
                "WaitBarrier guarantees every remote ReceiveQueue head is ready before ExecuteFrame",
            );
            self.host.execute_frame(&input);
        }
    }

    /// `Sleep`: wait out the interframe interval (or until shutdown, which
    /// just lets the loop re-check its condition — an interrupted sleep is
    /// logged and the loop continues rather than treating this as fatal).
    async fn sleep_interframe(&self) {
        tokio::select! {
            biased;
            _ = self.shutdown.wait() => {
                tracing::debug!("interframe sleep interrupted by shutdown");
            }
            _ = tokio::time::sleep(self.session.config.interframe_time) => {}
        }
    }
}
