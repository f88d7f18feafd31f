//! The callback capability set the core consumes from the host application.

use async_trait::async_trait;

use crate::error::LockstepError;
use crate::types::{Command, FrameInput, FrameNumber};

/// Everything the `TickCoordinator` needs from the embedding application.
///
/// Implementations must be deterministic in `execute_frame`: every
/// participant applies the identical sequence of inputs — this is the
/// pure-lockstep guarantee the whole crate exists to uphold.
#[async_trait]
pub trait SimulationHost: Send + Sync {
    /// Returns the local command for `frame`. Must always return a value,
    /// even an "idle" command — the tick loop cannot stall waiting on this.
    async fn read_input(&self, frame: FrameNumber) -> Command;

    /// Deterministically applies one participant's input for the current
    /// tick. Called once per `FrameInput` popped in `ExecuteFrame`; the
    /// order across peers within one tick is fixed by the coordinator's
    /// stable iteration order, not by this call.
    fn execute_frame(&self, input: &FrameInput);

    /// Called when the barrier is not yet satisfied and the simulation
    /// must pause rendering/input collection until every remote head is
    /// ready.
    async fn suspend_simulation(&self);

    /// Paired with [`Self::suspend_simulation`]; called once the barrier
    /// releases.
    async fn resume_simulation(&self);

    /// Returns the priming commands used to establish the initial network
    /// pipeline depth before the tick loop starts. An empty vector is a
    /// valid answer (no priming).
    async fn fill_commands(&self) -> Vec<Command>;

    /// The terminal callback (§7): called once a fatal condition has torn
    /// the run down — `shutdown.signal()` has already been called and
    /// every execution context is exiting at its next suspension point.
    /// Never called for transient network conditions or protocol misuse by
    /// a peer, which are absorbed without reaching the host at all.
    async fn on_fatal(&self, error: &LockstepError);
}
