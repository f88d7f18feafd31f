//! The frame-advance barrier: every remote peer's next input must be ready
//! before the local simulation is allowed to execute the current tick.
//!
//! A design this crate explicitly moves away from coupled each `ReceiveQueue`
//! to the barrier by storing a back-reference inside the queue, and
//! reassigned the readiness booleans in a way that raced with a waiter
//! blocked on the old value. Here the queue only ever reports a readiness
//! transition to an injected [`ReadinessNotifier`]; the barrier owns the
//! table and the single wakeup primitive, and the queue holds no reference
//! back to it.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::Notify;

use crate::types::HostId;

/// Per-peer headReady table plus one wakeup primitive, guarded together so
/// that "a head becomes ready" and "wake whoever is waiting" can never be
/// observed out of order by `wait_all_ready` — barrier signalling must stay
/// monotone, never un-readying a peer a waiter has already observed ready.
pub struct Barrier {
    ready: Mutex<HashMap<HostId, bool>>,
    notify: Notify,
}

/// A handle a `ReceiveQueue` uses to report headReady transitions, without
/// retaining any other capability over the barrier.
pub trait ReadinessNotifier: Send + Sync {
    /// Reports the current headReady state for `peer`. Called by the
    /// Receiver (on push) and the TickCoordinator (on pop); idempotent
    /// no-ops are expected and harmless.
    fn set_ready(&self, peer: HostId, ready: bool);
}

impl Barrier {
    /// Creates a barrier tracking exactly the given remote peers. The set of
    /// peers is fixed for the lifetime of the run.
    pub fn new(peers: impl IntoIterator<Item = HostId>) -> Self {
        let ready = peers.into_iter().map(|p| (p, false)).collect();
        Self {
            ready: Mutex::new(ready),
            notify: Notify::new(),
        }
    }

    /// Blocks until every tracked peer is headReady.
    pub async fn wait_all_ready(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.all_ready() {
                return;
            }

            notified.await;
        }
    }

    /// Returns whether every tracked peer is currently headReady, without
    /// blocking. Used by `TickCoordinator::WaitBarrier` to decide whether
    /// the suspend/resume hooks are needed at all.
    pub fn all_ready(&self) -> bool {
        self.ready.lock().unwrap().values().all(|&r| r)
    }
}

impl ReadinessNotifier for Barrier {
    fn set_ready(&self, peer: HostId, ready: bool) {
        let mut table = self.ready.lock().unwrap();
        match table.get_mut(&peer) {
            Some(slot) if *slot != ready => {
                *slot = ready;
                if ready {
                    self.notify.notify_waiters();
                }
            }
            Some(_) => {}
            None => {
                tracing::debug!(peer, "readiness report for untracked peer ignored");
            }
        }
    }
}

/// A notifier for queues that never feed the barrier — the local
/// self-loopback `ReceiveQueue` bypasses the barrier entirely, since the
/// local input is always immediately available.
pub struct NoopNotifier;

impl ReadinessNotifier for NoopNotifier {
    fn set_ready(&self, _peer: HostId, _ready: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    #[test_log::test]
    async fn wait_returns_immediately_when_already_ready() {
        let barrier = Barrier::new([1, 2]);
        barrier.set_ready(1, true);
        barrier.set_ready(2, true);

        tokio::time::timeout(Duration::from_millis(50), barrier.wait_all_ready())
            .await
            .expect("barrier should not block once all peers are ready");
    }

    #[tokio::test]
    #[test_log::test]
    async fn wait_blocks_until_last_peer_becomes_ready() {
        let barrier = Arc::new(Barrier::new([1, 2]));
        barrier.set_ready(1, true);

        let waiter = tokio::spawn({
            let barrier = Arc::clone(&barrier);
            async move { barrier.wait_all_ready().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        barrier.set_ready(2, true);

        tokio::time::timeout(Duration::from_millis(50), waiter)
            .await
            .expect("barrier should release once the last peer is ready")
            .unwrap();
    }

    #[test]
    fn untracked_peer_report_is_ignored() {
        let barrier = Barrier::new([1]);
        barrier.set_ready(99, true);
        assert!(!barrier.all_ready());
    }
}
