//! The shared stop flag every execution context observes at its next
//! suspension point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cloneable handle shared by the Receiver, Transmitter, and
/// TickCoordinator tasks. Signalling is one-shot and idempotent.
#[derive(Clone)]
pub struct Shutdown {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self {
            stopped: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }
}

impl Shutdown {
    /// Creates a fresh, unsignalled shutdown handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Safe to call more than once or from more than
    /// one task.
    pub fn signal(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Non-blocking check, used to gate the next loop iteration.
    pub fn is_signalled(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Resolves as soon as shutdown is signalled, immediately if it already
    /// was (uses the `enable()` pattern to avoid the missed-wakeup race
    /// between the check and the wait).
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_signalled() {
                return;
            }

            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    #[test_log::test]
    async fn wait_resolves_immediately_once_signalled() {
        let shutdown = Shutdown::new();
        shutdown.signal();
        tokio::time::timeout(Duration::from_millis(20), shutdown.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    #[test_log::test]
    async fn wait_blocks_until_signalled() {
        let shutdown = Shutdown::new();
        let waiter = shutdown.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        shutdown.signal();
        tokio::time::timeout(Duration::from_millis(50), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
