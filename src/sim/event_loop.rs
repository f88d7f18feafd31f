//! A minimal discrete-time event scheduler, used by [`super::loopback`] to
//! deliver simulated datagrams in a deterministic order instead of relying
//! on whatever order the real OS scheduler happens to wake tasks in.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, BinaryHeap},
    future::Future,
    pin::Pin,
};
use tokio::sync::Mutex;

/// A future type that can be scheduled.
pub type EventFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

struct Event {
    time: f64,
    id: i64,
    event: EventFuture,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        other.time == self.time
    }
}

impl Eq for Event {}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time)
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An event loop implementation for discrete-time simulation: events carry
/// a logical timestamp used purely to order execution, not to pace it —
/// callers decide how and when to drain pending events.
pub struct EventLoop {
    events: Mutex<BinaryHeap<Event>>,
    cancelled_events: Mutex<BTreeSet<i64>>,
    event_id: Mutex<i64>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self {
            events: Mutex::new(BinaryHeap::new()),
            cancelled_events: Mutex::new(BTreeSet::new()),
            event_id: Mutex::new(0),
        }
    }
}

impl EventLoop {
    /// Creates an empty event loop.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the next event in the loop, if any.
    pub async fn advance(&self) {
        let has_been_cancelled;
        let event;

        {
            let mut events = self.events.lock().await;
            let mut cancelled_events = self.cancelled_events.lock().await;

            event = if let Some(event) = events.pop() {
                event
            } else {
                return;
            };

            has_been_cancelled = cancelled_events.remove(&event.id);
        }

        if !has_been_cancelled {
            event.event.await
        }
    }

    /// Cancels the event with the given id.
    pub async fn cancel(&self, event_id: i64) {
        self.cancelled_events.lock().await.insert(event_id);
    }

    /// Schedules a new event at logical `time`, returning its id.
    pub async fn schedule(&self, event: EventFuture, time: f64) -> i64 {
        let mut events = self.events.lock().await;
        let mut event_id = self.event_id.lock().await;

        let id = *event_id;
        events.push(Event { time, id, event });

        *event_id += 1;
        id
    }

    /// Returns the number of pending events.
    pub async fn pending_count(&self) -> usize {
        self.events.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex as TokioMutex;

    #[tokio::test]
    #[test_log::test]
    async fn schedule_and_advance() {
        let event_loop = EventLoop::default();
        let executed = Arc::new(TokioMutex::new(false));

        let executed_clone = executed.clone();
        event_loop
            .schedule(
                Box::pin(async move {
                    *executed_clone.lock().await = true;
                }),
                1.0,
            )
            .await;

        event_loop.advance().await;
        assert!(*executed.lock().await);
    }

    #[tokio::test]
    #[test_log::test]
    async fn events_run_in_logical_time_order() {
        let event_loop = EventLoop::default();
        let order = Arc::new(TokioMutex::new(Vec::new()));

        for (value, time) in [(3, 3.0), (1, 1.0), (2, 2.0)] {
            let order = order.clone();
            event_loop
                .schedule(Box::pin(async move { order.lock().await.push(value) }), time)
                .await;
        }

        event_loop.advance().await;
        event_loop.advance().await;
        event_loop.advance().await;

        assert_eq!(*order.lock().await, vec![1, 2, 3]);
    }

    #[tokio::test]
    #[test_log::test]
    async fn cancelled_events_do_not_run() {
        let event_loop = EventLoop::default();
        let executed = Arc::new(TokioMutex::new(Vec::new()));

        let executed_clone = executed.clone();
        let id1 = event_loop
            .schedule(
                Box::pin(async move { executed_clone.lock().await.push(1) }),
                1.0,
            )
            .await;

        let executed_clone = executed.clone();
        event_loop
            .schedule(
                Box::pin(async move { executed_clone.lock().await.push(2) }),
                2.0,
            )
            .await;

        event_loop.cancel(id1).await;

        event_loop.advance().await;
        event_loop.advance().await;

        assert_eq!(*executed.lock().await, vec![2]);
    }

    #[tokio::test]
    #[test_log::test]
    async fn pending_count_tracks_the_heap() {
        let event_loop = EventLoop::default();
        assert_eq!(event_loop.pending_count().await, 0);

        event_loop.schedule(Box::pin(async {}), 1.0).await;
        event_loop.schedule(Box::pin(async {}), 2.0).await;
        assert_eq!(event_loop.pending_count().await, 2);

        event_loop.advance().await;
        assert_eq!(event_loop.pending_count().await, 1);
    }

    #[tokio::test]
    #[test_log::test]
    async fn advancing_an_empty_loop_is_a_no_op() {
        let event_loop = EventLoop::default();
        event_loop.advance().await;
        assert_eq!(event_loop.pending_count().await, 0);
    }
}
