//! C1 — the per-sender receive queue.
//!
//! Reassembles a contiguous prefix of one remote participant's input
//! stream, produces cumulative+selective ack snapshots, and reports
//! headReady transitions to an injected [`ReadinessNotifier`] instead of
//! holding a reference back to the barrier.
//!
//! Grounded on `layers/link.rs::Receiver` (out-of-order buffering +
//! in-order delivery), generalized from a 2-ahead NAK scheme to the full
//! sliding-window selective-ack contract implemented here, with the
//! ack-bookkeeping shape borrowed from
//! `other_examples/…laminar…acknowledgment.rs::AcknowledgmentHandler`.

use std::collections::BTreeSet;

use crate::barrier::ReadinessNotifier;
use crate::types::{FrameAck, FrameInput, FrameNumber, HostId};

/// One per remote sender.
pub struct ReceiveQueue {
    peer: HostId,
    base: FrameNumber,
    capacity: u64,
    buffer: Vec<Option<FrameInput>>,
    /// `lastInOrder + 1`: the next frame number that would extend the
    /// contiguous run. Kept as "+1" rather than `lastInOrder` itself so the
    /// all-`u64` representation never needs to express `base - 1` when
    /// `base == 0` (the first frame, before anything has been received).
    contiguous_next: FrameNumber,
    selective: BTreeSet<FrameNumber>,
    duplicates_dropped: u64,
    out_of_window_dropped: u64,
}

impl ReceiveQueue {
    /// Creates a queue starting at `base` with `capacity` slots.
    pub fn new(peer: HostId, base: FrameNumber, capacity: usize) -> Self {
        assert!(capacity > 0, "ReceiveQueue capacity must be nonzero");
        Self {
            peer,
            base,
            capacity: capacity as u64,
            buffer: vec![None; capacity],
            contiguous_next: base,
            selective: BTreeSet::new(),
            duplicates_dropped: 0,
            out_of_window_dropped: 0,
        }
    }

    /// The next frame number that will be extracted by `pop`.
    pub fn base(&self) -> FrameNumber {
        self.base
    }

    /// True iff the slot at `base` is occupied ("headReady").
    pub fn head_ready(&self) -> bool {
        self.slot_at(self.base).is_some()
    }

    /// Number of frames dropped for arriving at an already-filled slot.
    pub fn duplicates_dropped(&self) -> u64 {
        self.duplicates_dropped
    }

    /// Number of frames dropped for arriving outside the acceptance window.
    pub fn out_of_window_dropped(&self) -> u64 {
        self.out_of_window_dropped
    }

    fn slot_index(&self, frame_number: FrameNumber) -> Option<usize> {
        let offset = frame_number.offset_from(self.base)?;
        if offset >= self.capacity {
            return None;
        }
        Some((offset % self.capacity) as usize)
    }

    fn slot_at(&self, frame_number: FrameNumber) -> Option<&FrameInput> {
        self.slot_index(frame_number)
            .and_then(|idx| self.buffer[idx].as_ref())
    }

    /// Drains `selective` entries that are now contiguous with
    /// `contiguous_next`, advancing it as far as the buffered run allows.
    fn absorb_contiguous_run(&mut self) {
        while let Some(&first) = self.selective.iter().next() {
            if first == self.contiguous_next {
                self.selective.remove(&first);
                self.contiguous_next = self.contiguous_next.next();
            } else {
                break;
            }
        }
    }

    /// Current cumulative+selective ack snapshot, without mutating state.
    pub fn ack(&self) -> FrameAck {
        FrameAck {
            cumulative_ack: self.contiguous_next.0.checked_sub(1).map(FrameNumber),
            selective_acks: self.selective.clone(),
        }
    }

    /// Accepts one frame. Returns the ack snapshot
    /// reflecting the queue state *after* this frame was applied, whether
    /// or not it actually changed anything.
    pub fn push(&mut self, frame: FrameInput, notifier: &dyn ReadinessNotifier) -> FrameAck {
        let Some(offset) = frame.frame_number.offset_from(self.base) else {
            // frame_number < base: already delivered.
            self.out_of_window_dropped += 1;
            tracing::debug!(
                peer = self.peer,
                frame = %frame.frame_number,
                base = %self.base,
                "dropping frame below window"
            );
            return self.ack();
        };
        if offset >= self.capacity {
            self.out_of_window_dropped += 1;
            tracing::debug!(
                peer = self.peer,
                frame = %frame.frame_number,
                base = %self.base,
                capacity = self.capacity,
                "dropping frame beyond window"
            );
            return self.ack();
        }

        let idx = (offset % self.capacity) as usize;
        if self.buffer[idx].is_some() {
            self.duplicates_dropped += 1;
            return self.ack();
        }

        let frame_number = frame.frame_number;
        self.buffer[idx] = Some(frame);

        if frame_number == self.contiguous_next {
            self.contiguous_next = self.contiguous_next.next();
            self.absorb_contiguous_run();
        } else {
            self.selective.insert(frame_number);
        }

        if frame_number == self.base {
            notifier.set_ready(self.peer, true);
        }

        self.ack()
    }

    /// Accepts a batch of frames, applying each in order, and returns only
    /// the final ack snapshot — matching how the Receiver piggybacks one
    /// ack per inbound `FrameInputBatch`.
    pub fn push_batch(
        &mut self,
        frames: impl IntoIterator<Item = FrameInput>,
        notifier: &dyn ReadinessNotifier,
    ) -> FrameAck {
        let mut ack = self.ack();
        for frame in frames {
            ack = self.push(frame, notifier);
        }
        ack
    }

    /// Extracts the input at `base`, if present. Single consumer only.
    pub fn pop(&mut self, notifier: &dyn ReadinessNotifier) -> Option<FrameInput> {
        let idx = self.slot_index(self.base)?;
        let input = self.buffer[idx].take()?;
        self.base = self.base.next();

        let next_ready = self.head_ready();
        notifier.set_ready(self.peer, next_ready);

        Some(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrier::Barrier;

    fn frame(n: u64) -> FrameInput {
        FrameInput::new(FrameNumber(n), vec![n as u8])
    }

    /// S1 — in-order pushes, four pops.
    #[test]
    fn s1_in_order() {
        let notifier = Barrier::new([7]);
        let mut q = ReceiveQueue::new(7, FrameNumber(0), 8);

        for n in 0..4 {
            q.push(frame(n), &notifier);
        }

        for n in 0..4 {
            let popped = q.pop(&notifier).expect("frame should be ready");
            assert_eq!(popped.frame_number, FrameNumber(n));
        }

        assert_eq!(q.base(), FrameNumber(4));
        assert_eq!(
            q.ack(),
            FrameAck {
                cumulative_ack: Some(FrameNumber(3)),
                selective_acks: BTreeSet::new(),
            }
        );
    }

    /// S2 — reorder: push 2,0,1,4,3 and check the ack snapshot after each.
    #[test]
    fn s2_reorder() {
        let notifier = Barrier::new([1]);
        let mut q = ReceiveQueue::new(1, FrameNumber(0), 8);

        let acks: Vec<FrameAck> = [2u64, 0, 1, 4, 3]
            .into_iter()
            .map(|n| q.push(frame(n), &notifier))
            .collect();

        let cumulative: Vec<Option<u64>> = acks.iter().map(|a| a.cumulative_ack.map(|f| f.0)).collect();
        assert_eq!(cumulative, vec![None, Some(0), Some(2), Some(2), Some(4)]);

        let selective: Vec<BTreeSet<u64>> = acks
            .iter()
            .map(|a| a.selective_acks.iter().map(|f| f.0).collect())
            .collect();
        assert_eq!(
            selective,
            vec![
                BTreeSet::from([2]),
                BTreeSet::from([2]),
                BTreeSet::new(),
                BTreeSet::from([4]),
                BTreeSet::new(),
            ]
        );

        for n in 0..5 {
            let popped = q.pop(&notifier).expect("frame should be ready");
            assert_eq!(popped.frame_number, FrameNumber(n));
        }
    }

    /// S3 — duplicate pushes collapse to a single deliverable frame.
    #[test]
    fn s3_duplicate() {
        let notifier = Barrier::new([1]);
        let mut q = ReceiveQueue::new(1, FrameNumber(0), 8);

        q.push(frame(0), &notifier);
        q.push(frame(0), &notifier);
        q.push(frame(0), &notifier);

        assert_eq!(q.duplicates_dropped(), 2);

        let popped = q.pop(&notifier).unwrap();
        assert_eq!(popped.frame_number, FrameNumber(0));
        assert!(q.pop(&notifier).is_none());
    }

    /// S4 — a frame outside the window never mutates state.
    #[test]
    fn s4_out_of_window() {
        let notifier = Barrier::new([1]);
        let mut q = ReceiveQueue::new(1, FrameNumber(0), 4);

        let ack = q.push(frame(5), &notifier);

        assert_eq!(ack.cumulative_ack, None);
        assert!(ack.selective_acks.is_empty());
        assert_eq!(q.out_of_window_dropped(), 1);
        assert!(!q.head_ready());
    }

    #[test]
    fn pop_signals_not_ready_when_next_slot_empty() {
        struct Observed(std::sync::Mutex<Vec<(HostId, bool)>>);
        impl ReadinessNotifier for Observed {
            fn set_ready(&self, peer: HostId, ready: bool) {
                self.0.lock().unwrap().push((peer, ready));
            }
        }

        let observed = Observed(std::sync::Mutex::new(Vec::new()));
        let mut q = ReceiveQueue::new(3, FrameNumber(0), 8);

        q.push(frame(0), &observed);
        q.pop(&observed);

        let log = observed.0.lock().unwrap();
        assert_eq!(*log, vec![(3, true), (3, false)]);
    }

    // §8 universal properties, checked against randomized inputs rather
    // than the fixed S1-S4 scenarios above.
    mod properties {
        use super::*;
        use proptest::prelude::*;

        const CAPACITY: usize = 16;

        /// Property 1 (ordering): for any push order over frame numbers
        /// inside the window (duplicates allowed — §8 property 3 covers
        /// those separately), the pops that succeed return exactly
        /// `base, base+1, …` with no gaps and no reordering.
        #[test]
        fn ordering_holds_for_any_push_order() {
            proptest!(|(pushes in proptest::collection::vec(0u64..CAPACITY as u64, 1..40))| {
                let notifier = Barrier::new([1]);
                let mut q = ReceiveQueue::new(1, FrameNumber(0), CAPACITY);
                for n in pushes {
                    q.push(frame(n), &notifier);
                }

                let mut popped = Vec::new();
                while let Some(input) = q.pop(&notifier) {
                    popped.push(input.frame_number.0);
                }

                for window in popped.windows(2) {
                    prop_assert_eq!(window[1], window[0] + 1);
                }
                if let Some(&first) = popped.first() {
                    prop_assert_eq!(first, 0);
                }
            });
        }

        /// Property 2 (ack monotonicity): across a random sequence of
        /// pushes, `cumulative_ack` never decreases, and a frame number
        /// that has entered `cumulative_ack` never reappears in
        /// `selective_acks`.
        #[test]
        fn cumulative_ack_is_monotone_and_selective_never_repeats_it() {
            proptest!(|(frames in proptest::collection::vec(0u64..(CAPACITY as u64 * 2), 1..40))| {
                let notifier = Barrier::new([1]);
                let mut q = ReceiveQueue::new(1, FrameNumber(0), CAPACITY);
                let mut last_cumulative: Option<u64> = None;

                for n in frames {
                    let ack = q.push(frame(n), &notifier);
                    let cumulative = ack.cumulative_ack.map(|f| f.0);

                    if let (Some(prev), Some(cur)) = (last_cumulative, cumulative) {
                        prop_assert!(cur >= prev);
                    }
                    if let Some(cur) = cumulative {
                        prop_assert!(!ack.selective_acks.contains(&FrameNumber(cur)));
                        for &s in &ack.selective_acks {
                            prop_assert!(s.0 > cur);
                        }
                    }

                    last_cumulative = cumulative.or(last_cumulative);
                }
            });
        }

        /// Property 3 (idempotence): pushing the same frame twice leaves
        /// the queue in the same observable state (base, headReady, ack
        /// snapshot) as pushing it once.
        #[test]
        fn duplicate_push_does_not_change_observable_state() {
            proptest!(|(n in 0u64..CAPACITY as u64)| {
                let notifier_a = Barrier::new([1]);
                let mut q_once = ReceiveQueue::new(1, FrameNumber(0), CAPACITY);
                q_once.push(frame(n), &notifier_a);

                let notifier_b = Barrier::new([1]);
                let mut q_twice = ReceiveQueue::new(1, FrameNumber(0), CAPACITY);
                q_twice.push(frame(n), &notifier_b);
                q_twice.push(frame(n), &notifier_b);

                prop_assert_eq!(q_once.base(), q_twice.base());
                prop_assert_eq!(q_once.head_ready(), q_twice.head_ready());
                prop_assert_eq!(q_once.ack(), q_twice.ack());
            });
        }

        /// Property 4 (window closure): a frame outside
        /// `[base, base+capacity-1]` never mutates queue state.
        #[test]
        fn frame_outside_window_never_mutates_state() {
            proptest!(|(offset in (CAPACITY as u64)..(CAPACITY as u64 * 4))| {
                let notifier = Barrier::new([1]);
                let mut q = ReceiveQueue::new(1, FrameNumber(0), CAPACITY);

                let before = q.ack();
                let dropped_before = q.out_of_window_dropped();

                q.push(frame(offset), &notifier);

                prop_assert_eq!(q.ack(), before);
                prop_assert_eq!(q.base(), FrameNumber(0));
                prop_assert!(!q.head_ready());
                prop_assert_eq!(q.out_of_window_dropped(), dropped_before + 1);
            });
        }
    }
}
