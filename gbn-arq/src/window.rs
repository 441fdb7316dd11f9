//! Go-Back-N send window and pending-packet store.
//!
//! [`SendWindow`] tracks the sliding window of up to `size` in-flight packets
//! together with the serialized bytes of every one of them, so a timeout can
//! resend exactly what went out the first time.
//!
//! # Protocol contract
//!
//! - At most `size` packets may be in flight at once.
//! - ACKs are **cumulative**: `ack = K` confirms every sequence number `≤ K`.
//! - On timeout, the caller retransmits **all** pending packets from `base`
//!   onwards (go back to N).
//!
//! This module only manages state; timers and socket I/O are the caller's
//! responsibility.

use std::collections::BTreeMap;

/// Result of feeding one acknowledgment into the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// `ack < base`: already confirmed, nothing changes.
    Stale,
    /// `ack ≥ next_seq`: acknowledges a packet that was never sent.
    Unsent,
    /// The window slid; `acked` packets left the store.
    Advanced { acked: u32 },
}

/// Go-Back-N send-side window.
///
/// # Sequence-number layout
///
/// ```text
///    base             next_seq       base + size
///      │                  │                │
///  ────┼──────────────────┼────────────────┼──────▶ seq space
///      │ <── in flight ──▶│ <── sendable ─▶│
/// ```
#[derive(Debug)]
pub struct SendWindow {
    base: u32,
    next_seq: u32,
    size: u32,
    /// Serialized bytes of every in-flight packet; keys are `base..next_seq`.
    pending: BTreeMap<u32, Vec<u8>>,
}

impl SendWindow {
    /// Create an empty window of `size` slots (≥ 1).
    pub fn new(size: u32) -> Self {
        assert!(size >= 1, "window size must be at least 1");
        Self {
            base: 0,
            next_seq: 0,
            size,
            pending: BTreeMap::new(),
        }
    }

    /// Oldest unacknowledged sequence number.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Next sequence number to be sent.
    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of packets awaiting acknowledgement.
    pub fn in_flight(&self) -> u32 {
        self.next_seq - self.base
    }

    pub fn has_unacked(&self) -> bool {
        self.base < self.next_seq
    }

    /// The next sequence number that may go out, if the window and the
    /// session's `total` both allow it.
    pub fn sendable(&self, total: u32) -> Option<u32> {
        let limit = self.base.saturating_add(self.size).min(total);
        (self.next_seq < limit).then_some(self.next_seq)
    }

    /// Store `bytes` as the packet for `next_seq` and advance `next_seq`.
    ///
    /// Returns the sequence number the bytes were filed under.  Check
    /// [`sendable`](Self::sendable) before calling.
    pub fn record_sent(&mut self, bytes: Vec<u8>) -> u32 {
        debug_assert!(
            self.in_flight() < self.size,
            "record_sent called on a full window ({} / {})",
            self.in_flight(),
            self.size
        );
        let seq = self.next_seq;
        self.pending.insert(seq, bytes);
        self.next_seq += 1;
        seq
    }

    /// Process a cumulative ACK for `ack`.
    pub fn on_ack(&mut self, ack: u32) -> AckOutcome {
        if ack < self.base {
            return AckOutcome::Stale;
        }
        if ack >= self.next_seq {
            return AckOutcome::Unsent;
        }
        let acked = ack + 1 - self.base;
        self.pending = self.pending.split_off(&(ack + 1));
        self.base = ack + 1;
        AckOutcome::Advanced { acked }
    }

    /// Every pending packet from `base` to `next_seq - 1`, oldest first.
    ///
    /// A sequence number missing from the store is logged and skipped; in
    /// debug builds it trips an assertion since the store must always cover
    /// the whole in-flight range.
    pub fn retransmit_batch(&self) -> Vec<(u32, Vec<u8>)> {
        let mut batch = Vec::with_capacity(self.in_flight() as usize);
        for seq in self.base..self.next_seq {
            match self.pending.get(&seq) {
                Some(bytes) => batch.push((seq, bytes.clone())),
                None => {
                    log::warn!("[gbn] no pending data for seq={seq}; skipping");
                    debug_assert!(false, "pending store lost seq {seq}");
                }
            }
        }
        batch
    }

    /// `true` when `base ≤ next_seq ≤ base + size` holds and the store keys
    /// are exactly `base..next_seq`.
    pub fn is_consistent(&self) -> bool {
        self.base <= self.next_seq
            && self.in_flight() <= self.size
            && self.pending.len() == self.in_flight() as usize
            && self.pending.keys().copied().eq(self.base..self.next_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(w: &mut SendWindow, total: u32) {
        while let Some(seq) = w.sendable(total) {
            w.record_sent(format!("p{seq}").into_bytes());
        }
    }

    #[test]
    fn initial_state() {
        let w = SendWindow::new(4);
        assert_eq!(w.base(), 0);
        assert_eq!(w.next_seq(), 0);
        assert!(!w.has_unacked());
        assert_eq!(w.sendable(10), Some(0));
        assert!(w.is_consistent());
    }

    #[test]
    #[should_panic(expected = "window size must be at least 1")]
    fn zero_window_rejected() {
        SendWindow::new(0);
    }

    #[test]
    fn window_full_blocks_send() {
        let mut w = SendWindow::new(4);
        fill(&mut w, 15);
        assert_eq!(w.next_seq(), 4);
        assert_eq!(w.in_flight(), 4);
        assert_eq!(w.sendable(15), None);
        assert!(w.is_consistent());
    }

    #[test]
    fn total_caps_the_window() {
        let mut w = SendWindow::new(8);
        fill(&mut w, 3);
        assert_eq!(w.next_seq(), 3);
        assert_eq!(w.sendable(3), None);
    }

    #[test]
    fn ack_slides_window_by_one() {
        let mut w = SendWindow::new(4);
        fill(&mut w, 15);
        assert_eq!(w.on_ack(0), AckOutcome::Advanced { acked: 1 });
        assert_eq!(w.base(), 1);
        assert_eq!(w.sendable(15), Some(4));
        assert!(w.is_consistent());
    }

    #[test]
    fn cumulative_ack_slides_multiple() {
        let mut w = SendWindow::new(4);
        fill(&mut w, 15);
        assert_eq!(w.on_ack(2), AckOutcome::Advanced { acked: 3 });
        assert_eq!(w.base(), 3);
        assert_eq!(w.in_flight(), 1);
        assert!(w.is_consistent());
    }

    #[test]
    fn duplicate_ack_is_stale() {
        let mut w = SendWindow::new(4);
        fill(&mut w, 15);
        assert_eq!(w.on_ack(2), AckOutcome::Advanced { acked: 3 });
        assert_eq!(w.on_ack(2), AckOutcome::Stale);
        assert_eq!(w.on_ack(0), AckOutcome::Stale);
        assert_eq!(w.base(), 3);
        assert!(w.is_consistent());
    }

    #[test]
    fn ack_beyond_next_seq_ignored() {
        let mut w = SendWindow::new(4);
        fill(&mut w, 15);
        assert_eq!(w.on_ack(4), AckOutcome::Unsent);
        assert_eq!(w.on_ack(1000), AckOutcome::Unsent);
        assert_eq!(w.base(), 0);
        assert!(w.is_consistent());
    }

    #[test]
    fn full_ack_empties_store() {
        let mut w = SendWindow::new(4);
        fill(&mut w, 15);
        w.on_ack(3);
        assert!(!w.has_unacked());
        assert!(w.retransmit_batch().is_empty());
        assert!(w.is_consistent());
    }

    #[test]
    fn retransmit_batch_is_ordered_and_unmodified() {
        let mut w = SendWindow::new(4);
        fill(&mut w, 15);
        w.on_ack(1);
        fill(&mut w, 15);

        let batch = w.retransmit_batch();
        let seqs: Vec<u32> = batch.iter().map(|(s, _)| *s).collect();
        assert_eq!(seqs, vec![2, 3, 4, 5]);
        for (seq, bytes) in batch {
            assert_eq!(bytes, format!("p{seq}").into_bytes());
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "pending store lost seq")]
    fn missing_pending_entry_is_flagged() {
        let mut w = SendWindow::new(4);
        fill(&mut w, 15);
        w.pending.remove(&2);
        assert!(!w.is_consistent());
        w.retransmit_batch();
    }

    #[test]
    fn invariants_hold_across_random_walk() {
        let mut w = SendWindow::new(3);
        let total = 40;
        let mut acks = [1u32, 0, 2, 2, 7, 5, 9, 30, 12, 11, 20, 39, 39];
        acks.rotate_left(2);
        for ack in acks {
            fill(&mut w, total);
            let before = w.base();
            w.on_ack(ack);
            assert!(w.base() >= before, "base went backwards");
            assert!(w.in_flight() <= w.size());
            assert!(w.is_consistent());
        }
    }
}
