//! Go-Back-N send-side sliding window.
//!
//! [`SendWindow`] tracks the window bookkeeping for one transfer: the oldest
//! unacknowledged sequence number (`base`), the next sequence number to
//! assign (`next_seq`), and a fixed-capacity ring of the sent-but-unacked
//! datagrams keyed by `seq % size`.
//!
//! # Protocol contract
//!
//! - At most `size` datagrams may be in flight at once.
//! - ACKs are **cumulative**: `ack = K` means the receiver has accepted every
//!   datagram with sequence number ≤ `K`, so a valid ACK advances `base` to
//!   `K + 1`.
//! - On timeout, the caller retransmits **all** unacked datagrams from `base`
//!   onwards (go back to N), exactly as stored.
//! - Sequence numbers are u16 and wrap around; window arithmetic uses
//!   wrapping subtraction, which is correct while the in-flight count never
//!   exceeds the window size.
//!
//! This module only manages state; all socket I/O is the caller's
//! responsibility.

use crate::datagram::Datagram;

/// Sequence number assigned to the first datagram of a transfer.
pub const FIRST_SEQ: u16 = 1;

/// Outcome of feeding one acknowledgement into the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Stale, duplicate, or out-of-range: no state changed.
    Ignored,
    /// `base` advanced and unacknowledged datagrams remain outstanding.
    Advanced,
    /// `base` advanced and caught up with `next_seq`: nothing outstanding.
    Drained,
}

/// Go-Back-N send-side window state for one transfer.
///
/// # Sequence-number layout
///
/// ```text
///     base             next_seq
///      │                  │
///  ────┼──────────────────┼──────────────────▶ seq space
///      │ <── in flight ──▶│ <── sendable ───▶
/// ```
#[derive(Debug)]
pub struct SendWindow {
    /// Sequence number of the **oldest** unacked datagram (left window edge).
    base: u16,

    /// Sequence number to assign to the **next** new datagram.
    next_seq: u16,

    /// Maximum number of datagrams that may be in flight simultaneously (N).
    size: usize,

    /// Ring of in-flight datagrams, indexed by `seq % size`.
    ///
    /// Slot reuse is safe only while the in-flight count stays within `size`;
    /// [`record_sent`](Self::record_sent) asserts that precondition.
    slots: Vec<Option<Datagram>>,

    /// True once the input stream has produced its final (short) chunk.
    all_sent: bool,
}

impl SendWindow {
    /// Create a new [`SendWindow`].
    ///
    /// `start_seq` is the first data sequence number (normally
    /// [`FIRST_SEQ`]).  `size` is the window size N (≥ 1).
    pub fn new(start_seq: u16, size: usize) -> Self {
        assert!(size >= 1, "window size must be at least 1");
        Self {
            base: start_seq,
            next_seq: start_seq,
            size,
            slots: vec![None; size],
            all_sent: false,
        }
    }

    /// Left window edge: the oldest unacknowledged sequence number.
    pub fn base(&self) -> u16 {
        self.base
    }

    /// Sequence number the next new datagram will carry.
    pub fn next_seq(&self) -> u16 {
        self.next_seq
    }

    /// Number of datagrams currently awaiting acknowledgement.
    pub fn in_flight(&self) -> usize {
        self.next_seq.wrapping_sub(self.base) as usize
    }

    /// `true` when at least one datagram is awaiting acknowledgement.
    pub fn has_unacked(&self) -> bool {
        self.base != self.next_seq
    }

    /// `true` when a new datagram may be sent: the window has room and the
    /// input stream has not been exhausted.
    pub fn can_send(&self) -> bool {
        self.in_flight() < self.size && !self.all_sent
    }

    /// `true` once the final (short) chunk of the input has been sent.
    pub fn all_sent(&self) -> bool {
        self.all_sent
    }

    /// Record that the input stream is exhausted: no new data will be sent.
    pub fn mark_all_sent(&mut self) {
        self.all_sent = true;
    }

    /// `true` when every datagram has been sent **and** acknowledged.
    pub fn is_complete(&self) -> bool {
        self.all_sent && self.base == self.next_seq
    }

    /// Place a just-transmitted datagram into the ring and advance `next_seq`.
    ///
    /// # Panics
    ///
    /// Panics if the window is already full (the ring would silently
    /// overwrite an unacknowledged datagram otherwise).  Check
    /// [`can_send`](Self::can_send) before calling.
    pub fn record_sent(&mut self, datagram: Datagram) {
        assert!(
            self.in_flight() < self.size,
            "send window overflow: {} in flight with capacity {}",
            self.in_flight(),
            self.size
        );
        debug_assert_eq!(
            datagram.header.seq, self.next_seq,
            "datagram recorded out of sequence order"
        );
        let slot = datagram.header.seq as usize % self.size;
        self.slots[slot] = Some(datagram);
        self.next_seq = self.next_seq.wrapping_add(1);
    }

    /// Process a cumulative acknowledgement.
    ///
    /// A valid ACK names an in-flight sequence number, i.e. lies in
    /// `[base, next_seq)` in wrap-around space; it advances `base` to
    /// `ack + 1`, acknowledging every datagram up to and including `ack`.
    /// Stale ACKs (below `base`) and ACKs for data never sent are ignored
    /// without any state change.
    pub fn on_ack(&mut self, ack: u16) -> AckOutcome {
        let offset = ack.wrapping_sub(self.base) as usize;
        if offset >= self.in_flight() {
            return AckOutcome::Ignored;
        }

        self.base = ack.wrapping_add(1);
        if self.base == self.next_seq {
            AckOutcome::Drained
        } else {
            AckOutcome::Advanced
        }
    }

    /// Iterate over the stored in-flight datagrams from oldest to newest.
    ///
    /// Used to retransmit the entire unacknowledged window on timeout; the
    /// yielded datagrams are the exact copies recorded at first transmission.
    pub fn outstanding(&self) -> impl Iterator<Item = &Datagram> + '_ {
        (0..self.in_flight() as u16).map(move |i| {
            let seq = self.base.wrapping_add(i);
            self.slots[seq as usize % self.size]
                .as_ref()
                .expect("in-flight sequence number has no stored datagram")
        })
    }
}
