//! The sender engine: drives one transfer from first chunk to terminal marker.
//!
//! [`Session`] owns the whole of the sender state: the sliding window, the
//! single retransmit timer, the chunker over the input stream, and running
//! statistics.  One call to [`tick`](Session::tick) performs one pass of the
//! control loop:
//!
//! 1. **Send step**: while the window has room and data remains, read a
//!    chunk, transmit it as the next sequence number, and store it for
//!    possible retransmission.  The timer is started when the first datagram
//!    enters an empty window; a short chunk marks the stream exhausted.
//! 2. **Receive step**: poll the channel once; a valid cumulative ACK slides
//!    the window and restarts (or, when the window drains, stops) the timer.
//!    Stale and corrupt ACKs are discarded without touching any state.
//! 3. **Timeout step**: on timer expiry, retransmit every outstanding
//!    datagram oldest-first, exactly as stored, and restart the timer.
//!
//! When the window is drained and the stream exhausted the transfer is
//! complete; [`finish`](Session::finish) then emits a single zero-length
//! marker datagram, fire-and-forget, to signal end of file.
//!
//! The engine is synchronous and socket-free: all I/O goes through the
//! [`DatagramChannel`] seam, so tests drive it tick-by-tick with an in-memory
//! channel.  [`run`](Session::run) is the paced async loop the binary uses.

use std::io::Read;
use std::time::Duration;

use thiserror::Error;

use crate::chunker::Chunker;
use crate::datagram::{Datagram, MAX_PAYLOAD};
use crate::timer::RetransmitTimer;
use crate::transport::{DatagramChannel, TransportError};
use crate::window::{AckOutcome, SendWindow, FIRST_SEQ};

/// Delay between engine ticks in [`Session::run`], long enough to avoid
/// spinning a core, short next to any plausible RTO.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Tunable parameters for one transfer session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of datagrams in flight (N).
    pub window_size: usize,
    /// Payload bytes per datagram; a shorter payload marks the final chunk.
    pub max_payload: usize,
    /// Retransmit timeout for the single window timer.
    pub rto: Duration,
    /// Abort after this many consecutive whole-window retransmissions with
    /// no window advance.  `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            max_payload: MAX_PAYLOAD,
            rto: Duration::from_millis(500),
            max_retries: None,
        }
    }
}

/// Errors that abort a transfer.
///
/// Per-datagram corruption, stale ACKs, and timeouts are all handled inside
/// the engine and never surface here.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("failed reading input stream: {0}")]
    Read(#[from] std::io::Error),
    #[error("no acknowledgement after {0} whole-window retransmissions")]
    RetriesExhausted(u32),
}

/// Counters accumulated over one transfer.
#[derive(Debug, Default, Clone)]
pub struct TransferStats {
    /// Datagrams handed to the channel for the first time, marker included.
    pub datagrams_sent: u64,
    /// Datagrams re-sent by timeout handling.
    pub retransmissions: u64,
    /// Valid ACKs that advanced the window.
    pub acks_accepted: u64,
    /// Stale, duplicate, or out-of-range ACKs dropped without effect.
    pub acks_discarded: u64,
    /// Total payload bytes sent (first transmissions only).
    pub payload_bytes: u64,
}

/// Sender-side state for one file transfer.
pub struct Session<R> {
    window: SendWindow,
    timer: RetransmitTimer,
    chunker: Chunker<R>,
    config: SessionConfig,
    stats: TransferStats,
    /// Consecutive timeouts since the window last advanced.
    timeouts_in_a_row: u32,
}

impl<R: Read> Session<R> {
    pub fn new(reader: R, config: SessionConfig) -> Self {
        Self {
            window: SendWindow::new(FIRST_SEQ, config.window_size),
            timer: RetransmitTimer::new(config.rto),
            chunker: Chunker::new(reader, config.max_payload),
            config,
            stats: TransferStats::default(),
            timeouts_in_a_row: 0,
        }
    }

    /// `true` once every chunk has been sent and acknowledged.
    pub fn is_complete(&self) -> bool {
        self.window.is_complete()
    }

    /// Statistics accumulated so far.
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// Perform one pass of the sender control loop.
    pub fn tick<C: DatagramChannel>(&mut self, channel: &mut C) -> Result<(), TransferError> {
        self.send_step(channel)?;
        self.receive_step(channel)?;
        self.timeout_step(channel)
    }

    /// Send the zero-length end-of-file marker.
    ///
    /// Call once after the transfer completes.  The marker consumes the next
    /// sequence number and is never retransmitted or acknowledged.
    pub fn finish<C: DatagramChannel>(&mut self, channel: &mut C) -> Result<(), TransferError> {
        debug_assert!(self.is_complete(), "marker sent before transfer completed");
        let marker = Datagram::data(self.window.next_seq(), Vec::new());
        channel.send(&marker)?;
        self.stats.datagrams_sent += 1;
        log::info!("sent end-of-file marker seq={}", marker.header.seq);
        Ok(())
    }

    /// Drive the transfer to completion, pacing ticks on the tokio clock,
    /// then send the terminal marker and return the final statistics.
    pub async fn run<C: DatagramChannel>(
        mut self,
        channel: &mut C,
    ) -> Result<TransferStats, TransferError> {
        log::info!(
            "starting transfer: window={} payload={} rto={:?}",
            self.config.window_size,
            self.config.max_payload,
            self.config.rto
        );
        while !self.is_complete() {
            self.tick(channel)?;
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        self.finish(channel)?;
        Ok(self.stats)
    }

    fn send_step<C: DatagramChannel>(&mut self, channel: &mut C) -> Result<(), TransferError> {
        if !self.window.can_send() {
            return Ok(());
        }

        let chunk = self.chunker.next_chunk()?;
        let short = chunk.len() < self.config.max_payload;
        let datagram = Datagram::data(self.window.next_seq(), chunk);

        channel.send(&datagram)?;
        log::debug!(
            "→ DATA seq={} len={} in_flight={}",
            datagram.header.seq,
            datagram.payload.len(),
            self.window.in_flight() + 1
        );

        // First datagram of an empty window arms the timer.
        if !self.window.has_unacked() {
            self.timer.start();
        }

        self.stats.datagrams_sent += 1;
        self.stats.payload_bytes += datagram.payload.len() as u64;
        self.window.record_sent(datagram);

        if short {
            self.window.mark_all_sent();
            log::info!(
                "input exhausted; final data seq={}",
                self.window.next_seq().wrapping_sub(1)
            );
        }
        Ok(())
    }

    fn receive_step<C: DatagramChannel>(&mut self, channel: &mut C) -> Result<(), TransferError> {
        let Some(incoming) = channel.poll()? else {
            return Ok(());
        };

        match self.window.on_ack(incoming.header.ack) {
            AckOutcome::Ignored => {
                self.stats.acks_discarded += 1;
                log::debug!(
                    "← stale ACK ack={} (base={}), discarded",
                    incoming.header.ack,
                    self.window.base()
                );
            }
            AckOutcome::Advanced => {
                self.stats.acks_accepted += 1;
                self.timeouts_in_a_row = 0;
                // Fresh deadline for the new oldest outstanding datagram.
                self.timer.start();
                log::debug!(
                    "← ACK ack={} base={} in_flight={}",
                    incoming.header.ack,
                    self.window.base(),
                    self.window.in_flight()
                );
            }
            AckOutcome::Drained => {
                self.stats.acks_accepted += 1;
                self.timeouts_in_a_row = 0;
                self.timer.stop();
                log::debug!("← ACK ack={}; window drained", incoming.header.ack);
            }
        }
        Ok(())
    }

    fn timeout_step<C: DatagramChannel>(&mut self, channel: &mut C) -> Result<(), TransferError> {
        if !self.timer.is_expired() {
            return Ok(());
        }

        self.timeouts_in_a_row += 1;
        if let Some(cap) = self.config.max_retries {
            if self.timeouts_in_a_row > cap {
                return Err(TransferError::RetriesExhausted(cap));
            }
        }

        log::warn!(
            "timeout: retransmitting {} datagram(s) from seq {}",
            self.window.in_flight(),
            self.window.base()
        );
        for datagram in self.window.outstanding() {
            channel.send(datagram)?;
            self.stats.retransmissions += 1;
        }
        self.timer.start();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::thread;

    /// In-memory channel: records every send, replays scripted inbound
    /// datagrams.
    #[derive(Default)]
    struct FakeChannel {
        outbox: Vec<Datagram>,
        inbox: VecDeque<Datagram>,
    }

    impl DatagramChannel for FakeChannel {
        fn send(&mut self, datagram: &Datagram) -> Result<(), TransportError> {
            self.outbox.push(datagram.clone());
            Ok(())
        }

        fn poll(&mut self) -> Result<Option<Datagram>, TransportError> {
            Ok(self.inbox.pop_front())
        }
    }

    fn config(window: usize, payload: usize, rto_ms: u64) -> SessionConfig {
        SessionConfig {
            window_size: window,
            max_payload: payload,
            rto: Duration::from_millis(rto_ms),
            max_retries: None,
        }
    }

    fn session(input: &[u8], cfg: SessionConfig) -> Session<Cursor<Vec<u8>>> {
        Session::new(Cursor::new(input.to_vec()), cfg)
    }

    #[test]
    fn fills_window_then_stalls() {
        let mut ch = FakeChannel::default();
        let mut s = session(&[9u8; 100], config(3, 8, 1000));

        for _ in 0..6 {
            s.tick(&mut ch).unwrap();
        }

        // Window of 3 caps the first transmissions at seqs 1..=3.
        let seqs: Vec<u16> = ch.outbox.iter().map(|d| d.header.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(s.stats().datagrams_sent, 3);
        assert!(!s.is_complete());
    }

    #[test]
    fn whole_window_retransmits_verbatim_on_timeout() {
        let mut ch = FakeChannel::default();
        let mut s = session(&[1u8; 8 * 10], config(10, 8, 10));

        // Fill all 10 window slots; no ACKs arrive.
        for _ in 0..10 {
            s.tick(&mut ch).unwrap();
        }
        let first_pass: Vec<Vec<u8>> = ch.outbox.iter().map(|d| d.encode()).collect();
        assert_eq!(first_pass.len(), 10);

        thread::sleep(Duration::from_millis(20));
        s.tick(&mut ch).unwrap();

        // Exactly seqs 1..=10 again, oldest first, byte-identical.
        assert_eq!(ch.outbox.len(), 20);
        let second_pass: Vec<Vec<u8>> = ch.outbox[10..].iter().map(|d| d.encode()).collect();
        assert_eq!(second_pass, first_pass);
        assert_eq!(s.stats().retransmissions, 10);
    }

    #[test]
    fn repeated_timeouts_leave_window_state_unchanged() {
        let mut ch = FakeChannel::default();
        let mut s = session(&[2u8; 8 * 4], config(4, 8, 5));
        for _ in 0..4 {
            s.tick(&mut ch).unwrap();
        }
        let (base, next) = (s.window.base(), s.window.next_seq());

        for _ in 0..3 {
            thread::sleep(Duration::from_millis(10));
            s.tick(&mut ch).unwrap();
            assert_eq!(s.window.base(), base);
            assert_eq!(s.window.next_seq(), next);
        }
        assert_eq!(s.stats().retransmissions, 12);
    }

    #[test]
    fn partial_ack_advances_and_keeps_timer_armed() {
        let mut ch = FakeChannel::default();
        let mut s = session(&[3u8; 8 * 20], config(8, 8, 1000));

        // base=1, next_seq=8 after seven sends.
        for _ in 0..7 {
            s.tick(&mut ch).unwrap();
        }
        assert_eq!(s.window.next_seq(), 8);

        // Cumulative ACK for seq 5 while more data remains in flight.
        ch.inbox.push_back(Datagram::ack(5));
        s.tick(&mut ch).unwrap();

        assert_eq!(s.window.base(), 6);
        assert!(s.timer.is_armed(), "datagrams remain outstanding");
        assert_eq!(s.stats().acks_accepted, 1);
    }

    #[test]
    fn full_ack_drains_window_and_stops_timer() {
        let mut ch = FakeChannel::default();
        let mut s = session(&[4u8; 8 * 7], config(8, 8, 1000));

        for _ in 0..7 {
            s.tick(&mut ch).unwrap();
        }
        assert_eq!(s.window.next_seq(), 8);

        ch.inbox.push_back(Datagram::ack(7));
        s.tick(&mut ch).unwrap();

        assert_eq!(s.window.base(), 8);
        assert!(!s.timer.is_armed(), "nothing outstanding");
    }

    #[test]
    fn stale_ack_changes_nothing() {
        let mut ch = FakeChannel::default();
        let mut s = session(&[5u8; 8 * 20], config(4, 8, 1000));

        for _ in 0..4 {
            s.tick(&mut ch).unwrap();
        }
        ch.inbox.push_back(Datagram::ack(2));
        s.tick(&mut ch).unwrap();
        assert_eq!(s.window.base(), 3);

        let sent_before = ch.outbox.len();
        // Duplicate of an already-processed ACK.
        ch.inbox.push_back(Datagram::ack(2));
        s.tick(&mut ch).unwrap();

        assert_eq!(s.window.base(), 3);
        assert!(s.timer.is_armed());
        assert_eq!(s.stats().acks_discarded, 1);
        // Any growth of the outbox comes from regular window filling, not
        // from the discarded ACK.
        assert!(ch.outbox.len() >= sent_before);
    }

    #[test]
    fn timer_armed_iff_datagrams_outstanding() {
        let mut ch = FakeChannel::default();
        let mut s = session(&[6u8; 8 * 3], config(8, 8, 1000));

        assert!(!s.timer.is_armed(), "idle before the first send");
        s.tick(&mut ch).unwrap();
        assert!(s.timer.is_armed(), "armed with the first outstanding datagram");

        // Send the rest (seqs 2..=4, last one short).
        for _ in 0..3 {
            s.tick(&mut ch).unwrap();
        }
        ch.inbox.push_back(Datagram::ack(4));
        s.tick(&mut ch).unwrap();
        assert!(!s.timer.is_armed(), "disarmed once the window drains");
        assert!(s.is_complete());
    }

    #[test]
    fn empty_input_sends_empty_datagram_then_marker() {
        let mut ch = FakeChannel::default();
        let mut s = session(&[], config(10, 8, 1000));

        s.tick(&mut ch).unwrap();
        assert_eq!(ch.outbox.len(), 1);
        assert_eq!(ch.outbox[0].header.seq, 1);
        assert!(ch.outbox[0].payload.is_empty());
        assert!(s.window.all_sent());
        assert!(!s.is_complete(), "the empty datagram still needs its ACK");

        ch.inbox.push_back(Datagram::ack(1));
        s.tick(&mut ch).unwrap();
        assert!(s.is_complete());

        s.finish(&mut ch).unwrap();
        assert_eq!(ch.outbox.len(), 2);
        assert_eq!(ch.outbox[1].header.seq, 2);
        assert!(ch.outbox[1].payload.is_empty());
    }

    #[test]
    fn exact_multiple_input_emits_trailing_empty_datagram() {
        let mut ch = FakeChannel::default();
        let mut s = session(&[8u8; 16], config(10, 8, 1000));

        for _ in 0..3 {
            s.tick(&mut ch).unwrap();
        }

        // Two full chunks, then the empty end-of-stream chunk as seq 3.
        let lens: Vec<usize> = ch.outbox.iter().map(|d| d.payload.len()).collect();
        assert_eq!(lens, vec![8, 8, 0]);
        assert!(s.window.all_sent());

        ch.inbox.push_back(Datagram::ack(3));
        s.tick(&mut ch).unwrap();
        assert!(s.is_complete());

        s.finish(&mut ch).unwrap();
        assert_eq!(ch.outbox.last().unwrap().header.seq, 4);
    }

    #[test]
    fn short_final_chunk_stops_new_sends() {
        let mut ch = FakeChannel::default();
        let mut s = session(&[1u8; 12], config(10, 8, 1000));

        // Chunks: 8 bytes (seq 1), 4 bytes short (seq 2).
        for _ in 0..5 {
            s.tick(&mut ch).unwrap();
        }
        assert_eq!(ch.outbox.len(), 2);
        assert!(s.window.all_sent());
        assert_eq!(s.stats().payload_bytes, 12);
    }

    #[test]
    fn retry_cap_aborts_the_transfer() {
        let mut ch = FakeChannel::default();
        let mut cfg = config(4, 8, 5);
        cfg.max_retries = Some(2);
        let mut s = session(&[1u8; 8 * 4], cfg);

        for _ in 0..4 {
            s.tick(&mut ch).unwrap();
        }

        // Two timeouts pass, the third trips the cap.
        for _ in 0..2 {
            thread::sleep(Duration::from_millis(10));
            s.tick(&mut ch).unwrap();
        }
        thread::sleep(Duration::from_millis(10));
        let err = s.tick(&mut ch).unwrap_err();
        assert!(matches!(err, TransferError::RetriesExhausted(2)));
    }

    #[test]
    fn ack_resets_the_retry_counter() {
        let mut ch = FakeChannel::default();
        let mut cfg = config(4, 8, 5);
        cfg.max_retries = Some(2);
        let mut s = session(&[1u8; 8 * 20], cfg);

        for _ in 0..4 {
            s.tick(&mut ch).unwrap();
        }

        for round in 0..4 {
            // One timeout each round, then forward progress.
            thread::sleep(Duration::from_millis(10));
            s.tick(&mut ch).unwrap();
            ch.inbox.push_back(Datagram::ack(s.window.base()));
            s.tick(&mut ch).unwrap();
            assert_eq!(s.timeouts_in_a_row, 0, "round {round}");
        }
    }
}
