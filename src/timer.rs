//! The retransmit countdown timer.
//!
//! Go-Back-N uses a **single** timer for the whole window, tied to the oldest
//! unacknowledged datagram: arm it when the first datagram enters the window,
//! restart it when the window advances but is not empty, stop it when the
//! window drains.  On expiry the caller retransmits every outstanding
//! datagram.

use std::time::{Duration, Instant};

/// A single countdown timer with a fixed duration.
#[derive(Debug)]
pub struct RetransmitTimer {
    /// Countdown duration applied by every [`start`](Self::start).
    rto: Duration,
    /// Expiry instant while armed, `None` while disarmed.
    deadline: Option<Instant>,
}

impl RetransmitTimer {
    /// Create a disarmed timer that counts down `rto` per arm.
    pub fn new(rto: Duration) -> Self {
        Self { rto, deadline: None }
    }

    /// Arm (or re-arm) the timer for a full countdown from now.
    pub fn start(&mut self) {
        self.deadline = Some(Instant::now() + self.rto);
    }

    /// Disarm the timer.  Idempotent.
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    /// `true` while the timer is counting down or expired-but-unhandled.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// `true` once the armed countdown has elapsed.
    ///
    /// A disarmed timer never reports expiry.  The flag stays set until the
    /// timer is restarted or stopped.
    pub fn is_expired(&self) -> bool {
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn disarmed_timer_never_expires() {
        let t = RetransmitTimer::new(Duration::from_millis(1));
        assert!(!t.is_armed());
        assert!(!t.is_expired());
    }

    #[test]
    fn armed_timer_expires_after_duration() {
        let mut t = RetransmitTimer::new(Duration::from_millis(10));
        t.start();
        assert!(t.is_armed());
        assert!(!t.is_expired());

        thread::sleep(Duration::from_millis(20));
        assert!(t.is_expired());
    }

    #[test]
    fn restart_pushes_the_deadline_out() {
        let mut t = RetransmitTimer::new(Duration::from_millis(30));
        t.start();
        thread::sleep(Duration::from_millis(15));
        t.start(); // fresh countdown
        assert!(!t.is_expired());
    }

    #[test]
    fn stop_disarms_and_is_idempotent() {
        let mut t = RetransmitTimer::new(Duration::from_millis(1));
        t.start();
        t.stop();
        t.stop();
        assert!(!t.is_armed());

        thread::sleep(Duration::from_millis(5));
        assert!(!t.is_expired(), "stopped timer must not report expiry");
    }
}
