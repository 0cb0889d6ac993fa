//! Client-side session countdown.
//!
//! The countdown runs on the client and is cooperative: the client ticks it
//! with elapsed wall time, cancels it on teardown, and calls the completion
//! reducer when it expires. The server only records reported remaining time
//! (see [`reconcile_time_remaining`]) and never enforces the deadline itself.

/// What a tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Still running, whole seconds left (rounded up).
    Tick { remaining: u32 },
    /// Reached zero on this tick. Emitted exactly once.
    Expired,
    /// Already expired or cancelled; nothing to do.
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    remaining: f32,
    stopped: bool,
}

impl Countdown {
    pub fn new(seconds: u32) -> Self {
        Self {
            remaining: seconds as f32,
            stopped: false,
        }
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining.max(0.0).ceil() as u32
    }

    pub fn is_running(&self) -> bool {
        !self.stopped
    }

    /// Advance by `elapsed` seconds. Negative or NaN input is ignored.
    pub fn tick(&mut self, elapsed: f32) -> TimerEvent {
        if self.stopped {
            return TimerEvent::Stopped;
        }
        if elapsed.is_finite() && elapsed > 0.0 {
            self.remaining = (self.remaining - elapsed).max(0.0);
        }
        if self.remaining <= 0.0 {
            self.stopped = true;
            TimerEvent::Expired
        } else {
            TimerEvent::Tick {
                remaining: self.remaining_seconds(),
            }
        }
    }

    /// Stop without expiring, e.g. when the game screen is torn down.
    pub fn cancel(&mut self) {
        self.stopped = true;
    }
}

/// Remaining time after a client report. Time can only run down.
pub fn reconcile_time_remaining(stored: u32, reported: u32) -> u32 {
    stored.min(reported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_runs_down() {
        let mut c = Countdown::new(3);
        assert_eq!(c.tick(1.0), TimerEvent::Tick { remaining: 2 });
        assert_eq!(c.tick(0.5), TimerEvent::Tick { remaining: 2 });
        assert_eq!(c.tick(0.5), TimerEvent::Tick { remaining: 1 });
        assert_eq!(c.tick(1.0), TimerEvent::Expired);
        assert_eq!(c.remaining_seconds(), 0);
    }

    #[test]
    fn test_expired_fires_once() {
        let mut c = Countdown::new(1);
        assert_eq!(c.tick(5.0), TimerEvent::Expired);
        assert_eq!(c.tick(1.0), TimerEvent::Stopped);
        assert!(!c.is_running());
    }

    #[test]
    fn test_zero_length_expires_on_first_tick() {
        let mut c = Countdown::new(0);
        assert_eq!(c.tick(0.0), TimerEvent::Expired);
    }

    #[test]
    fn test_cancel_stops_without_expiry() {
        let mut c = Countdown::new(10);
        c.tick(2.0);
        c.cancel();
        assert_eq!(c.tick(100.0), TimerEvent::Stopped);
        assert_eq!(c.remaining_seconds(), 8);
    }

    #[test]
    fn test_bad_elapsed_ignored() {
        let mut c = Countdown::new(10);
        assert_eq!(c.tick(-3.0), TimerEvent::Tick { remaining: 10 });
        assert_eq!(c.tick(f32::NAN), TimerEvent::Tick { remaining: 10 });
    }

    #[test]
    fn test_reconcile_only_decreases() {
        assert_eq!(reconcile_time_remaining(300, 250), 250);
        assert_eq!(reconcile_time_remaining(250, 600), 250);
        assert_eq!(reconcile_time_remaining(10, 0), 0);
    }
}
