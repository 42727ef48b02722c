// Local round countdown.
//
// Each client runs its own countdown from the shared `game_time`; the
// server keeps the authoritative deadline. The countdown is tick-driven:
// the owner calls `tick(elapsed)` from its frame or timer loop and reacts to
// `CountdownTick::Expired`, which is reported exactly once. `cancel` stops
// it without expiring. Being a plain value owned by the controller, it stops
// with its owner on every exit path.

use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownTick {
    /// Not running (never started, cancelled, or already expired).
    Idle,
    Running { remaining: Duration },
    /// Reached zero during this tick.
    Expired,
}

#[derive(Clone, Debug, Default)]
pub struct Countdown {
    remaining: Duration,
    running: bool,
}

impl Countdown {
    /// A countdown that is not running.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn start(total: Duration) -> Self {
        Self {
            remaining: total,
            running: true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Whole seconds left, rounded up, for display.
    pub fn seconds_left(&self) -> u64 {
        let secs = self.remaining.as_secs();
        if self.remaining.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    pub fn cancel(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self, elapsed: Duration) -> CountdownTick {
        if !self.running {
            return CountdownTick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.running = false;
            CountdownTick::Expired
        } else {
            CountdownTick::Running {
                remaining: self.remaining,
            }
        }
    }
}
