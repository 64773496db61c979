use serde::{Deserialize, Serialize};

/// Elapsed-time bookkeeping for one game session.
///
/// The clock owns no timing source. The host delivers a periodic one-second
/// `tick()` and the clock counts it only while active; engines start the
/// clock when play begins and stop it on every terminal transition, so ticks
/// arriving after a game ended are never counted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClock {
    active: bool,
    elapsed_secs: u32,
}

impl SessionClock {
    pub const fn new() -> Self {
        Self {
            active: false,
            elapsed_secs: 0,
        }
    }

    pub const fn is_active(self) -> bool {
        self.active
    }

    pub const fn elapsed_secs(self) -> u32 {
        self.elapsed_secs
    }

    pub fn start(&mut self) {
        if !self.active {
            log::debug!("clock started at {}s", self.elapsed_secs);
            self.active = true;
        }
    }

    pub fn stop(&mut self) {
        if self.active {
            log::debug!("clock stopped at {}s", self.elapsed_secs);
            self.active = false;
        }
    }

    /// Counts one second of play. No-op while the clock is inactive.
    pub fn tick(&mut self) {
        if self.active {
            self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
