use std::time::Duration;

pub const PING_INTERVAL: Duration = Duration::from_millis(500);
/// Samples after which pings are sent less often.
pub const BACKOFF_AFTER: u64 = 32;
pub const BACKOFF_EVERY: u64 = 4;

/// Decides on which interval ticks a client pings.
#[derive(Debug, Clone, Default)]
pub struct PingSchedule {
    ticks: u64,
}

impl PingSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interval(&self) -> Duration {
        PING_INTERVAL
    }

    /// Advances one tick. Returns whether to ping given how many samples exist.
    pub fn tick(&mut self, recorded: u64) -> bool {
        let tick = self.ticks;
        self.ticks += 1;
        recorded < BACKOFF_AFTER || tick % BACKOFF_EVERY == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pings_every_tick_until_backoff() {
        let mut schedule = PingSchedule::new();
        assert!((0..10).all(|_| schedule.tick(5)));

        let mut schedule = PingSchedule::new();
        let sent = (0..16).filter(|_| schedule.tick(BACKOFF_AFTER)).count();
        assert_eq!(sent, 4);
    }
}
