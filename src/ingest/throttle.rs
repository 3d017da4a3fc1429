use std::time::Duration;

use tokio::time::Instant;

/// Default minimum spacing between persisted fixes.
pub const WRITE_WINDOW: Duration = Duration::from_millis(5000);

/// Admission state for persistence throttling. Each instance owns its own
/// record of the last admission, so independent throttles never interfere.
pub struct Throttle {
    window: Duration,
    last_admitted: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Throttle {
            window,
            last_admitted: None,
        }
    }

    /// Admit at most one fix per window. The first call always admits.
    /// Admission is recorded here, before the downstream write, so a
    /// failed write does not reset the cadence.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last_admitted {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last_admitted = Some(now);
                true
            }
        }
    }
}
