//! Sources of the pause between poll cycles.

use rand::Rng;
use std::time::Duration;

/// Produces the wait before the next poll cycle.
pub trait DelaySource {
    fn next_delay(&mut self) -> Duration;
}

/// A delay drawn uniformly from `[min, max]`, to second granularity.
#[derive(Debug, Clone, Copy)]
pub struct UniformDelay {
    min: Duration,
    max: Duration,
}

impl UniformDelay {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }
}

impl DelaySource for UniformDelay {
    fn next_delay(&mut self) -> Duration {
        let secs = rand::rng().random_range(self.min.as_secs()..=self.max.as_secs());
        Duration::from_secs(secs)
    }
}

/// Always the same delay. Zero makes the loop spin without sleeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDelay(pub Duration);

impl DelaySource for FixedDelay {
    fn next_delay(&mut self) -> Duration {
        self.0
    }
}
