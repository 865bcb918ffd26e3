//! Random delay before device creation
//!
//! Spreads concurrent `create` calls so parallel machine provisioning does not
//! hit the control plane in lockstep.

use rand::Rng;
use std::time::Duration;

pub trait Jitter: Send + Sync {
    /// Delay to wait, at most `max`
    fn delay(&self, max: Duration) -> Duration;
}

/// Uniformly distributed delay in `[0, max)`
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn delay(&self, max: Duration) -> Duration {
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

/// Never delays
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn delay(&self, _max: Duration) -> Duration {
        Duration::ZERO
    }
}
