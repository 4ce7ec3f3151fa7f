//! Read-only knobs consumed by the scheduler.

use std::time::Duration;

use crate::types::NetUnit;

pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_UPDATE_INTERVAL: Duration = Duration::from_secs(100);
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(3);

/// Number of samples a load graph keeps.
pub const NUM_POINTS: usize = 62;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The user's polling period. The refresh controller may stretch it up to
    /// twice this value.
    pub update_interval: Duration,
    pub smooth_refresh: bool,
    pub network_unit: NetUnit,
    pub num_points: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            smooth_refresh: true,
            network_unit: NetUnit::Bytes,
            num_points: NUM_POINTS,
        }
    }
}

impl Config {
    /// Returns a copy with every value inside its legal range.
    ///
    /// Out-of-range input is a policy matter, not an error: it is clamped
    /// silently.
    pub fn clamped(mut self) -> Self {
        self.update_interval = clamp_interval(self.update_interval);
        // A graph needs at least two points to draw a segment.
        self.num_points = self.num_points.max(2);
        self
    }
}

pub fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_UPDATE_INTERVAL, MAX_UPDATE_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_already_in_range() {
        let config = Config::default();
        assert_eq!(config.clone().clamped(), config);
    }

    #[test]
    fn clamped_pulls_interval_into_bounds() {
        let low = Config {
            update_interval: Duration::from_millis(250),
            ..Config::default()
        };
        assert_eq!(low.clamped().update_interval, MIN_UPDATE_INTERVAL);

        let high = Config {
            update_interval: Duration::from_secs(3600),
            ..Config::default()
        };
        assert_eq!(high.clamped().update_interval, MAX_UPDATE_INTERVAL);
    }

    #[test]
    fn clamped_keeps_at_least_two_points() {
        let config = Config {
            num_points: 0,
            ..Config::default()
        };
        assert_eq!(config.clamped().num_points, 2);
    }
}
