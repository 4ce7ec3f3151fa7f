//! Smooth refresh: stretches the polling period while the monitor itself is
//! busy, and eases it back once it calms down.

use std::time::Duration;

use log::{debug, info};

use crate::config::{clamp_interval, MAX_UPDATE_INTERVAL, MIN_UPDATE_INTERVAL};
use crate::types::TickCounters;

/// Own CPU share (percent) above which the interval grows.
pub const PCPU_HI: u32 = 22;
/// Own CPU share (percent) below which a stretched interval shrinks.
pub const PCPU_LO: u32 = 18;

/// Adaptive polling-interval controller.
///
/// Invariant after every call:
/// `config_interval <= interval <= 2 * config_interval`, and
/// `MIN_UPDATE_INTERVAL <= interval <= MAX_UPDATE_INTERVAL`.
///
/// The interval only moves after two consecutive readings on the same side of
/// the thresholds, so one noisy tick never changes it.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothRefresh {
    active: bool,
    config_interval: Duration,
    interval: Duration,
    last_pcpu: u32,
    last_total: u64,
    last_process: u64,
}

impl SmoothRefresh {
    /// `baseline` is the counters at construction time; `None` if the source
    /// could not be read, in which case the first delta starts from zero.
    pub fn new(config_interval: Duration, active: bool, baseline: Option<TickCounters>) -> Self {
        let mut refresh = Self {
            active,
            config_interval,
            interval: config_interval,
            last_pcpu: PCPU_LO,
            last_total: 0,
            last_process: 0,
        };
        refresh.reset(config_interval, baseline);
        refresh
    }

    /// Starts over from `config_interval` with fresh tick baselines.
    ///
    /// Call it whenever the configured interval changes. Calling it twice in
    /// a row with the same arguments leaves the same state as calling it once.
    pub fn reset(&mut self, config_interval: Duration, now: Option<TickCounters>) {
        self.config_interval = clamp_interval(config_interval);
        self.interval = self.config_interval;
        self.last_pcpu = PCPU_LO;
        if let Some(now) = now {
            self.last_total = now.total;
            self.last_process = now.process;
        }
    }

    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        if active {
            info!("smooth refresh is enabled");
        } else {
            info!("smooth refresh is disabled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current controlled interval. Meaningless while inactive: the scheduler
    /// uses [`config_interval`](Self::config_interval) then.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn config_interval(&self) -> Duration {
        self.config_interval
    }

    /// Own CPU share measured on the latest tick.
    pub fn last_self_cpu(&self) -> u32 {
        self.last_pcpu
    }

    /// Advances one tick and returns whether the interval changed, plus the
    /// interval to use for the next wake-up.
    ///
    /// `now` is `None` when the counter source is unavailable; the tick is
    /// then treated as 0 % own usage.
    pub fn get(&mut self, now: Option<TickCounters>) -> (bool, Duration) {
        if !self.active {
            return (false, self.config_interval);
        }

        let pcpu = self.own_cpu_usage(now);
        let config_ms = self.config_interval.as_millis() as u64;
        let interval_ms = self.interval.as_millis() as u64;

        let new_ms = if pcpu > PCPU_HI && self.last_pcpu > PCPU_HI {
            interval_ms * 11 / 10
        } else if interval_ms != config_ms && pcpu < PCPU_LO && self.last_pcpu < PCPU_LO {
            interval_ms * 9 / 10
        } else {
            interval_ms
        };

        let new_ms = new_ms
            .clamp(config_ms, config_ms * 2)
            .clamp(
                MIN_UPDATE_INTERVAL.as_millis() as u64,
                MAX_UPDATE_INTERVAL.as_millis() as u64,
            );
        let new_interval = Duration::from_millis(new_ms);

        let changed = new_interval != self.interval;
        self.interval = new_interval;
        self.last_pcpu = pcpu;

        if changed {
            debug!(
                "CPU usage is {:3}%, changed refresh interval to {}ms (config {}ms)",
                pcpu, new_ms, config_ms
            );
        }

        (changed, new_interval)
    }

    fn own_cpu_usage(&mut self, now: Option<TickCounters>) -> u32 {
        let Some(now) = now else {
            return 0;
        };

        let elapsed = now.total.saturating_sub(self.last_total).max(1);
        let used = now.process.saturating_sub(self.last_process);
        self.last_total = now.total;
        self.last_process = now.process;

        (used.saturating_mul(100) / elapsed).min(100) as u32
    }
}
