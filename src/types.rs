use chrono::{DateTime, Utc};

/// Value of a ring slot that has never been written. Consumers skip it.
pub const NO_DATA: f32 = -1.0;

/// Cumulative CPU time for a single core, in ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub total: u64,
    pub used: u64,
}

/// RAM or swap usage in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RamSwapUsage {
    pub used: u64,
    pub total: u64,
}

impl RamSwapUsage {
    /// Used share of the total; `0.0` when there is nothing to use (no swap).
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.used as f64 / self.total as f64).clamp(0.0, 1.0) as f32
        }
    }
}

/// Cumulative network statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub received_bytes: u64,
    pub transmitted_bytes: u64,
}

/// The pair of counters the refresh controller derives its own CPU share from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickCounters {
    /// CPU ticks elapsed on the whole machine, all cores summed.
    pub total: u64,
    /// CPU ticks consumed by the monitor process itself.
    pub process: u64,
}

/// One poll's worth of raw counters.
///
/// Built fresh by a [`MetricsSource`](crate::collector::MetricsSource) on every
/// tick and dropped once the graphs have derived their values from it.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cores: Vec<CpuTimes>,
    pub total_cpu_ticks: u64,
    pub process_cpu_ticks: u64,
    pub ram: RamSwapUsage,
    pub swap: RamSwapUsage,
    pub network: NetworkStats,
}

impl CounterSnapshot {
    pub fn tick_counters(&self) -> TickCounters {
        TickCounters {
            total: self.total_cpu_ticks,
            process: self.process_cpu_ticks,
        }
    }
}

/// Which quantity a load graph plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphKind {
    /// One series per CPU core.
    Cpu,
    /// Memory then swap.
    Mem,
    /// Received then transmitted.
    Net,
}

/// How network rates are displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetUnit {
    #[default]
    Bytes,
    Bits,
}

impl NetUnit {
    pub fn toggled(self) -> Self {
        match self {
            NetUnit::Bytes => NetUnit::Bits,
            NetUnit::Bits => NetUnit::Bytes,
        }
    }
}
