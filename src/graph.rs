//! A load graph: one rolling chart of CPU, memory/swap or network history.
//!
//! The graph owns its sample ring and the per-kind state needed to turn raw
//! counters into `[0, 1]` fractions, plus the text a UI shows next to it
//! (legend labels and axis captions). It never draws anything itself.

use std::time::Duration;

use crate::config::Config;
use crate::format;
use crate::net_scale::{NetSample, NetworkRateScaler};
use crate::ring::SampleRing;
use crate::types::{CounterSnapshot, CpuTimes, GraphKind, NetUnit, NO_DATA};

/// Number of time captions under the graph.
const TIME_CAPTIONS: u32 = 7;

/// Horizontal gridline count for a chart tall enough for `label_rows`
/// captions. Always divides 100 so percentage captions stay whole.
pub fn num_bars_for_rows(label_rows: u32) -> u32 {
    match label_rows {
        0 | 1 => 1,
        2 | 3 => 2,
        4 => 4,
        _ => 5,
    }
}

/// Legend text, refreshed on every sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Labels {
    pub cpu: Vec<String>,
    pub memory: String,
    pub swap: String,
    pub net_in: String,
    pub net_in_total: String,
    pub net_out: String,
    pub net_out_total: String,
}

#[derive(Debug, Clone)]
enum Calc {
    Cpu { last: Vec<CpuTimes> },
    Mem,
    Net(NetworkRateScaler),
}

#[derive(Debug, Clone)]
pub struct LoadGraph {
    kind: GraphKind,
    data: SampleRing<f32>,
    calc: Calc,
    num_bars: u32,
    speed: Duration,
    draw: bool,
    background_stale: bool,
    labels: Labels,
}

impl LoadGraph {
    /// `num_cpus` only matters for [`GraphKind::Cpu`]: it fixes the number of
    /// series for the lifetime of the graph.
    pub fn new(kind: GraphKind, num_cpus: usize, config: &Config) -> Self {
        let num_bars = num_bars_for_rows(u32::MAX);
        let (series, calc) = match kind {
            GraphKind::Cpu => {
                let n = num_cpus.max(1);
                (n, Calc::Cpu { last: Vec::new() })
            }
            GraphKind::Mem => (2, Calc::Mem),
            GraphKind::Net => (
                2,
                Calc::Net(NetworkRateScaler::new(
                    config.num_points,
                    config.network_unit,
                    num_bars,
                )),
            ),
        };
        let labels = Labels {
            cpu: vec![String::new(); if kind == GraphKind::Cpu { series } else { 0 }],
            ..Labels::default()
        };

        Self {
            kind,
            data: SampleRing::new(config.num_points, series, NO_DATA),
            calc,
            num_bars,
            speed: config.update_interval,
            draw: false,
            background_stale: true,
            labels,
        }
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    pub fn data(&self) -> &SampleRing<f32> {
        &self.data
    }

    /// Value of `series` recorded `age` samples ago, or [`NO_DATA`].
    pub fn fraction(&self, age: usize, series: usize) -> f32 {
        self.data.get(age, series).unwrap_or(NO_DATA)
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Shifts the window by one sample taken from `snapshot`.
    ///
    /// Returns the network sample for network graphs.
    pub fn update(&mut self, snapshot: &CounterSnapshot) -> Option<NetSample> {
        match &mut self.calc {
            Calc::Cpu { last } => {
                let series = self.data.series();
                let mut loads = Vec::with_capacity(series);
                for (i, now) in snapshot.cores.iter().take(series).enumerate() {
                    // before the first sample the baseline is zero, which
                    // yields the average since the source started
                    let prev = last.get(i).copied().unwrap_or_default();
                    let total = now.total.saturating_sub(prev.total) as f32;
                    let used = now.used.saturating_sub(prev.used) as f32;
                    let load = (used / total.max(1.0)).clamp(0.0, 1.0);
                    loads.push(load);
                    self.labels.cpu[i] = format!("{:.1}%", load * 100.0);
                }
                *last = snapshot.cores.clone();
                self.data.push(&loads);
                None
            }
            Calc::Mem => {
                let mem = snapshot.ram.fraction();
                let swap = snapshot.swap.fraction();
                self.labels.memory = usage_label(snapshot.ram.used, snapshot.ram.total, mem);
                self.labels.swap = usage_label(snapshot.swap.used, snapshot.swap.total, swap);
                self.data.push(&[mem, swap]);
                None
            }
            Calc::Net(scaler) => {
                let sample = scaler.update(snapshot.timestamp, snapshot.network, &mut self.data);
                let unit = scaler.unit();
                self.labels.net_in = format::format_network_rate(sample.rate_in, None, unit);
                self.labels.net_out = format::format_network_rate(sample.rate_out, None, unit);
                self.labels.net_in_total =
                    format::format_network(snapshot.network.received_bytes, unit);
                self.labels.net_out_total =
                    format::format_network(snapshot.network.transmitted_bytes, unit);
                if sample.rescaled.is_some() {
                    self.background_stale = true;
                }
                Some(sample)
            }
        }
    }

    /// Shifts the window by one empty slot when no snapshot was available,
    /// keeping this graph aligned in time with the others.
    pub fn skip(&mut self) {
        self.data.push(&[]);
        if let Calc::Net(scaler) = &mut self.calc {
            scaler.skip();
        }
    }

    /// Whether the graph is on screen. Sampling continues either way; only
    /// painting is gated.
    pub fn is_drawing(&self) -> bool {
        self.draw
    }

    pub fn set_drawing(&mut self, draw: bool) {
        self.draw = draw;
    }

    /// Returns and clears the "axis captions need recomputing" flag.
    pub fn take_background_stale(&mut self) -> bool {
        std::mem::take(&mut self.background_stale)
    }

    pub fn is_background_stale(&self) -> bool {
        self.background_stale
    }

    pub fn num_bars(&self) -> u32 {
        self.num_bars
    }

    /// Adapts the gridline count to how many captions fit vertically.
    pub fn set_label_rows(&mut self, label_rows: u32) {
        let num_bars = num_bars_for_rows(label_rows);
        if num_bars == self.num_bars {
            return;
        }
        self.num_bars = num_bars;
        if let Calc::Net(scaler) = &mut self.calc {
            scaler.set_num_bars(num_bars);
        }
        self.background_stale = true;
    }

    pub fn speed(&self) -> Duration {
        self.speed
    }

    /// Records the sampling period, which the time captions depend on.
    pub fn set_speed(&mut self, speed: Duration) {
        if self.speed != speed {
            self.speed = speed;
            self.background_stale = true;
        }
    }

    /// Switches network graphs between bits and bytes. Returns
    /// `(old_max, new_max)` when the axis maximum was re-rounded.
    pub fn set_network_unit(&mut self, unit: NetUnit) -> Option<(u64, u64)> {
        match &mut self.calc {
            Calc::Net(scaler) if scaler.unit() != unit => {
                self.background_stale = true;
                scaler.set_unit(unit, &mut self.data)
            }
            _ => None,
        }
    }

    /// Current network axis maximum in bytes per second.
    pub fn net_max(&self) -> Option<u64> {
        match &self.calc {
            Calc::Net(scaler) => Some(scaler.max()),
            _ => None,
        }
    }

    /// Network axis maximum as `(value, unit)`.
    pub fn display_max(&self) -> Option<(f64, &'static str)> {
        match &self.calc {
            Calc::Net(scaler) => Some(scaler.display_max()),
            _ => None,
        }
    }

    /// Vertical captions from the top gridline down to zero.
    pub fn y_captions(&self) -> Vec<String> {
        let bars = self.num_bars;
        (0..=bars)
            .map(|i| match &self.calc {
                Calc::Net(scaler) => {
                    let max = scaler.max();
                    // widened so a saturated max cannot overflow; the last
                    // caption is exactly 0
                    let step = u128::from(max) * u128::from(i) / u128::from(bars);
                    let rate = max - step as u64;
                    format::format_network_rate(rate, Some(max), scaler.unit())
                }
                _ => format!("{} %", 100 - i * (100 / bars)),
            })
            .collect()
    }

    /// Captions for the time axis, oldest on the left.
    pub fn time_captions(&self) -> Vec<String> {
        let span_points = self.data.points().saturating_sub(2) as u64;
        let total_seconds = self.speed.as_millis() as u64 * span_points / 1000;
        (0..u64::from(TIME_CAPTIONS))
            .map(|i| {
                let seconds = total_seconds - i * total_seconds / u64::from(TIME_CAPTIONS - 1);
                match (i, seconds) {
                    (0, 1) => "1 second".to_string(),
                    (0, _) => format!("{} seconds", seconds),
                    _ => seconds.to_string(),
                }
            })
            .collect()
    }
}

fn usage_label(used: u64, total: u64, fraction: f32) -> String {
    format!(
        "{} ({:.1} %) of {}",
        format::format_size(used),
        fraction * 100.0,
        format::format_size(total)
    )
}
