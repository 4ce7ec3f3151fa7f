//! Cooperative poll loop driving the graphs and the smooth-refresh controller.
//!
//! The scheduler does not own a thread or a timer. The host event loop asks
//! it how long to wait ([`PollScheduler::time_until_next`]), waits, and then
//! hands control back through [`PollScheduler::poll`]. Every tick runs to
//! completion before the next can start, so there is no shared state to lock.

use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::collector::MetricsSource;
use crate::config::{clamp_interval, Config};
use crate::graph::LoadGraph;
use crate::net_scale::NetSample;
use crate::smooth_refresh::SmoothRefresh;
use crate::types::{CounterSnapshot, GraphKind, NetUnit, TickCounters};

/// Notifications for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// The period between ticks changed; any UI-side timer should follow.
    IntervalChanged(Duration),
    /// The network graph committed a new axis maximum (bytes per second).
    NetMaxChanged {
        max: u64,
        value: f64,
        unit: &'static str,
    },
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Whether the metrics source delivered a snapshot.
    pub sampled: bool,
    /// Whether the graphs are on screen and should be repainted.
    pub redraw: bool,
    pub interval_changed: bool,
    /// Period until the next tick.
    pub next_interval: Duration,
    pub net: Option<NetSample>,
}

pub struct PollScheduler<S> {
    source: S,
    config: Config,
    refresh: SmoothRefresh,
    cpu: LoadGraph,
    mem: LoadGraph,
    net: LoadGraph,
    visible: bool,
    interval: Duration,
    deadline: Option<Instant>,
    notifier: Option<Sender<MonitorEvent>>,
    ticks: u64,
}

impl<S: MetricsSource> PollScheduler<S> {
    /// Takes one baseline sample so the controller starts from real counters
    /// and the CPU graph knows how many cores to plot.
    pub fn new(mut source: S, config: Config) -> Self {
        let config = config.clamped();
        let baseline = match source.sample() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("no baseline sample: {}", e);
                None
            }
        };
        let num_cpus = baseline.as_ref().map_or(1, |s| s.cores.len());
        let refresh = SmoothRefresh::new(
            config.update_interval,
            config.smooth_refresh,
            baseline.as_ref().map(CounterSnapshot::tick_counters),
        );
        info!(
            "polling every {}ms, smooth refresh {}, {} CPU series",
            config.update_interval.as_millis(),
            if config.smooth_refresh { "on" } else { "off" },
            num_cpus
        );

        Self {
            cpu: LoadGraph::new(GraphKind::Cpu, num_cpus, &config),
            mem: LoadGraph::new(GraphKind::Mem, num_cpus, &config),
            net: LoadGraph::new(GraphKind::Net, num_cpus, &config),
            interval: config.update_interval,
            source,
            config,
            refresh,
            visible: false,
            deadline: None,
            notifier: None,
            ticks: 0,
        }
    }

    /// Sends [`MonitorEvent`]s to `tx`. A dropped receiver is ignored.
    pub fn with_notifier(mut self, tx: Sender<MonitorEvent>) -> Self {
        self.notifier = Some(tx);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn refresh(&self) -> &SmoothRefresh {
        &self.refresh
    }

    /// Period the next wake-up uses.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn graph(&self, kind: GraphKind) -> &LoadGraph {
        match kind {
            GraphKind::Cpu => &self.cpu,
            GraphKind::Mem => &self.mem,
            GraphKind::Net => &self.net,
        }
    }

    pub fn graph_mut(&mut self, kind: GraphKind) -> &mut LoadGraph {
        match kind {
            GraphKind::Cpu => &mut self.cpu,
            GraphKind::Mem => &mut self.mem,
            GraphKind::Net => &mut self.net,
        }
    }

    fn graphs_mut(&mut self) -> [&mut LoadGraph; 3] {
        [&mut self.cpu, &mut self.mem, &mut self.net]
    }

    /// Ticks once right away, arms the timer and shows the graphs.
    pub fn start(&mut self) -> TickOutcome {
        self.set_visible(true);
        self.deadline = Some(Instant::now());
        self.tick()
    }

    /// Cancels the pending wake-up. State stays consistent; `start` resumes.
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Gates painting only; sampling goes on so the graphs are current when
    /// they come back into view.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        for graph in self.graphs_mut() {
            graph.set_drawing(visible);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// How long the host loop may sleep. `None` when stopped.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Runs a tick if one is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<TickOutcome> {
        match self.deadline {
            Some(deadline) if deadline <= now => Some(self.tick()),
            _ => None,
        }
    }

    /// Samples, feeds every graph, consults the controller and re-arms the
    /// timer one interval after this tick completes.
    pub fn tick(&mut self) -> TickOutcome {
        self.ticks += 1;
        let snapshot = match self.source.sample() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("sampling gap on tick {}: {}", self.ticks, e);
                None
            }
        };

        let net = match &snapshot {
            Some(snapshot) => {
                self.cpu.update(snapshot);
                self.mem.update(snapshot);
                self.net.update(snapshot)
            }
            None => {
                for graph in self.graphs_mut() {
                    graph.skip();
                }
                None
            }
        };

        if let Some(NetSample {
            rescaled: Some((_, max)),
            ..
        }) = net
        {
            self.notify_net_max(max);
        }

        let (changed, controlled) = self
            .refresh
            .get(snapshot.as_ref().map(CounterSnapshot::tick_counters));
        let next = if self.refresh.is_active() {
            controlled
        } else {
            self.config.update_interval
        };
        let interval_changed = changed || next != self.interval;
        if interval_changed {
            self.apply_interval(next);
        }

        if self.deadline.is_some() {
            self.deadline = Some(Instant::now() + self.interval);
        }

        TickOutcome {
            sampled: snapshot.is_some(),
            redraw: self.visible,
            interval_changed,
            next_interval: self.interval,
            net,
        }
    }

    /// Changes the configured period. The controller starts over from it and
    /// a pending wake-up is re-armed with it.
    pub fn set_update_interval(&mut self, interval: Duration) {
        let interval = clamp_interval(interval);
        if interval == self.config.update_interval {
            return;
        }
        info!("update interval set to {}ms", interval.as_millis());
        self.config.update_interval = interval;
        let now = self.current_ticks();
        self.refresh.reset(interval, now);
        self.apply_interval(interval);
        if self.deadline.is_some() {
            self.deadline = Some(Instant::now() + interval);
        }
    }

    pub fn set_smooth_refresh(&mut self, enabled: bool) {
        if enabled == self.config.smooth_refresh {
            return;
        }
        self.config.smooth_refresh = enabled;
        self.refresh.set_active(enabled);
        if enabled {
            let now = self.current_ticks();
            self.refresh.reset(self.config.update_interval, now);
        }
        let interval = self.config.update_interval;
        if interval != self.interval {
            self.apply_interval(interval);
        }
    }

    pub fn set_network_unit(&mut self, unit: NetUnit) {
        if unit == self.config.network_unit {
            return;
        }
        info!("network rates shown in {:?}", unit);
        self.config.network_unit = unit;
        if let Some((_, max)) = self.net.set_network_unit(unit) {
            self.notify_net_max(max);
        }
    }

    fn current_ticks(&mut self) -> Option<TickCounters> {
        match self.source.sample() {
            Ok(snapshot) => Some(snapshot.tick_counters()),
            Err(e) => {
                warn!("cannot re-baseline refresh counters: {}", e);
                None
            }
        }
    }

    fn apply_interval(&mut self, interval: Duration) {
        debug!(
            "tick interval {}ms -> {}ms",
            self.interval.as_millis(),
            interval.as_millis()
        );
        self.interval = interval;
        for graph in self.graphs_mut() {
            graph.set_speed(interval);
        }
        self.notify(MonitorEvent::IntervalChanged(interval));
    }

    fn notify_net_max(&self, max: u64) {
        if let Some((value, unit)) = self.net.display_max() {
            self.notify(MonitorEvent::NetMaxChanged { max, value, unit });
        }
    }

    fn notify(&self, event: MonitorEvent) {
        if let Some(tx) = &self.notifier {
            let _ = tx.send(event);
        }
    }
}
