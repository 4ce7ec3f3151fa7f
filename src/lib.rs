//! Self-tuning sampling core of a resource monitor.
//!
//! A [`PollScheduler`] pulls raw counters from a [`MetricsSource`] on a period
//! chosen by the [`SmoothRefresh`] controller, which stretches the period when
//! the monitor itself gets expensive. Each sample shifts the rolling CPU,
//! memory/swap and network [`LoadGraph`]s; the network graph keeps its
//! vertical scale on round numbers through a [`NetworkRateScaler`].

pub mod collector;
pub mod config;
pub mod errors;
pub mod format;
pub mod graph;
pub mod net_scale;
pub mod ring;
pub mod scheduler;
pub mod smooth_refresh;
pub mod types;

pub use collector::{Collector, MetricsSource};
pub use config::Config;
pub use errors::{Result, SysmonError};
pub use graph::LoadGraph;
pub use net_scale::NetworkRateScaler;
pub use ring::SampleRing;
pub use scheduler::{MonitorEvent, PollScheduler, TickOutcome};
pub use smooth_refresh::SmoothRefresh;
pub use types::{CounterSnapshot, GraphKind, NetUnit};
