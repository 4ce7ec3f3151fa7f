//! A resource monitor whose sampling period tunes itself: CPU, memory/swap and
//! network history graphs fed by a cooperative poll scheduler that backs off
//! when the monitor's own CPU usage gets high.

mod tui;

use std::fs::File;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use sysmon_refresh::{
    Collector, Config, GraphKind, MetricsSource, NetUnit, PollScheduler, TickOutcome,
};

/// Resource monitor with adaptive ("smooth") refresh.
///
/// Samples CPU, memory/swap and network counters on the configured interval.
/// With smooth refresh on, the interval grows by 10% whenever the monitor
/// itself used more than 22% CPU on two consecutive ticks, up to twice the
/// configured value, and shrinks back once usage stays low.
#[derive(Debug, Parser)]
#[clap(version)]
struct Opts {
    /// Configured polling interval in milliseconds (clamped to 1000..=100000).
    #[clap(short = 'i', long, default_value = "3000")]
    interval_ms: u64,

    /// Keep the interval fixed instead of adapting it to the monitor's own
    /// CPU usage.
    #[clap(long, action = clap::ArgAction::SetTrue)]
    no_smooth: bool,

    /// Show network rates in bits per second.
    #[clap(short = 'b', long, action = clap::ArgAction::SetTrue)]
    bits: bool,

    /// Print one log line per tick instead of drawing the dashboard.
    #[clap(long, action = clap::ArgAction::SetTrue)]
    headless: bool,

    /// Stop after this many ticks. Headless mode only.
    #[clap(long)]
    ticks: Option<u64>,

    /// Write logs to this file. Without it the dashboard logs nothing, since
    /// it owns the terminal.
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Enable verbose output, including the scheduler's debug traces.
    /// Specify multiple times to increase verbosity.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Opts {
    fn config(&self) -> Config {
        Config {
            update_interval: Duration::from_millis(self.interval_ms),
            smooth_refresh: !self.no_smooth,
            network_unit: if self.bits {
                NetUnit::Bits
            } else {
                NetUnit::Bytes
            },
            ..Config::default()
        }
        .clamped()
    }
}

fn init_logging(opts: &Opts) -> Result<()> {
    let llv = match opts.verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);

    if let Some(path) = &opts.log_file {
        let file = File::create(path)
            .with_context(|| format!("Error creating log file {}", path.display()))?;
        simplelog::WriteLogger::init(llv, lcfg.build(), file)?;
    } else if opts.headless {
        simplelog::TermLogger::init(
            llv,
            lcfg.build(),
            simplelog::TerminalMode::Stderr,
            simplelog::ColorChoice::Auto,
        )?;
    }
    Ok(())
}

fn report<S: MetricsSource>(scheduler: &PollScheduler<S>, outcome: &TickOutcome) {
    if !outcome.sampled {
        info!("tick {}: no sample", scheduler.ticks());
        return;
    }
    let cpu = scheduler.graph(GraphKind::Cpu).labels().cpu.join(" ");
    let mem = scheduler.graph(GraphKind::Mem).labels();
    let net = scheduler.graph(GraphKind::Net).labels();
    info!(
        "tick {}: cpu [{}] mem {} swap {} net in {} out {} | own cpu {}% next {}ms",
        scheduler.ticks(),
        cpu,
        mem.memory,
        mem.swap,
        net.net_in,
        net.net_out,
        scheduler.refresh().last_self_cpu(),
        outcome.next_interval.as_millis()
    );
}

fn run_headless<S: MetricsSource>(
    mut scheduler: PollScheduler<S>,
    events_rx: mpsc::Receiver<sysmon_refresh::MonitorEvent>,
    limit: Option<u64>,
) {
    let outcome = scheduler.start();
    report(&scheduler, &outcome);

    while limit.map_or(true, |limit| scheduler.ticks() < limit) {
        let wait = scheduler
            .time_until_next(Instant::now())
            .unwrap_or_default();
        std::thread::sleep(wait);
        if let Some(outcome) = scheduler.poll(Instant::now()) {
            report(&scheduler, &outcome);
        }
        for event in events_rx.try_iter() {
            info!("{:?}", event);
        }
    }
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_logging(&opts)?;

    let collector = Collector::new().context("Error initializing metrics collector")?;
    let (tx, rx) = mpsc::channel();
    let scheduler = PollScheduler::new(collector, opts.config()).with_notifier(tx);

    if opts.headless {
        run_headless(scheduler, rx, opts.ticks);
        Ok(())
    } else {
        tui::run(scheduler, rx)
    }
}
