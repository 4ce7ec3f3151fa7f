use std::net::{IpAddr, Ipv6Addr};
use std::time::Instant;

use chrono::Utc;
use sysinfo::{Networks, Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::errors::{Result, SysmonError};
use crate::types::{CounterSnapshot, CpuTimes, NetworkStats, RamSwapUsage};

/// Where raw counters come from.
///
/// Only the poll scheduler calls this, once per tick. Implementations must
/// not block and must report cumulative counters that never go backwards,
/// short of an external reset.
pub trait MetricsSource {
    fn sample(&mut self) -> Result<CounterSnapshot>;
}

/// Whether an interface's traffic belongs in the machine-wide network total.
///
/// Loopback is skipped, and so is any interface with neither an IPv4 address
/// nor a routable IPv6 one. Interfaces that are merely down still count, so
/// their counters do not show up as a spike when they come back.
pub fn counts_toward_total(name: &str, addrs: &[IpAddr]) -> bool {
    if matches!(name, "lo" | "lo0") || addrs.iter().any(IpAddr::is_loopback) {
        return false;
    }
    addrs.iter().any(|addr| match addr {
        IpAddr::V4(_) => true,
        IpAddr::V6(v6) => !is_link_local(v6),
    })
}

fn is_link_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

/// Busy/elapsed time integrated for one core, in milliseconds.
#[derive(Debug, Clone, Copy, Default)]
struct CoreClock {
    total_ms: f64,
    used_ms: f64,
}

/// Collects counters from the OS through `sysinfo`.
///
/// `sysinfo` reports per-core load as a percentage rather than tick counts,
/// so per-core ticks are integrated here: each sample adds the elapsed wall
/// time to every core's total and the busy share of it to the core's used
/// time. One tick is one millisecond of CPU time.
pub struct Collector {
    sys: System,
    networks: Networks,
    pid: Pid,
    started: Instant,
    last_refresh: Instant,
    cores: Vec<CoreClock>,
}

impl Collector {
    /// Creates a new collector for the current process.
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(SysmonError::SourceUnavailable)?;
        let mut sys = System::new();
        // Initial refresh so the first cpu_usage() has a baseline
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            false,
            ProcessRefreshKind::nothing().with_cpu(),
        );
        let now = Instant::now();
        Ok(Self {
            sys,
            networks: Networks::new_with_refreshed_list(),
            pid,
            started: now,
            last_refresh: now,
            cores: Vec::new(),
        })
    }

    fn network_totals(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();
        for (name, data) in &self.networks {
            let addrs: Vec<IpAddr> = data.ip_networks().iter().map(|net| net.addr).collect();
            if !counts_toward_total(name, &addrs) {
                continue;
            }
            stats.received_bytes += data.total_received();
            stats.transmitted_bytes += data.total_transmitted();
        }
        stats
    }
}

impl MetricsSource for Collector {
    fn sample(&mut self) -> Result<CounterSnapshot> {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            false,
            ProcessRefreshKind::nothing().with_cpu(),
        );
        self.networks.refresh(true);

        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last_refresh).as_secs_f64() * 1000.0;
        self.last_refresh = now;

        let cpus = self.sys.cpus();
        if cpus.is_empty() {
            return Err(SysmonError::SourceUnavailable("no CPUs reported"));
        }
        self.cores.resize(cpus.len(), CoreClock::default());
        for (clock, cpu) in self.cores.iter_mut().zip(cpus) {
            let busy = (f64::from(cpu.cpu_usage()) / 100.0).clamp(0.0, 1.0);
            clock.total_ms += elapsed_ms;
            clock.used_ms += elapsed_ms * busy;
        }
        let cores = self
            .cores
            .iter()
            .map(|clock| CpuTimes {
                total: clock.total_ms as u64,
                used: clock.used_ms as u64,
            })
            .collect::<Vec<_>>();

        let process = self
            .sys
            .process(self.pid)
            .ok_or(SysmonError::ProcessNotFound {
                pid: self.pid.as_u32(),
            })?;

        Ok(CounterSnapshot {
            timestamp: Utc::now(),
            total_cpu_ticks: self.started.elapsed().as_millis() as u64 * cores.len() as u64,
            process_cpu_ticks: process.accumulated_cpu_time(),
            cores,
            ram: RamSwapUsage {
                used: self.sys.used_memory(),
                total: self.sys.total_memory(),
            },
            swap: RamSwapUsage {
                used: self.sys.used_swap(),
                total: self.sys.total_swap(),
            },
            network: self.network_totals(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn loopback_is_never_counted() {
        assert!(!counts_toward_total("lo", &[IpAddr::V4(Ipv4Addr::LOCALHOST)]));
        assert!(!counts_toward_total("lo0", &[]));
        assert!(!counts_toward_total(
            "weird0",
            &[IpAddr::V6(Ipv6Addr::LOCALHOST)]
        ));
    }

    #[test]
    fn addressless_interfaces_are_skipped() {
        assert!(!counts_toward_total("eth1", &[]));
    }

    #[test]
    fn link_local_only_ipv6_is_skipped() {
        let link_local: Ipv6Addr = "fe80::1c2b:3fff:fe4a:1".parse().unwrap();
        assert!(!counts_toward_total("wlan0", &[IpAddr::V6(link_local)]));
    }

    #[test]
    fn routable_addresses_are_counted() {
        let global: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let link_local: Ipv6Addr = "fe80::1".parse().unwrap();
        assert!(counts_toward_total(
            "eth0",
            &[IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))]
        ));
        assert!(counts_toward_total(
            "eth0",
            &[IpAddr::V6(link_local), IpAddr::V6(global)]
        ));
    }

    #[test]
    fn collector_smoke() {
        // Sandboxed CI may hide /proc; only check what we get.
        let Ok(mut collector) = Collector::new() else {
            return;
        };
        if let Ok(snapshot) = collector.sample() {
            assert!(!snapshot.cores.is_empty());
            assert!(snapshot.ram.used <= snapshot.ram.total);
            for core in &snapshot.cores {
                assert!(core.used <= core.total);
            }
        }
    }
}
