//! Host statistics: uptime, memory totals, per-interface byte/packet
//! counters. Out of scope per spec.md §1, but simple enough (reading
//! virtual files under `/proc`) that a real implementation costs nothing
//! extra, unlike the sensor/GPIO/transport seams above.
use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct InterfaceCounters {
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
}

#[async_trait]
pub trait HostStats: Send + Sync {
    async fn uptime_seconds(&self) -> Result<f64>;
    async fn memory_totals_kb(&self) -> Result<(u64, u64)>; // (total, available)
    async fn interface_counters(&self, interface: &str) -> Result<InterfaceCounters>;
}

/// Reads `/proc/uptime`, `/proc/meminfo`, and `/proc/net/dev` directly, as
/// spec.md §6 describes ("reading virtual files under the host OS's
/// process-information tree").
#[derive(Debug, Default)]
pub struct LinuxHostStats;

#[async_trait]
impl HostStats for LinuxHostStats {
    async fn uptime_seconds(&self) -> Result<f64> {
        let contents = tokio::fs::read_to_string("/proc/uptime").await?;
        let first = contents
            .split_whitespace()
            .next()
            .ok_or_else(|| Error::InvalidArgument("malformed /proc/uptime".into()))?;
        first
            .parse::<f64>()
            .map_err(|e| Error::InvalidArgument(format!("malformed /proc/uptime: {e}")))
    }

    async fn memory_totals_kb(&self) -> Result<(u64, u64)> {
        let contents = tokio::fs::read_to_string("/proc/meminfo").await?;
        let fields = parse_meminfo(&contents);
        let total = *fields
            .get("MemTotal")
            .ok_or_else(|| Error::InvalidArgument("missing MemTotal in /proc/meminfo".into()))?;
        let available = *fields
            .get("MemAvailable")
            .ok_or_else(|| Error::InvalidArgument("missing MemAvailable in /proc/meminfo".into()))?;
        Ok((total, available))
    }

    async fn interface_counters(&self, interface: &str) -> Result<InterfaceCounters> {
        let contents = tokio::fs::read_to_string("/proc/net/dev").await?;
        parse_net_dev(&contents, interface)
            .ok_or_else(|| Error::InvalidArgument(format!("no such interface `{interface}`")))
    }
}

fn parse_meminfo(contents: &str) -> HashMap<String, u64> {
    contents
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let value = rest.split_whitespace().next()?;
            Some((key.trim().to_string(), value.parse().ok()?))
        })
        .collect()
}

fn parse_net_dev(contents: &str, interface: &str) -> Option<InterfaceCounters> {
    for line in contents.lines() {
        let (name, rest) = line.split_once(':')?;
        if name.trim() != interface {
            continue;
        }
        let fields: Vec<u64> = rest
            .split_whitespace()
            .filter_map(|f| f.parse().ok())
            .collect();
        // /proc/net/dev columns: rx_bytes rx_packets ... tx_bytes tx_packets ...
        return Some(InterfaceCounters {
            rx_bytes: *fields.first()?,
            rx_packets: *fields.get(1)?,
            tx_bytes: *fields.get(8)?,
            tx_packets: *fields.get(9)?,
        });
    }
    None
}

/// A deterministic in-memory implementation for tests.
#[derive(Debug, Clone)]
pub struct SimulatedHostStats {
    pub uptime_seconds: f64,
    pub total_kb: u64,
    pub available_kb: u64,
    pub counters: InterfaceCounters,
}

impl Default for SimulatedHostStats {
    fn default() -> Self {
        Self {
            uptime_seconds: 12_345.0,
            total_kb: 2_048_000,
            available_kb: 1_024_000,
            counters: InterfaceCounters {
                rx_bytes: 1000,
                rx_packets: 10,
                tx_bytes: 500,
                tx_packets: 5,
            },
        }
    }
}

#[async_trait]
impl HostStats for SimulatedHostStats {
    async fn uptime_seconds(&self) -> Result<f64> {
        Ok(self.uptime_seconds)
    }

    async fn memory_totals_kb(&self) -> Result<(u64, u64)> {
        Ok((self.total_kb, self.available_kb))
    }

    async fn interface_counters(&self, _interface: &str) -> Result<InterfaceCounters> {
        Ok(self.counters.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_meminfo_fields() {
        let sample = "MemTotal:        2048000 kB\nMemAvailable:    1024000 kB\n";
        let fields = parse_meminfo(sample);
        assert_eq!(fields.get("MemTotal"), Some(&2_048_000));
        assert_eq!(fields.get("MemAvailable"), Some(&1_024_000));
    }

    #[test]
    fn parses_net_dev_counters_for_named_interface() {
        let sample = "Inter-|   Receive                                                |  Transmit\n \
                      face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n \
                      lo:   1000      10    0    0    0     0          0         0     500       5    0    0    0     0       0          0\n";
        let counters = parse_net_dev(sample, "lo").unwrap();
        assert_eq!(counters.rx_bytes, 1000);
        assert_eq!(counters.rx_packets, 10);
        assert_eq!(counters.tx_bytes, 500);
        assert_eq!(counters.tx_packets, 5);
    }
}
