//! Host statistics consumed by the tabs.
//!
//! A provider returns an immutable [`StatsSnapshot`] per call; nothing is
//! streamed and tabs never hold on to a snapshot beyond one render.

use serde::Serialize;

pub mod host;

pub use host::HostStats;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuStats {
    /// Aggregate utilisation across all cores, 0..=100.
    pub overall: f32,
    pub per_core: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SwapStats {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskStats {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkStats {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    /// Bytes per second since the previous snapshot; 0 on the first one.
    pub rx_rate: f64,
    pub tx_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub cpu: CpuStats,
    pub temperature_c: Option<f32>,
    pub memory: MemoryStats,
    pub swap: SwapStats,
    pub disks: Vec<DiskStats>,
    pub networks: Vec<NetworkStats>,
    pub load: LoadAverage,
    pub uptime_secs: u64,
}

/// Source of stats snapshots. Each call is independent.
pub trait StatsProvider {
    fn snapshot(&mut self) -> StatsSnapshot;
}

impl<T: StatsProvider + ?Sized> StatsProvider for Box<T> {
    fn snapshot(&mut self) -> StatsSnapshot {
        (**self).snapshot()
    }
}

/// Provider that always returns the same snapshot and counts how often it was asked.
#[derive(Debug, Clone, Default)]
pub struct FixedStats {
    snapshot: StatsSnapshot,
    calls: usize,
}

impl FixedStats {
    pub fn new(snapshot: StatsSnapshot) -> Self {
        Self { snapshot, calls: 0 }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl StatsProvider for FixedStats {
    fn snapshot(&mut self) -> StatsSnapshot {
        self.calls += 1;
        self.snapshot.clone()
    }
}

/// `used / total` as a percentage; 0 when `total` is 0.
pub fn percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64 * 100.0) as f32
    }
}

/// 1024-based human readable size with one decimal, e.g. `1.5GB`.
pub fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.1}{unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1}PB")
}

/// Compact uptime: `2d 3h 4m`, `3h 4m` or `4m`.
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
