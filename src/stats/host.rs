use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use sysinfo::{Disks, Networks, System};

use super::{
    percent, CpuStats, DiskStats, LoadAverage, MemoryStats, NetworkStats, StatsProvider,
    StatsSnapshot, SwapStats,
};

const THERMAL_PATHS: [&str; 2] = [
    "/sys/class/thermal/thermal_zone0/temp",
    "/sys/class/hwmon/hwmon0/temp1_input",
];

const REPORTED_FILESYSTEMS: [&str; 8] =
    ["ext4", "ext3", "ext2", "xfs", "btrfs", "vfat", "ntfs", "tmpfs"];

/// Stats provider backed by `sysinfo` and the thermal sysfs nodes.
pub struct HostStats {
    system: System,
    last_net: HashMap<String, (u64, u64)>,
    last_net_at: Option<Instant>,
}

impl Default for HostStats {
    fn default() -> Self {
        Self::new()
    }
}

impl HostStats {
    pub fn new() -> Self {
        let mut system = System::new();
        // CPU usage is a delta; prime the first sample so the next one is meaningful.
        system.refresh_cpu_usage();
        Self {
            system,
            last_net: HashMap::new(),
            last_net_at: None,
        }
    }

    fn cpu(&mut self) -> CpuStats {
        self.system.refresh_cpu_usage();
        CpuStats {
            overall: self.system.global_cpu_usage().clamp(0.0, 100.0),
            per_core: self
                .system
                .cpus()
                .iter()
                .map(|cpu| cpu.cpu_usage().clamp(0.0, 100.0))
                .collect(),
        }
    }

    fn memory(&mut self) -> (MemoryStats, SwapStats) {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let available = self.system.available_memory();
        let used = total.saturating_sub(available);
        let swap_total = self.system.total_swap();
        let swap_used = self.system.used_swap();
        (
            MemoryStats {
                total,
                used,
                available,
                percent: percent(used, total),
            },
            SwapStats {
                total: swap_total,
                used: swap_used,
                free: self.system.free_swap(),
                percent: percent(swap_used, swap_total),
            },
        )
    }

    fn disks(&self) -> Vec<DiskStats> {
        let disks = Disks::new_with_refreshed_list();
        let mut out: Vec<DiskStats> = disks
            .list()
            .iter()
            .filter(|disk| {
                is_reported_mount(&disk.file_system().to_string_lossy(), disk.mount_point())
            })
            .map(|disk| {
                let total = disk.total_space();
                let free = disk.available_space();
                let used = total.saturating_sub(free);
                DiskStats {
                    device: disk.name().to_string_lossy().into_owned(),
                    mount_point: disk.mount_point().display().to_string(),
                    fs_type: disk.file_system().to_string_lossy().into_owned(),
                    total,
                    used,
                    free,
                    percent: percent(used, total),
                }
            })
            .collect();
        out.sort_by(|a, b| a.mount_point.cmp(&b.mount_point));
        out
    }

    fn networks(&mut self) -> Vec<NetworkStats> {
        let networks = Networks::new_with_refreshed_list();
        let now = Instant::now();
        let elapsed = self
            .last_net_at
            .map(|at| now.duration_since(at).as_secs_f64())
            .unwrap_or(0.0);

        let mut out = Vec::new();
        let mut seen = HashMap::new();
        for (name, data) in networks.list() {
            if name == "lo" {
                continue;
            }
            let rx = data.total_received();
            let tx = data.total_transmitted();
            let (rx_rate, tx_rate) = match self.last_net.get(name) {
                Some(&(prev_rx, prev_tx)) => (
                    byte_rate(prev_rx, rx, elapsed),
                    byte_rate(prev_tx, tx, elapsed),
                ),
                None => (0.0, 0.0),
            };
            seen.insert(name.clone(), (rx, tx));
            out.push(NetworkStats {
                interface: name.clone(),
                rx_bytes: rx,
                tx_bytes: tx,
                rx_packets: data.total_packets_received(),
                tx_packets: data.total_packets_transmitted(),
                rx_rate,
                tx_rate,
            });
        }
        self.last_net = seen;
        self.last_net_at = Some(now);
        out.sort_by(|a, b| a.interface.cmp(&b.interface));
        out
    }
}

impl StatsProvider for HostStats {
    fn snapshot(&mut self) -> StatsSnapshot {
        let cpu = self.cpu();
        let (memory, swap) = self.memory();
        let load = System::load_average();
        StatsSnapshot {
            cpu,
            temperature_c: read_temperature(),
            memory,
            swap,
            disks: self.disks(),
            networks: self.networks(),
            load: LoadAverage {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            },
            uptime_secs: System::uptime(),
        }
    }
}

/// Real filesystems only; pseudo mounts under /sys, /proc, /dev and /run are skipped.
pub fn is_reported_mount(fs_type: &str, mount_point: &Path) -> bool {
    if !REPORTED_FILESYSTEMS.contains(&fs_type) {
        return false;
    }
    if mount_point.starts_with("/sys") || mount_point.starts_with("/proc") {
        return false;
    }
    for root in ["/dev", "/run"] {
        if mount_point.starts_with(root) && mount_point != Path::new(root) {
            return false;
        }
    }
    true
}

/// Bytes per second between two counter readings. Counter resets read as 0.
pub fn byte_rate(prev: u64, now: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    now.saturating_sub(prev) as f64 / elapsed_secs
}

fn read_temperature() -> Option<f32> {
    THERMAL_PATHS.iter().find_map(|path| {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| parse_temperature(&raw))
    })
}

/// Parse a sysfs temperature; values above 1000 are millidegrees.
pub fn parse_temperature(raw: &str) -> Option<f32> {
    let value: i64 = raw.trim().parse().ok()?;
    if value > 1000 {
        Some(value as f32 / 1000.0)
    } else {
        Some(value as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_temperature_scales_millidegrees() {
        let celsius = parse_temperature("48312\n").unwrap();
        assert!((celsius - 48.312).abs() < 1e-3);
        assert_eq!(parse_temperature("55"), Some(55.0));
        assert_eq!(parse_temperature("n/a"), None);
    }

    #[test]
    fn mount_filter_keeps_real_filesystems() {
        assert!(is_reported_mount("ext4", Path::new("/")));
        assert!(is_reported_mount("vfat", Path::new("/boot/firmware")));
        assert!(is_reported_mount("tmpfs", Path::new("/run")));
        assert!(!is_reported_mount("tmpfs", Path::new("/run/user/1000")));
        assert!(!is_reported_mount("tmpfs", Path::new("/dev/shm")));
        assert!(!is_reported_mount("ext4", Path::new("/sys/fs")));
        assert!(!is_reported_mount("proc", Path::new("/proc")));
        assert!(!is_reported_mount("overlay", Path::new("/")));
    }

    #[test]
    fn byte_rate_handles_resets_and_first_sample() {
        assert_eq!(byte_rate(100, 300, 2.0), 100.0);
        assert_eq!(byte_rate(300, 100, 2.0), 0.0);
        assert_eq!(byte_rate(0, 100, 0.0), 0.0);
    }

    #[test]
    fn host_snapshot_is_self_consistent() {
        let mut stats = HostStats::new();
        let snap = stats.snapshot();
        assert!(snap.memory.used <= snap.memory.total);
        assert!((0.0..=100.0).contains(&snap.cpu.overall));
        assert!(snap.networks.iter().all(|n| n.interface != "lo"));
        let again = stats.snapshot();
        assert!(again.networks.iter().all(|n| n.rx_rate >= 0.0));
    }
}
