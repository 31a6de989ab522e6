use embedded_graphics::{prelude::*, primitives::Rectangle, text::Alignment};

use crate::{
    display::{
        framebuffer::FrameView,
        widgets::{self, MARGIN},
    },
    stats::{format_bytes, format_uptime, StatsSnapshot},
};

/// One page of the UI. Tabs hold no state; everything comes from the snapshot.
pub trait Tab {
    fn name(&self) -> &str;
    fn render(&self, view: &mut FrameView<'_>, stats: &StatsSnapshot);
}

/// The fixed tab set, in navigation order.
pub fn default_tabs() -> Vec<Box<dyn Tab>> {
    vec![
        Box::new(OverviewTab),
        Box::new(CpuTab),
        Box::new(MemoryTab),
        Box::new(StorageTab),
        Box::new(NetworkTab),
    ]
}

fn content_width(view: &FrameView<'_>) -> u32 {
    view.size().width.saturating_sub(2 * MARGIN as u32)
}

fn bottom(view: &FrameView<'_>) -> i32 {
    view.size().height as i32
}

fn centred_notice(view: &mut FrameView<'_>, message: &str) {
    let centre = Point::new(view.size().width as i32 / 2, bottom(view) / 2);
    widgets::text(
        view,
        message,
        centre,
        widgets::LABEL_FONT,
        widgets::MUTED,
        Alignment::Center,
    );
}

pub struct OverviewTab;

impl Tab for OverviewTab {
    fn name(&self) -> &str {
        "Overview"
    }

    fn render(&self, view: &mut FrameView<'_>, stats: &StatsSnapshot) {
        let _ = view.clear(widgets::BACKGROUND);
        let mut y = widgets::title(view, "System Overview");
        let width = content_width(view);

        widgets::label_value(
            view,
            y,
            "CPU",
            &format!("{:.1}%", stats.cpu.overall),
            widgets::VALUE,
        );
        widgets::progress_bar(
            view,
            Rectangle::new(Point::new(MARGIN, y + 22), Size::new(width, 20)),
            stats.cpu.overall,
            widgets::rgb(50, 150, 255),
        );
        y += 60;

        if let Some(temp) = stats.temperature_c {
            widgets::label_value(
                view,
                y,
                "Temperature",
                &format!("{temp:.1}°C"),
                widgets::temperature_color(temp),
            );
            y += 35;
        }

        widgets::label_value(
            view,
            y,
            "Memory",
            &format!(
                "{} / {}",
                format_bytes(stats.memory.used as f64),
                format_bytes(stats.memory.total as f64)
            ),
            widgets::VALUE,
        );
        widgets::progress_bar(
            view,
            Rectangle::new(Point::new(MARGIN, y + 22), Size::new(width, 20)),
            stats.memory.percent,
            widgets::rgb(100, 200, 100),
        );
        y += 60;

        let load = stats.load;
        widgets::label_value(
            view,
            y,
            "Load",
            &format!("{:.2}, {:.2}, {:.2}", load.one, load.five, load.fifteen),
            widgets::VALUE,
        );
        y += 35;

        widgets::label_value(
            view,
            y,
            "Uptime",
            &format_uptime(stats.uptime_secs),
            widgets::VALUE,
        );
    }
}

pub struct CpuTab;

impl Tab for CpuTab {
    fn name(&self) -> &str {
        "CPU"
    }

    fn render(&self, view: &mut FrameView<'_>, stats: &StatsSnapshot) {
        let _ = view.clear(widgets::BACKGROUND);
        let mut y = widgets::title(view, "CPU Details");
        let right = view.size().width as i32 - MARGIN;

        widgets::label_value(
            view,
            y,
            "Overall",
            &format!("{:.1}%", stats.cpu.overall),
            widgets::cpu_color(stats.cpu.overall),
        );
        y += 28;
        if let Some(temp) = stats.temperature_c {
            widgets::label_value(
                view,
                y,
                "Temp",
                &format!("{temp:.1}°C"),
                widgets::temperature_color(temp),
            );
            y += 28;
        }
        widgets::label_value(
            view,
            y,
            "Load (1m)",
            &format!("{:.2}", stats.load.one),
            widgets::VALUE,
        );
        y += 32;

        widgets::text(
            view,
            "Per-core usage",
            Point::new(MARGIN, y),
            widgets::LABEL_FONT,
            widgets::LABEL,
            Alignment::Left,
        );
        y += 24;

        let bar_x = 80;
        let bar_width = (right - 60 - bar_x).max(0) as u32;
        for (core, usage) in stats.cpu.per_core.iter().enumerate() {
            if y > bottom(view) - 24 {
                break;
            }
            widgets::text(
                view,
                &format!("Core {core}"),
                Point::new(MARGIN, y),
                widgets::SMALL_FONT,
                widgets::MUTED,
                Alignment::Left,
            );
            widgets::progress_bar(
                view,
                Rectangle::new(Point::new(bar_x, y), Size::new(bar_width, 15)),
                *usage,
                widgets::cpu_color(*usage),
            );
            widgets::text(
                view,
                &format!("{usage:.1}%"),
                Point::new(right, y),
                widgets::SMALL_FONT,
                widgets::VALUE,
                Alignment::Right,
            );
            y += 22;
        }
    }
}

pub struct MemoryTab;

impl Tab for MemoryTab {
    fn name(&self) -> &str {
        "Memory"
    }

    fn render(&self, view: &mut FrameView<'_>, stats: &StatsSnapshot) {
        let _ = view.clear(widgets::BACKGROUND);
        let mut y = widgets::title(view, "Memory");
        let width = content_width(view);
        let mem = &stats.memory;

        widgets::text(
            view,
            "RAM",
            Point::new(MARGIN, y),
            widgets::LABEL_FONT,
            widgets::LABEL,
            Alignment::Left,
        );
        y += 24;
        widgets::labelled_bar(
            view,
            Rectangle::new(Point::new(MARGIN, y), Size::new(width, 30)),
            mem.percent,
            widgets::rgb(100, 200, 100),
        );
        y += 42;
        for (label, bytes) in [
            ("Used", mem.used),
            ("Available", mem.available),
            ("Total", mem.total),
        ] {
            widgets::label_value(view, y, label, &format_bytes(bytes as f64), widgets::VALUE);
            y += 25;
        }
        y += 20;

        let swap = &stats.swap;
        widgets::text(
            view,
            "Swap",
            Point::new(MARGIN, y),
            widgets::LABEL_FONT,
            widgets::LABEL,
            Alignment::Left,
        );
        y += 24;
        if swap.total == 0 {
            widgets::text(
                view,
                "No swap configured",
                Point::new(MARGIN, y),
                widgets::LABEL_FONT,
                widgets::MUTED,
                Alignment::Left,
            );
            return;
        }
        widgets::labelled_bar(
            view,
            Rectangle::new(Point::new(MARGIN, y), Size::new(width, 30)),
            swap.percent,
            widgets::rgb(200, 150, 100),
        );
        y += 42;
        widgets::label_value(view, y, "Used", &format_bytes(swap.used as f64), widgets::VALUE);
        y += 25;
        widgets::label_value(view, y, "Free", &format_bytes(swap.free as f64), widgets::VALUE);
    }
}

pub struct StorageTab;

impl Tab for StorageTab {
    fn name(&self) -> &str {
        "Storage"
    }

    fn render(&self, view: &mut FrameView<'_>, stats: &StatsSnapshot) {
        let _ = view.clear(widgets::BACKGROUND);
        let mut y = widgets::title(view, "Storage");
        if stats.disks.is_empty() {
            centred_notice(view, "No storage info available");
            return;
        }
        let width = content_width(view);
        for disk in &stats.disks {
            if y > bottom(view) - 70 {
                break;
            }
            widgets::text(
                view,
                &widgets::truncate(&disk.mount_point, 20),
                Point::new(MARGIN, y),
                widgets::LABEL_FONT,
                widgets::rgb(180, 180, 255),
                Alignment::Left,
            );
            y += 20;
            widgets::labelled_bar(
                view,
                Rectangle::new(Point::new(MARGIN, y), Size::new(width, 20)),
                disk.percent,
                widgets::storage_color(disk.percent),
            );
            y += 25;
            widgets::text(
                view,
                &format!(
                    "{} / {}",
                    format_bytes(disk.used as f64),
                    format_bytes(disk.total as f64)
                ),
                Point::new(MARGIN, y),
                widgets::SMALL_FONT,
                widgets::MUTED,
                Alignment::Left,
            );
            y += 25;
        }
    }
}

pub struct NetworkTab;

impl Tab for NetworkTab {
    fn name(&self) -> &str {
        "Network"
    }

    fn render(&self, view: &mut FrameView<'_>, stats: &StatsSnapshot) {
        let _ = view.clear(widgets::BACKGROUND);
        let mut y = widgets::title(view, "Network");
        if stats.networks.is_empty() {
            centred_notice(view, "No network info available");
            return;
        }
        let right = view.size().width as i32 - MARGIN;
        for iface in &stats.networks {
            if y > bottom(view) - 80 {
                break;
            }
            widgets::text(
                view,
                &iface.interface,
                Point::new(MARGIN, y),
                widgets::LABEL_FONT,
                widgets::rgb(180, 255, 180),
                Alignment::Left,
            );
            y += 25;
            for (label, total, rate, color) in [
                ("RX", iface.rx_bytes, iface.rx_rate, widgets::rgb(100, 200, 255)),
                ("TX", iface.tx_bytes, iface.tx_rate, widgets::rgb(255, 200, 100)),
            ] {
                widgets::text(
                    view,
                    &format!("{label} {}", format_bytes(total as f64)),
                    Point::new(MARGIN, y),
                    widgets::SMALL_FONT,
                    color,
                    Alignment::Left,
                );
                if rate > 0.0 {
                    widgets::text(
                        view,
                        &format!("({}/s)", format_bytes(rate)),
                        Point::new(right, y),
                        widgets::SMALL_FONT,
                        widgets::MUTED,
                        Alignment::Right,
                    );
                }
                y += 20;
            }
            y += 10;
        }
    }
}
