use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

use crate::{
    bus::{DisplayBus, DisplayWiring, TouchBus, TouchWiring},
    cli::RunOptions,
    config::{Config, TouchDriver},
    display::default_tabs,
    hardware,
    lcd_driver::St7796,
    stats::{HostStats, StatsProvider},
    touch::Ft6336u,
    Error, Result,
};

pub mod dispatch;
mod lifecycle;
pub mod logger;
pub mod probe;

pub use dispatch::{run_display, DispatchTiming, TabDispatcher};
pub use logger::{LogLevel, LoggingGuard};

/// How long `test-pattern` holds each colour.
pub const TEST_PATTERN_HOLD: Duration = Duration::from_secs(2);

/// Settings for one run: the config file merged with command-line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub display: DisplayWiring,
    pub touch: TouchWiring,
    pub touch_addr: u8,
    pub touch_driver: TouchDriver,
    pub timing: DispatchTiming,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_sources(Config::default(), &RunOptions::default())
    }
}

impl AppConfig {
    /// CLI values win over the file; the file wins over built-in defaults.
    pub fn from_sources(config: Config, opts: &RunOptions) -> Self {
        Self {
            display: DisplayWiring {
                spi_bus: config.spi_bus,
                spi_speed_hz: config.spi_speed_hz,
                dc_pin: config.dc_pin,
                rst_pin: config.rst_pin,
                backlight_pin: config.backlight_pin,
                cs_pin: config.cs_pin,
            },
            touch: TouchWiring {
                i2c_bus: config.i2c_bus,
                rst_pin: config.touch_rst_pin,
            },
            touch_addr: config.touch_addr,
            touch_driver: config.touch_driver,
            timing: DispatchTiming {
                refresh_interval: opts.refresh_interval.unwrap_or(config.refresh_interval),
                poll_interval: config.poll_interval,
                debounce: config.debounce,
            },
            log_level: opts.log_level.unwrap_or_default(),
            log_file: opts.log_file.as_ref().map(PathBuf::from),
        }
    }

    /// Re-check the timing invariants after CLI overrides were applied.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        if t.refresh_interval.is_zero() {
            return Err(Error::InvalidArgs("refresh interval must be > 0".into()));
        }
        if t.poll_interval >= t.refresh_interval {
            return Err(Error::InvalidArgs(format!(
                "poll_interval ({}) must be shorter than the refresh interval ({})",
                humantime::format_duration(t.poll_interval),
                humantime::format_duration(t.refresh_interval)
            )));
        }
        Ok(())
    }
}

pub struct App {
    config: AppConfig,
    // Declared last so file logs flush after everything else has dropped.
    _logging: LoggingGuard,
}

impl App {
    /// Start logging first so config errors are reported through it.
    pub fn from_options(opts: &RunOptions) -> Result<Self> {
        let logging = logger::init(
            opts.log_level.unwrap_or_default(),
            opts.log_file.as_deref().map(Path::new),
        )?;
        let config = load_app_config(opts)?;
        Ok(Self {
            config,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Open the panel and touch controller and cycle tabs until SIGINT/SIGTERM.
    /// The signal handler is installed before any pin is claimed.
    pub fn run(&self) -> Result<()> {
        let running = lifecycle::create_shutdown_flag()?;
        let mut display = hardware::open_display(&self.config)?;
        let mut touch = hardware::open_touch(&self.config)?;
        serve(
            HostStats::new(),
            self.config.timing,
            &mut display,
            &mut touch,
            &running,
        )?;
        Ok(())
    }

    /// Cycle the panel through solid colours.
    pub fn test_pattern(&self) -> Result<()> {
        let running = lifecycle::create_shutdown_flag()?;
        let mut display = hardware::open_display(&self.config)?;
        let shown = probe::run_test_pattern(&mut display, TEST_PATTERN_HOLD, &running)?;
        tracing::info!(shown, "test pattern finished");
        lifecycle::render_shutdown(&mut display);
        Ok(())
    }

    /// Log raw and mapped touch coordinates for `seconds`.
    pub fn touch_probe(&self, seconds: u64) -> Result<()> {
        let running = lifecycle::create_shutdown_flag()?;
        let mut touch = hardware::open_touch(&self.config)?;
        tracing::info!(seconds, "touch the panel corners");
        let samples = probe::run_touch_probe(
            &mut touch,
            Duration::from_secs(seconds),
            self.config.timing.poll_interval,
            &running,
        );
        tracing::info!(presses = samples.len(), "touch probe finished");
        Ok(())
    }
}

/// Cycle tabs on already-opened hardware until `running` clears, then blank the
/// panel. Returns the number of frames presented.
fn serve<S, B, D, T>(
    stats: S,
    timing: DispatchTiming,
    display: &mut St7796<B, D>,
    touch: &mut Ft6336u<T>,
    running: &AtomicBool,
) -> Result<u64>
where
    S: StatsProvider,
    B: DisplayBus,
    D: DelayNs,
    T: TouchBus,
{
    let size = (display.width(), display.height());
    let mut dispatcher = TabDispatcher::new(default_tabs(), stats, size, timing, Instant::now())?;
    run_display(&mut dispatcher, display, touch, running);
    lifecycle::render_shutdown(display);
    Ok(dispatcher.frames_presented())
}

/// One host snapshot rendered as pretty JSON. No hardware is opened.
pub fn dump_stats() -> Result<String> {
    dump_snapshot(&mut HostStats::new(), sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)
}

fn dump_snapshot<S: StatsProvider>(stats: &mut S, settle: Duration) -> Result<String> {
    // CPU usage and network rates are deltas: take a baseline, wait, sample again.
    stats.snapshot();
    std::thread::sleep(settle);
    let snapshot = stats.snapshot();
    serde_json::to_string_pretty(&snapshot)
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
}

/// Load the config file named by `--config` (or the default location) and merge the CLI over it.
pub fn load_app_config(opts: &RunOptions) -> Result<AppConfig> {
    let file = match &opts.config_path {
        Some(path) => Config::load_from_path(Path::new(path))?,
        None => Config::load_or_default()?,
    };
    let merged = AppConfig::from_sources(file, opts);
    merged.validate()?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::fake::{BusOp, FakeDisplayBus, FakeTouchBus, NoopDelay};
    use crate::config;
    use crate::stats::{FixedStats, StatsSnapshot};
    use crate::touch::DEFAULT_TOUCH_ADDR;

    #[test]
    fn defaults_follow_config_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.display.spi_bus, config::DEFAULT_SPI_BUS);
        assert_eq!(cfg.display.dc_pin, config::DEFAULT_DC_PIN);
        assert_eq!(cfg.touch.i2c_bus, config::DEFAULT_I2C_BUS);
        assert_eq!(cfg.touch_addr, 0x38);
        assert_eq!(cfg.timing, DispatchTiming::default());
        assert_eq!(cfg.log_level, LogLevel::Info);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let file = Config {
            refresh_interval: Duration::from_secs(3),
            touch_addr: 0x39,
            ..Config::default()
        };
        let opts = RunOptions {
            refresh_interval: Some(Duration::from_millis(500)),
            log_level: Some(LogLevel::Debug),
            log_file: Some("/tmp/statpanel.log".into()),
            ..RunOptions::default()
        };
        let cfg = AppConfig::from_sources(file, &opts);
        assert_eq!(cfg.timing.refresh_interval, Duration::from_millis(500));
        assert_eq!(cfg.touch_addr, 0x39);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.log_file, Some(PathBuf::from("/tmp/statpanel.log")));
    }

    #[test]
    fn refresh_override_below_poll_is_rejected() {
        let opts = RunOptions {
            refresh_interval: Some(Duration::from_millis(10)),
            ..RunOptions::default()
        };
        let cfg = AppConfig::from_sources(Config::default(), &opts);
        assert!(matches!(cfg.validate(), Err(Error::InvalidArgs(_))));
    }

    #[test]
    fn load_app_config_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "refresh_interval = \"2s\"\ndebounce = \"200ms\"\n").unwrap();
        let opts = RunOptions {
            config_path: Some(path.display().to_string()),
            ..RunOptions::default()
        };
        let cfg = load_app_config(&opts).unwrap();
        assert_eq!(cfg.timing.refresh_interval, Duration::from_secs(2));
        assert_eq!(cfg.timing.debounce, Duration::from_millis(200));
    }

    #[test]
    fn dump_snapshot_is_json() {
        let mut stats = FixedStats::new(StatsSnapshot {
            uptime_secs: 42,
            temperature_c: Some(51.5),
            ..StatsSnapshot::default()
        });
        let json = dump_snapshot(&mut stats, Duration::ZERO).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["uptime_secs"], 42);
        assert_eq!(value["temperature_c"], 51.5);
        assert_eq!(stats.calls(), 2);
    }

    #[test]
    fn signal_during_bring_up_still_blanks_the_panel() {
        let mut display = St7796::new(FakeDisplayBus::default(), NoopDelay);
        display.initialize().unwrap();
        display.bus_mut().clear_ops();
        let mut touch = Ft6336u::new(FakeTouchBus::default(), DEFAULT_TOUCH_ADDR);
        let running = AtomicBool::new(false);

        let frames = serve(
            FixedStats::default(),
            DispatchTiming::default(),
            &mut display,
            &mut touch,
            &running,
        )
        .unwrap();

        assert_eq!(frames, 0);
        assert!(display.bus().commands().contains(&0x28));
        assert_eq!(display.bus().ops().last(), Some(&BusOp::Backlight(false)));
        assert!(!display.bus().is_selected());
        assert!(!display.is_initialized());
    }
}
