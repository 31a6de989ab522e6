use crate::{Error, Result};
use std::path::Path;
use std::time::Duration;

pub mod loader;

pub const DEFAULT_SPI_BUS: u8 = 0;
pub const DEFAULT_SPI_SPEED_HZ: u32 = 40_000_000;
pub const MAX_SPI_SPEED_HZ: u32 = 80_000_000;
pub const DEFAULT_DC_PIN: u8 = 25;
pub const DEFAULT_RST_PIN: u8 = 27;
pub const DEFAULT_BACKLIGHT_PIN: Option<u8> = Some(18);
pub const DEFAULT_I2C_BUS: u8 = 1;
pub const DEFAULT_TOUCH_ADDR: u8 = crate::touch::DEFAULT_TOUCH_ADDR;
pub const DEFAULT_TOUCH_RST_PIN: Option<u8> = Some(17);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(15);
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);
pub const CONFIG_ENV: &str = "STATPANEL_CONFIG";
const APP_DIR_NAME: &str = "statpanel";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Which transport talks to the touch controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TouchDriver {
    #[default]
    Rppal,
    I2cdev,
}

impl std::str::FromStr for TouchDriver {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rppal" => Ok(TouchDriver::Rppal),
            "i2cdev" | "linux-embedded-hal" => Ok(TouchDriver::I2cdev),
            other => Err(format!("expected 'rppal' or 'i2cdev', got '{other}'")),
        }
    }
}

impl std::fmt::Display for TouchDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TouchDriver::Rppal => f.write_str("rppal"),
            TouchDriver::I2cdev => f.write_str("i2cdev"),
        }
    }
}

/// User-supplied settings loaded from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub spi_bus: u8,
    pub spi_speed_hz: u32,
    pub dc_pin: u8,
    pub rst_pin: u8,
    pub backlight_pin: Option<u8>,
    pub cs_pin: Option<u8>,
    pub i2c_bus: u8,
    pub touch_addr: u8,
    pub touch_rst_pin: Option<u8>,
    pub touch_driver: TouchDriver,
    pub refresh_interval: Duration,
    pub poll_interval: Duration,
    pub debounce: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spi_bus: DEFAULT_SPI_BUS,
            spi_speed_hz: DEFAULT_SPI_SPEED_HZ,
            dc_pin: DEFAULT_DC_PIN,
            rst_pin: DEFAULT_RST_PIN,
            backlight_pin: DEFAULT_BACKLIGHT_PIN,
            cs_pin: None,
            i2c_bus: DEFAULT_I2C_BUS,
            touch_addr: DEFAULT_TOUCH_ADDR,
            touch_rst_pin: DEFAULT_TOUCH_RST_PIN,
            touch_driver: TouchDriver::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        loader::load_or_default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }
}

pub(crate) fn validate(cfg: &Config) -> Result<()> {
    if cfg.refresh_interval.is_zero() {
        return Err(Error::InvalidArgs("refresh_interval must be > 0".into()));
    }
    if cfg.poll_interval.is_zero() {
        return Err(Error::InvalidArgs("poll_interval must be > 0".into()));
    }
    if cfg.poll_interval >= cfg.refresh_interval {
        return Err(Error::InvalidArgs(format!(
            "poll_interval ({}) must be shorter than refresh_interval ({})",
            humantime::format_duration(cfg.poll_interval),
            humantime::format_duration(cfg.refresh_interval)
        )));
    }
    if cfg.spi_speed_hz == 0 || cfg.spi_speed_hz > MAX_SPI_SPEED_HZ {
        return Err(Error::InvalidArgs(format!(
            "spi_speed_hz must be between 1 and {MAX_SPI_SPEED_HZ}"
        )));
    }
    if cfg.touch_addr > 0x7f {
        return Err(Error::InvalidArgs(format!(
            "touch_addr {:#04x} is not a 7-bit I2C address",
            cfg.touch_addr
        )));
    }
    if cfg.dc_pin == cfg.rst_pin {
        return Err(Error::InvalidArgs(
            "dc_pin and rst_pin must be different GPIOs".into(),
        ));
    }
    Ok(())
}

fn parse_addr(raw: &str) -> std::result::Result<u8, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => raw.parse::<u8>(),
    };
    parsed.map_err(|_| "expected a hex or decimal address (e.g. 0x38)".to_string())
}
