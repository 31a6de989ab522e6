//! Opens the physical panel and touch controller from the configured wiring.

use crate::{
    app::AppConfig,
    bus::{i2cdev::I2cdevTouchBus, raspi::RppalDisplayBus, raspi::RppalTouchBus, TouchBus},
    config::TouchDriver,
    lcd_driver::St7796,
    touch::Ft6336u,
    Error, Result,
};

#[cfg(target_os = "linux")]
pub use linux_embedded_hal::Delay;

/// Blocking delay for hosts without linux-embedded-hal.
#[cfg(not(target_os = "linux"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct Delay;

#[cfg(not(target_os = "linux"))]
impl embedded_hal::delay::DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }
}

pub type Panel = St7796<RppalDisplayBus, Delay>;
pub type Touch = Ft6336u<Box<dyn TouchBus>>;

/// Open SPI/GPIO, run the power-on sequence and blank the panel.
pub fn open_display(config: &AppConfig) -> Result<Panel> {
    let bus = RppalDisplayBus::open(&config.display)?;
    let mut display = St7796::new(bus, Delay);
    display.initialize()?;
    Ok(display)
}

/// Open the touch transport selected in the config and pulse its reset line.
pub fn open_touch(config: &AppConfig) -> Result<Touch> {
    let bus: Box<dyn TouchBus> = match config.touch_driver {
        TouchDriver::Rppal => Box::new(RppalTouchBus::open(&config.touch)?),
        TouchDriver::I2cdev => Box::new(I2cdevTouchBus::open(&config.touch)?),
    };
    let mut touch = Ft6336u::new(bus, config.touch_addr);
    touch.reset(&mut Delay).map_err(|err| {
        Error::BusUnavailable(format!("touch controller reset failed: {err}"))
    })?;
    tracing::info!(
        driver = %config.touch_driver,
        bus = config.touch.i2c_bus,
        addr = config.touch_addr,
        "touch controller ready"
    );
    Ok(touch)
}
