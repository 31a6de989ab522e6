//! Touch transport over `/dev/i2c-N` through linux-embedded-hal, for boards
//! where rppal cannot identify the SoC.

use crate::bus::TouchWiring;
use crate::{Error, Result};

#[cfg(target_os = "linux")]
use {
    crate::bus::{
        errors::{self, BusFailureKind},
        TouchBus,
    },
    embedded_hal::i2c::I2c as _,
    linux_embedded_hal::I2cdev,
};

#[cfg(target_os = "linux")]
pub struct I2cdevTouchBus {
    dev: I2cdev,
}

#[cfg(target_os = "linux")]
impl I2cdevTouchBus {
    pub fn open(wiring: &TouchWiring) -> Result<Self> {
        let path = format!("/dev/i2c-{}", wiring.i2c_bus);
        let dev = I2cdev::new(&path).map_err(|err| {
            // Probe the node directly so the diagnostic carries a real io::ErrorKind.
            let kind = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .err()
                .map(|io| errors::classify_io_error(&io))
                .unwrap_or(BusFailureKind::Unknown);
            errors::unavailable(&path, kind, format!("{err:?}"))
        })?;
        if wiring.rst_pin.is_some() {
            tracing::warn!("touch_rst_pin is ignored by the i2cdev touch driver");
        }
        Ok(Self { dev })
    }
}

#[cfg(target_os = "linux")]
impl TouchBus for I2cdevTouchBus {
    fn write_read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<()> {
        self.dev
            .write_read(addr, &[reg], buf)
            .map_err(|e| Error::TouchRead(format!("i2cdev read reg {reg:#04x}: {e:?}")))
    }
}

#[cfg(not(target_os = "linux"))]
pub struct I2cdevTouchBus;

#[cfg(not(target_os = "linux"))]
impl I2cdevTouchBus {
    pub fn open(_wiring: &TouchWiring) -> Result<Self> {
        Err(Error::BusUnavailable(
            "I2cdevTouchBus is only available on Linux targets".into(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl crate::bus::TouchBus for I2cdevTouchBus {
    fn write_read(&mut self, _addr: u8, _reg: u8, _buf: &mut [u8]) -> Result<()> {
        Err(Error::BusUnavailable(
            "I2cdevTouchBus is only available on Linux targets".into(),
        ))
    }
}
