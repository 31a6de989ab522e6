//! rppal-backed transports for the Raspberry Pi SPI, I2C and GPIO peripherals.

use crate::bus::{DisplayWiring, TouchWiring};
#[cfg(target_os = "linux")]
use crate::bus::{
    errors::{self, BusFailureKind},
    DisplayBus, FrameKind, TouchBus,
};
use crate::{Error, Result};

#[cfg(target_os = "linux")]
use rppal::{
    gpio::{Gpio, OutputPin},
    i2c::I2c,
    spi::{Bus, Mode, Segment, SlaveSelect, Spi},
};

#[cfg(target_os = "linux")]
fn spi_open_err(bus: u8, err: rppal::spi::Error) -> Error {
    let kind = match &err {
        rppal::spi::Error::Io(io) => errors::classify_io_error(io),
        _ => BusFailureKind::Config,
    };
    errors::unavailable(&format!("spi{bus}"), kind, err)
}

#[cfg(target_os = "linux")]
fn gpio_open_err(pin: u8, err: rppal::gpio::Error) -> Error {
    let kind = match &err {
        rppal::gpio::Error::Io(io) => errors::classify_io_error(io),
        _ => BusFailureKind::Busy,
    };
    errors::unavailable(&format!("gpio{pin}"), kind, err)
}

#[cfg(target_os = "linux")]
fn i2c_open_err(bus: u8, err: rppal::i2c::Error) -> Error {
    let kind = match &err {
        rppal::i2c::Error::Io(io) => errors::classify_io_error(io),
        _ => BusFailureKind::Config,
    };
    errors::unavailable(&format!("i2c-{bus}"), kind, err)
}

/// Whether hardware CE0 is being held asserted across a select/deselect group.
///
/// spidev drops CE0 after every message unless the last transfer sets
/// `cs_change`, so each write inside a group asks to keep it and deselect
/// sends an empty transfer to let it go.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CeGroup {
    open: bool,
    held: bool,
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
impl CeGroup {
    fn select(&mut self) {
        self.open = true;
    }

    /// True when this write must leave CE0 asserted for the next one.
    fn write(&mut self) -> bool {
        if self.open {
            self.held = true;
        }
        self.open
    }

    /// True when CE0 is still asserted and needs an explicit release.
    fn deselect(&mut self) -> bool {
        let held = self.held;
        *self = Self::default();
        held
    }
}

#[cfg(target_os = "linux")]
fn output_pin(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    gpio.get(pin)
        .map(|p| p.into_output_high())
        .map_err(|e| gpio_open_err(pin, e))
}

/// SPI display transport: spidev for the data path, GPIO for D/C, reset,
/// backlight and (optionally) a software chip-select. Without `cs_pin`,
/// hardware CE0 is held across each select/deselect group.
#[cfg(target_os = "linux")]
pub struct RppalDisplayBus {
    spi: Spi,
    dc: OutputPin,
    rst: OutputPin,
    backlight: Option<OutputPin>,
    cs: Option<OutputPin>,
    ce: CeGroup,
}

#[cfg(target_os = "linux")]
impl RppalDisplayBus {
    pub fn open(wiring: &DisplayWiring) -> Result<Self> {
        let bus = match wiring.spi_bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            3 => Bus::Spi3,
            4 => Bus::Spi4,
            5 => Bus::Spi5,
            6 => Bus::Spi6,
            other => {
                return Err(Error::InvalidArgs(format!(
                    "spi_bus {other} does not exist (expected 0-6)"
                )))
            }
        };
        let spi = Spi::new(bus, SlaveSelect::Ss0, wiring.spi_speed_hz, Mode::Mode0)
            .map_err(|e| spi_open_err(wiring.spi_bus, e))?;
        let gpio = Gpio::new().map_err(|e| gpio_open_err(wiring.dc_pin, e))?;
        let dc = output_pin(&gpio, wiring.dc_pin)?;
        let rst = output_pin(&gpio, wiring.rst_pin)?;
        let backlight = wiring
            .backlight_pin
            .map(|pin| output_pin(&gpio, pin))
            .transpose()?;
        let cs = wiring.cs_pin.map(|pin| output_pin(&gpio, pin)).transpose()?;
        Ok(Self {
            spi,
            dc,
            rst,
            backlight,
            cs,
            ce: CeGroup::default(),
        })
    }

    fn spi_err(e: rppal::spi::Error) -> Error {
        Error::TransientBus(format!("spi write: {e}"))
    }
}

#[cfg(target_os = "linux")]
impl DisplayBus for RppalDisplayBus {
    fn select(&mut self) -> Result<()> {
        match self.cs.as_mut() {
            Some(cs) => cs.set_low(),
            None => self.ce.select(),
        }
        Ok(())
    }

    fn deselect(&mut self) -> Result<()> {
        if let Some(cs) = self.cs.as_mut() {
            cs.set_high();
            return Ok(());
        }
        if self.ce.deselect() {
            self.spi
                .transfer_segments(&[Segment::with_write(&[])])
                .map_err(Self::spi_err)?;
        }
        Ok(())
    }

    fn set_frame_kind(&mut self, kind: FrameKind) -> Result<()> {
        match kind {
            FrameKind::Command => self.dc.set_low(),
            FrameKind::Data => self.dc.set_high(),
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.cs.is_none() && self.ce.write() {
            let mut segment = Segment::with_write(bytes);
            segment.set_ss_change(true);
            return self
                .spi
                .transfer_segments(&[segment])
                .map_err(Self::spi_err);
        }
        let written = self.spi.write(bytes).map_err(Self::spi_err)?;
        if written != bytes.len() {
            return Err(Error::TransientBus(format!(
                "short spi write: {written} of {} bytes",
                bytes.len()
            )));
        }
        Ok(())
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        if high {
            self.rst.set_high();
        } else {
            self.rst.set_low();
        }
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<()> {
        if let Some(bl) = self.backlight.as_mut() {
            if on {
                bl.set_high();
            } else {
                bl.set_low();
            }
        }
        Ok(())
    }
}

/// Touch transport on rppal's I2C with an optional GPIO reset line.
#[cfg(target_os = "linux")]
pub struct RppalTouchBus {
    i2c: I2c,
    rst: Option<OutputPin>,
    slave: Option<u8>,
}

#[cfg(target_os = "linux")]
impl RppalTouchBus {
    pub fn open(wiring: &TouchWiring) -> Result<Self> {
        let i2c = I2c::with_bus(wiring.i2c_bus).map_err(|e| i2c_open_err(wiring.i2c_bus, e))?;
        let rst = match wiring.rst_pin {
            Some(pin) => {
                let gpio = Gpio::new().map_err(|e| gpio_open_err(pin, e))?;
                Some(output_pin(&gpio, pin)?)
            }
            None => None,
        };
        Ok(Self {
            i2c,
            rst,
            slave: None,
        })
    }
}

#[cfg(target_os = "linux")]
impl TouchBus for RppalTouchBus {
    fn write_read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<()> {
        if self.slave != Some(addr) {
            self.i2c
                .set_slave_address(addr.into())
                .map_err(|e| Error::TouchRead(format!("i2c address {addr:#04x}: {e}")))?;
            self.slave = Some(addr);
        }
        self.i2c
            .write_read(&[reg], buf)
            .map_err(|e| Error::TouchRead(format!("i2c read reg {reg:#04x}: {e}")))
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        if let Some(rst) = self.rst.as_mut() {
            if high {
                rst.set_high();
            } else {
                rst.set_low();
            }
        }
        Ok(())
    }

    fn has_reset(&self) -> bool {
        self.rst.is_some()
    }
}

/// Non-Linux stub to satisfy builds on dev hosts; returns errors at runtime.
#[cfg(not(target_os = "linux"))]
pub struct RppalDisplayBus;

#[cfg(not(target_os = "linux"))]
impl RppalDisplayBus {
    pub fn open(_wiring: &DisplayWiring) -> Result<Self> {
        Err(Error::BusUnavailable(
            "RppalDisplayBus is only available on Linux targets".into(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl crate::bus::DisplayBus for RppalDisplayBus {
    fn select(&mut self) -> Result<()> {
        Err(not_linux())
    }

    fn deselect(&mut self) -> Result<()> {
        Err(not_linux())
    }

    fn set_frame_kind(&mut self, _kind: crate::bus::FrameKind) -> Result<()> {
        Err(not_linux())
    }

    fn write(&mut self, _bytes: &[u8]) -> Result<()> {
        Err(not_linux())
    }

    fn set_reset(&mut self, _high: bool) -> Result<()> {
        Err(not_linux())
    }

    fn set_backlight(&mut self, _on: bool) -> Result<()> {
        Err(not_linux())
    }
}

#[cfg(not(target_os = "linux"))]
pub struct RppalTouchBus;

#[cfg(not(target_os = "linux"))]
impl RppalTouchBus {
    pub fn open(_wiring: &TouchWiring) -> Result<Self> {
        Err(Error::BusUnavailable(
            "RppalTouchBus is only available on Linux targets".into(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl crate::bus::TouchBus for RppalTouchBus {
    fn write_read(&mut self, _addr: u8, _reg: u8, _buf: &mut [u8]) -> Result<()> {
        Err(not_linux())
    }
}

#[cfg(not(target_os = "linux"))]
fn not_linux() -> Error {
    Error::BusUnavailable("rppal buses are only available on Linux targets".into())
}

#[cfg(test)]
mod tests {
    use super::CeGroup;

    #[test]
    fn ce_is_held_for_every_write_in_a_group() {
        let mut ce = CeGroup::default();
        ce.select();
        assert!(ce.write());
        assert!(ce.write());
        assert!(ce.deselect());
        assert_eq!(ce, CeGroup::default());
    }

    #[test]
    fn ce_release_is_skipped_when_nothing_was_written() {
        let mut ce = CeGroup::default();
        ce.select();
        assert!(!ce.deselect());
    }

    #[test]
    fn writes_outside_a_group_frame_themselves() {
        let mut ce = CeGroup::default();
        assert!(!ce.write());
        assert!(!ce.deselect());
    }
}
