//! Transport seam between the drivers and the physical buses.
//!
//! The display controller sits on SPI with discrete reset, data/command and
//! backlight lines; the touch controller sits on I2C. Neither trait carries
//! any protocol knowledge so the drivers can be exercised against
//! [`fake`] buses on a dev host.

use crate::Result;

pub mod errors;
pub mod fake;
pub mod i2cdev;
pub mod raspi;

/// Largest single SPI write spidev accepts with the default `bufsiz`.
pub const DEFAULT_MAX_TRANSFER: usize = 4096;

/// Pins and bus numbers the display controller is wired to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayWiring {
    pub spi_bus: u8,
    pub spi_speed_hz: u32,
    pub dc_pin: u8,
    pub rst_pin: u8,
    pub backlight_pin: Option<u8>,
    /// GPIO driven as chip-select; `None` uses the controller's hardware CE0.
    pub cs_pin: Option<u8>,
}

/// Bus number and reset line of the touch controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchWiring {
    pub i2c_bus: u8,
    pub rst_pin: Option<u8>,
}

/// Level of the data/command select line for the bytes that follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Command,
    Data,
}

/// One tagged byte sequence on the display bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    pub kind: FrameKind,
    pub payload: &'a [u8],
}

impl<'a> CommandFrame<'a> {
    pub fn command(opcode: &'a [u8]) -> Self {
        Self {
            kind: FrameKind::Command,
            payload: opcode,
        }
    }

    pub fn data(payload: &'a [u8]) -> Self {
        Self {
            kind: FrameKind::Data,
            payload,
        }
    }
}

/// Raw SPI + control-line primitives the display driver depends on.
pub trait DisplayBus {
    /// Assert chip-select.
    fn select(&mut self) -> Result<()>;
    /// Release chip-select.
    fn deselect(&mut self) -> Result<()>;
    fn set_frame_kind(&mut self, kind: FrameKind) -> Result<()>;
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
    fn set_reset(&mut self, high: bool) -> Result<()>;
    fn set_backlight(&mut self, on: bool) -> Result<()>;

    fn max_transfer(&self) -> usize {
        DEFAULT_MAX_TRANSFER
    }

    /// Drive the D/C line for the frame and stream its payload in transfer-sized chunks.
    fn write_frame(&mut self, frame: CommandFrame<'_>) -> Result<()> {
        self.set_frame_kind(frame.kind)?;
        let chunk = self.max_transfer().max(1);
        for part in frame.payload.chunks(chunk) {
            self.write(part)?;
        }
        Ok(())
    }
}

impl<T: DisplayBus + ?Sized> DisplayBus for &mut T {
    fn select(&mut self) -> Result<()> {
        (**self).select()
    }

    fn deselect(&mut self) -> Result<()> {
        (**self).deselect()
    }

    fn set_frame_kind(&mut self, kind: FrameKind) -> Result<()> {
        (**self).set_frame_kind(kind)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        (**self).set_reset(high)
    }

    fn set_backlight(&mut self, on: bool) -> Result<()> {
        (**self).set_backlight(on)
    }

    fn max_transfer(&self) -> usize {
        (**self).max_transfer()
    }

    fn write_frame(&mut self, frame: CommandFrame<'_>) -> Result<()> {
        (**self).write_frame(frame)
    }
}

/// Register-oriented I2C primitives the touch driver depends on.
pub trait TouchBus {
    /// Write `reg` to the device at `addr`, then read `buf.len()` bytes back.
    fn write_read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<()>;

    /// Drive the touch controller's reset line. Buses without one ignore it.
    fn set_reset(&mut self, _high: bool) -> Result<()> {
        Ok(())
    }

    fn has_reset(&self) -> bool {
        false
    }
}

impl<T: TouchBus + ?Sized> TouchBus for Box<T> {
    fn write_read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<()> {
        (**self).write_read(addr, reg, buf)
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        (**self).set_reset(high)
    }

    fn has_reset(&self) -> bool {
        (**self).has_reset()
    }
}
