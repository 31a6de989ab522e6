//! ST7796 driver over a 4-wire SPI bus with discrete D/C and reset lines.
//! The power-on sequence matches the panel vendor's reference init for the
//! 320x480 module.

use embedded_graphics::pixelcolor::{IntoStorage, Rgb565};
use embedded_hal::delay::DelayNs;

use crate::{
    bus::{CommandFrame, DisplayBus},
    display::framebuffer::FrameBuffer,
    Error, Result,
};

pub const PANEL_WIDTH: u16 = 320;
pub const PANEL_HEIGHT: u16 = 480;
pub const BYTES_PER_PIXEL: usize = 2;

/// Orientation the assembly is mounted in.
pub const PANEL_ORIENTATION: Orientation = Orientation::Portrait;

/// Controller opcodes used by this driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    SleepOut = 0x11,
    InversionOn = 0x21,
    DisplayOff = 0x28,
    DisplayOn = 0x29,
    ColumnAddressSet = 0x2A,
    RowAddressSet = 0x2B,
    MemoryWrite = 0x2C,
    MemoryAccessControl = 0x36,
    PixelFormat = 0x3A,
    PorchControl = 0xB2,
    GateControl = 0xB7,
    VcomSetting = 0xBB,
    LcmControl = 0xC0,
    VdvVrhEnable = 0xC2,
    VrhSet = 0xC3,
    VdvSet = 0xC4,
    FrameRateControl = 0xC6,
    PowerControl = 0xD0,
}

// 16 bits per pixel on both the RGB and MCU interfaces.
const COLMOD_RGB565: u8 = 0x55;

/// Register tuning applied after MADCTL/COLMOD: (instruction, params, settle ms).
const POWER_ON_SEQUENCE: &[(Instruction, &[u8], u32)] = &[
    (Instruction::PorchControl, &[0x0C, 0x0C, 0x00, 0x33, 0x33], 0),
    (Instruction::GateControl, &[0x35], 0),
    (Instruction::VcomSetting, &[0x28], 0),
    (Instruction::LcmControl, &[0x2C], 0),
    (Instruction::VdvVrhEnable, &[0x01], 0),
    (Instruction::VrhSet, &[0x0B], 0),
    (Instruction::VdvSet, &[0x20], 0),
    (Instruction::FrameRateControl, &[0x0F], 0),
    (Instruction::PowerControl, &[0xA4, 0xA1], 0),
    (Instruction::InversionOn, &[], 0),
    (Instruction::DisplayOn, &[], 50),
];

/// MADCTL presets for the four mounting rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
    PortraitFlipped,
    LandscapeFlipped,
}

impl Orientation {
    pub fn madctl(self) -> u8 {
        match self {
            Orientation::Portrait => 0x48,
            Orientation::Landscape => 0x28,
            Orientation::PortraitFlipped => 0x88,
            Orientation::LandscapeFlipped => 0xE8,
        }
    }

    /// Logical `(width, height)` of the panel in this orientation.
    pub fn dimensions(self) -> (u16, u16) {
        match self {
            Orientation::Portrait | Orientation::PortraitFlipped => (PANEL_WIDTH, PANEL_HEIGHT),
            Orientation::Landscape | Orientation::LandscapeFlipped => (PANEL_HEIGHT, PANEL_WIDTH),
        }
    }
}

/// Inclusive address window programmed into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,
}

impl Window {
    pub fn pixel_count(&self) -> usize {
        (self.x1 - self.x0 + 1) as usize * (self.y1 - self.y0 + 1) as usize
    }

    pub fn byte_len(&self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }
}

pub struct St7796<B: DisplayBus, D: DelayNs> {
    bus: B,
    delay: D,
    orientation: Orientation,
    width: u16,
    height: u16,
    window: Option<Window>,
    scratch: Vec<u8>,
    initialized: bool,
}

impl<B: DisplayBus, D: DelayNs> St7796<B, D> {
    pub fn new(bus: B, delay: D) -> Self {
        Self::with_orientation(bus, delay, PANEL_ORIENTATION)
    }

    pub fn with_orientation(bus: B, delay: D, orientation: Orientation) -> Self {
        let (width, height) = orientation.dimensions();
        Self {
            bus,
            delay,
            orientation,
            width,
            height,
            window: None,
            scratch: Vec::new(),
            initialized: false,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Reset the controller, run the power-on sequence and blank the panel.
    ///
    /// Every failure here is reported as [`Error::BusUnavailable`]: without a
    /// working controller there is nothing to fall back to.
    pub fn initialize(&mut self) -> Result<()> {
        self.power_on().map_err(|err| match err {
            Error::BusUnavailable(_) => err,
            other => Error::BusUnavailable(format!("display init failed: {other}")),
        })?;
        self.initialized = true;
        tracing::info!(
            width = self.width,
            height = self.height,
            madctl = self.orientation.madctl(),
            "display initialized"
        );
        Ok(())
    }

    fn power_on(&mut self) -> Result<()> {
        self.bus.set_backlight(false)?;
        self.bus.set_reset(true)?;
        self.delay.delay_ms(100);
        self.bus.set_reset(false)?;
        self.delay.delay_ms(100);
        self.bus.set_reset(true)?;
        self.delay.delay_ms(120);

        let madctl = self.orientation.madctl();
        self.transaction(|d| {
            d.command(Instruction::SleepOut, &[])?;
            d.delay.delay_ms(120);
            d.command(Instruction::MemoryAccessControl, &[madctl])?;
            d.command(Instruction::PixelFormat, &[COLMOD_RGB565])?;
            for &(instruction, params, settle_ms) in POWER_ON_SEQUENCE {
                d.command(instruction, params)?;
                if settle_ms > 0 {
                    d.delay.delay_ms(settle_ms);
                }
            }
            Ok(())
        })?;

        self.fill(Rgb565::new(0, 0, 0))?;
        self.bus.set_backlight(true)
    }

    /// Program the inclusive address window for the next [`Self::write_pixels`].
    pub fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<()> {
        let window = self.checked_window(x0, y0, x1, y1)?;
        self.transaction(|d| d.write_window(window))?;
        self.window = Some(window);
        Ok(())
    }

    /// Stream big-endian RGB565 bytes into the current window.
    ///
    /// The window is consumed: a second call needs a fresh [`Self::set_window`].
    pub fn write_pixels(&mut self, bytes: &[u8]) -> Result<()> {
        let window = self
            .window
            .ok_or_else(|| Error::ProtocolViolation("write_pixels without a window".into()))?;
        if bytes.len() != window.byte_len() {
            return Err(Error::ProtocolViolation(format!(
                "pixel data is {} bytes, window {}x{} needs {}",
                bytes.len(),
                window.x1 - window.x0 + 1,
                window.y1 - window.y0 + 1,
                window.byte_len()
            )));
        }
        self.window = None;
        self.transaction(|d| d.bus.write_frame(CommandFrame::data(bytes)))
    }

    /// Push a whole frame as one chip-select group so a failure never leaves
    /// a torn image half way through a window update.
    pub fn present(&mut self, frame: &FrameBuffer) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(Error::ProtocolViolation(format!(
                "frame is {}x{}, panel is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        frame.encode_be(&mut self.scratch);
        self.push_full_window()
    }

    /// Paint the whole panel one colour.
    pub fn fill(&mut self, color: Rgb565) -> Result<()> {
        let [hi, lo] = color.into_storage().to_be_bytes();
        let pixels = self.width as usize * self.height as usize;
        self.scratch.clear();
        self.scratch.reserve(pixels * BYTES_PER_PIXEL);
        for _ in 0..pixels {
            self.scratch.push(hi);
            self.scratch.push(lo);
        }
        self.push_full_window()
    }

    /// Blank the panel, switch it off and release the bus lines.
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.initialized {
            return self.bus.deselect();
        }
        self.initialized = false;
        self.fill(Rgb565::new(0, 0, 0))?;
        self.transaction(|d| d.command(Instruction::DisplayOff, &[]))?;
        self.bus.set_backlight(false)?;
        tracing::info!("display shut down");
        Ok(())
    }

    fn push_full_window(&mut self) -> Result<()> {
        let full = Window {
            x0: 0,
            y0: 0,
            x1: self.width - 1,
            y1: self.height - 1,
        };
        let madctl = self.orientation.madctl();
        self.window = None;
        self.transaction(|d| {
            d.command(Instruction::MemoryAccessControl, &[madctl])?;
            d.write_window(full)?;
            d.bus.write_frame(CommandFrame::data(&d.scratch))
        })
    }

    fn checked_window(&self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<Window> {
        if x0 > x1 || x1 >= self.width || y0 > y1 || y1 >= self.height {
            return Err(Error::ProtocolViolation(format!(
                "window ({x0},{y0})-({x1},{y1}) outside {}x{}",
                self.width, self.height
            )));
        }
        Ok(Window { x0, y0, x1, y1 })
    }

    fn write_window(&mut self, w: Window) -> Result<()> {
        let [x0h, x0l] = w.x0.to_be_bytes();
        let [x1h, x1l] = w.x1.to_be_bytes();
        let [y0h, y0l] = w.y0.to_be_bytes();
        let [y1h, y1l] = w.y1.to_be_bytes();
        self.command(Instruction::ColumnAddressSet, &[x0h, x0l, x1h, x1l])?;
        self.command(Instruction::RowAddressSet, &[y0h, y0l, y1h, y1l])?;
        self.command(Instruction::MemoryWrite, &[])
    }

    fn command(&mut self, instruction: Instruction, params: &[u8]) -> Result<()> {
        self.bus
            .write_frame(CommandFrame::command(&[instruction as u8]))?;
        if !params.is_empty() {
            self.bus.write_frame(CommandFrame::data(params))?;
        }
        Ok(())
    }

    /// Run `f` with chip-select asserted; chip-select is released on every path.
    fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.bus.select()?;
        let result = f(self);
        let released = self.bus.deselect();
        let value = result?;
        released?;
        Ok(value)
    }
}

impl<B: DisplayBus, D: DelayNs> Drop for St7796<B, D> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "display shutdown failed");
            let _ = self.bus.deselect();
            let _ = self.bus.set_backlight(false);
        }
    }
}
