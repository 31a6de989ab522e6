//! FT6336U capacitive touch controller.
//!
//! The chip is polled rather than interrupt driven: every call to
//! [`Ft6336u::poll`] issues one burst read covering TD_STATUS and the first
//! touch point, decodes it and maps the result into panel coordinates.

use embedded_hal::delay::DelayNs;

use crate::{bus::TouchBus, Result};

pub const DEFAULT_TOUCH_ADDR: u8 = 0x38;

const REG_TD_STATUS: u8 = 0x02;
// TD_STATUS, P1_XH, P1_XL, P1_YH, P1_YL, P1_WEIGHT, P1_MISC
const REPORT_LEN: usize = 7;
pub const EVENT_LIFT_UP: u8 = 0x01;

/// One decoded sample in panel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    pub x: u16,
    pub y: u16,
    pub pressed: bool,
}

/// Primary point as reported by the chip, before remapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPoint {
    pub x: u16,
    pub y: u16,
    pub event: u8,
}

/// How the touch sensor sits relative to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mount {
    /// Native sensor resolution before any axis swap.
    pub native_width: u16,
    pub native_height: u16,
    pub swap_xy: bool,
    pub invert_x: bool,
    pub invert_y: bool,
}

/// The assembled HAT: sensor X runs right-to-left across the portrait panel.
pub const PANEL_MOUNT: Mount = Mount {
    native_width: 320,
    native_height: 480,
    swap_xy: false,
    invert_x: true,
    invert_y: false,
};

impl Mount {
    /// Size of the panel coordinate space this mount produces.
    pub fn panel_size(&self) -> (u16, u16) {
        if self.swap_xy {
            (self.native_height, self.native_width)
        } else {
            (self.native_width, self.native_height)
        }
    }
}

/// Map raw sensor coordinates into panel coordinates. Inputs beyond the
/// sensor's range are clamped to its edge first.
pub fn remap(mount: &Mount, raw_x: u16, raw_y: u16) -> (u16, u16) {
    let x = raw_x.min(mount.native_width.saturating_sub(1));
    let y = raw_y.min(mount.native_height.saturating_sub(1));
    let x = if mount.invert_x {
        mount.native_width - 1 - x
    } else {
        x
    };
    let y = if mount.invert_y {
        mount.native_height - 1 - y
    } else {
        y
    };
    if mount.swap_xy {
        (y, x)
    } else {
        (x, y)
    }
}

/// Decode a TD_STATUS burst. `None` when no point is active.
pub fn decode_report(regs: &[u8; REPORT_LEN]) -> Option<RawPoint> {
    let points = regs[0] & 0x0f;
    // 0x0F is what the chip returns while it is still waking up.
    if points == 0 || points == 0x0f {
        return None;
    }
    Some(RawPoint {
        x: (((regs[1] & 0x0f) as u16) << 8) | regs[2] as u16,
        y: (((regs[3] & 0x0f) as u16) << 8) | regs[4] as u16,
        event: regs[1] >> 6,
    })
}

pub struct Ft6336u<B: TouchBus> {
    bus: B,
    addr: u8,
    mount: Mount,
}

impl<B: TouchBus> Ft6336u<B> {
    pub fn new(bus: B, addr: u8) -> Self {
        Self {
            bus,
            addr,
            mount: PANEL_MOUNT,
        }
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Pulse the reset line when one is wired; a no-op otherwise.
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<()> {
        if !self.bus.has_reset() {
            return Ok(());
        }
        self.bus.set_reset(false)?;
        delay.delay_ms(1);
        self.bus.set_reset(true)?;
        delay.delay_ms(50);
        tracing::debug!(addr = self.addr, "touch controller reset");
        Ok(())
    }

    /// Read the primary point without remapping.
    pub fn read_raw(&mut self) -> Result<Option<RawPoint>> {
        let mut regs = [0u8; REPORT_LEN];
        self.bus.write_read(self.addr, REG_TD_STATUS, &mut regs)?;
        Ok(decode_report(&regs))
    }

    /// One sample in panel coordinates; bus errors are returned.
    pub fn read(&mut self) -> Result<Option<TouchEvent>> {
        Ok(self.read_raw()?.map(|raw| {
            let (x, y) = remap(&self.mount, raw.x, raw.y);
            TouchEvent {
                x,
                y,
                pressed: raw.event != EVENT_LIFT_UP,
            }
        }))
    }

    /// One sample in panel coordinates. A failed read is logged and counts as no touch.
    pub fn poll(&mut self) -> Option<TouchEvent> {
        match self.read() {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "touch read failed; treating as no touch");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::fake::{touch_report, FakeTouchBus, NoopDelay};
    use crate::Error;

    /// Raw readings taken at the four physical corners of the mounted panel.
    const CORNERS: [(&str, (u16, u16), (u16, u16)); 4] = [
        ("top-left", (319, 0), (0, 0)),
        ("top-right", (0, 0), (319, 0)),
        ("bottom-left", (319, 479), (0, 479)),
        ("bottom-right", (0, 479), (319, 479)),
    ];

    #[test]
    fn corners_map_to_panel_corners() {
        for (name, (rx, ry), expected) in CORNERS {
            assert_eq!(remap(&PANEL_MOUNT, rx, ry), expected, "{name}");
        }
    }

    #[test]
    fn panel_mount_is_portrait() {
        assert_eq!(PANEL_MOUNT.panel_size(), (320, 480));
    }

    #[test]
    fn swapped_mount_rotates() {
        let landscape = Mount {
            native_width: 320,
            native_height: 480,
            swap_xy: true,
            invert_x: false,
            invert_y: true,
        };
        assert_eq!(landscape.panel_size(), (480, 320));
        assert_eq!(remap(&landscape, 0, 0), (479, 0));
        assert_eq!(remap(&landscape, 319, 479), (0, 319));
    }

    #[test]
    fn out_of_range_raw_is_clamped() {
        assert_eq!(remap(&PANEL_MOUNT, 4000, 4000), (0, 479));
    }

    #[test]
    fn poll_decodes_and_remaps_primary_point() {
        let bus = FakeTouchBus::new(vec![Ok(touch_report(300, 450, 2))]);
        let mut touch = Ft6336u::new(bus, DEFAULT_TOUCH_ADDR);
        let event = touch.poll().unwrap();
        assert_eq!(
            event,
            TouchEvent {
                x: 19,
                y: 450,
                pressed: true
            }
        );
        assert_eq!(touch.bus().reads(), &[(0x38, 0x02, 7)]);
    }

    #[test]
    fn lift_up_event_is_not_pressed() {
        let bus = FakeTouchBus::new(vec![Ok(touch_report(10, 10, 1))]);
        let mut touch = Ft6336u::new(bus, DEFAULT_TOUCH_ADDR);
        assert!(!touch.poll().unwrap().pressed);
    }

    #[test]
    fn zero_points_is_none() {
        let mut touch = Ft6336u::new(FakeTouchBus::default(), DEFAULT_TOUCH_ADDR);
        assert_eq!(touch.poll(), None);
    }

    #[test]
    fn idle_pattern_is_none() {
        let mut regs = touch_report(10, 10, 2);
        regs[0] = 0xff;
        assert_eq!(decode_report(&regs), None);
    }

    #[test]
    fn read_error_is_absorbed_by_poll() {
        let bus = FakeTouchBus::new(vec![
            Err(Error::TouchRead("nack".into())),
            Ok(touch_report(0, 0, 0)),
        ]);
        let mut touch = Ft6336u::new(bus, DEFAULT_TOUCH_ADDR);
        assert_eq!(touch.poll(), None);
        assert!(touch.poll().is_some());
    }

    #[test]
    fn read_surfaces_errors() {
        let bus = FakeTouchBus::new(vec![Err(Error::TouchRead("nack".into()))]);
        let mut touch = Ft6336u::new(bus, DEFAULT_TOUCH_ADDR);
        assert!(matches!(touch.read(), Err(Error::TouchRead(_))));
    }

    #[test]
    fn reset_pulses_low_then_high() {
        let mut touch = Ft6336u::new(FakeTouchBus::default(), DEFAULT_TOUCH_ADDR);
        touch.reset(&mut NoopDelay).unwrap();
        assert_eq!(touch.bus().reset_levels(), &[false, true]);
    }
}
