//! Bring-up helpers: a solid-colour test pattern for the panel and a touch
//! probe for checking the corner mapping on a freshly assembled unit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use embedded_hal::delay::DelayNs;

use crate::{
    bus::{DisplayBus, TouchBus},
    lcd_driver::St7796,
    touch::{remap, Ft6336u, RawPoint, EVENT_LIFT_UP},
    Result,
};

pub const TEST_PATTERN: [(&str, Rgb565); 5] = [
    ("red", Rgb565::RED),
    ("green", Rgb565::GREEN),
    ("blue", Rgb565::BLUE),
    ("white", Rgb565::WHITE),
    ("black", Rgb565::BLACK),
];

/// Fill the panel with each pattern colour for `hold`. Returns how many were shown.
pub fn run_test_pattern<B: DisplayBus, D: DelayNs>(
    display: &mut St7796<B, D>,
    hold: Duration,
    running: &AtomicBool,
) -> Result<usize> {
    let mut shown = 0;
    for (name, color) in TEST_PATTERN {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        tracing::info!(color = name, "test pattern");
        display.fill(color)?;
        shown += 1;
        thread::sleep(hold);
    }
    display.fill(Rgb565::BLACK)?;
    Ok(shown)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSample {
    pub raw: RawPoint,
    pub panel: (u16, u16),
}

/// Log every new press with raw and panel coordinates until `duration` passes.
/// At least one poll is made.
pub fn run_touch_probe<T: TouchBus>(
    touch: &mut Ft6336u<T>,
    duration: Duration,
    poll_interval: Duration,
    running: &AtomicBool,
) -> Vec<ProbeSample> {
    let started = Instant::now();
    let mut samples = Vec::new();
    let mut was_pressed = false;
    loop {
        match touch.read_raw() {
            Ok(Some(raw)) => {
                let pressed = raw.event != EVENT_LIFT_UP;
                if pressed && !was_pressed {
                    let panel = remap(touch.mount(), raw.x, raw.y);
                    tracing::info!(
                        raw_x = raw.x,
                        raw_y = raw.y,
                        x = panel.0,
                        y = panel.1,
                        "touch"
                    );
                    samples.push(ProbeSample { raw, panel });
                }
                was_pressed = pressed;
            }
            Ok(None) => was_pressed = false,
            Err(err) => tracing::warn!(error = %err, "touch read failed"),
        }
        if !running.load(Ordering::SeqCst) || started.elapsed() >= duration {
            break;
        }
        thread::sleep(poll_interval);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::fake::{touch_report, FakeDisplayBus, FakeTouchBus, NoopDelay};
    use crate::touch::DEFAULT_TOUCH_ADDR;

    #[test]
    fn test_pattern_fills_each_colour_then_clears() {
        let mut display = St7796::new(FakeDisplayBus::default(), NoopDelay);
        let running = AtomicBool::new(true);
        let shown = run_test_pattern(&mut display, Duration::ZERO, &running).unwrap();
        assert_eq!(shown, 5);
        assert_eq!(display.bus().count_command(0x2C), 6);
    }

    #[test]
    fn test_pattern_stops_when_flag_cleared() {
        let mut display = St7796::new(FakeDisplayBus::default(), NoopDelay);
        let running = AtomicBool::new(false);
        assert_eq!(
            run_test_pattern(&mut display, Duration::ZERO, &running).unwrap(),
            0
        );
    }

    #[test]
    fn touch_probe_records_remapped_press() {
        let bus = FakeTouchBus::new(vec![Ok(touch_report(319, 0, 0))]);
        let mut touch = Ft6336u::new(bus, DEFAULT_TOUCH_ADDR);
        let running = AtomicBool::new(true);
        let samples = run_touch_probe(&mut touch, Duration::ZERO, Duration::ZERO, &running);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].panel, (0, 0));
        assert_eq!(samples[0].raw.x, 319);
    }
}
