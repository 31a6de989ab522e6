use std::time::{Duration, Instant};

use statpanel::{
    app::{dispatch::Navigation, DispatchTiming, TabDispatcher},
    bus::fake::{touch_report, FakeDisplayBus, FakeTouchBus, NoopDelay},
    display::default_tabs,
    lcd_driver::{St7796, PANEL_HEIGHT, PANEL_WIDTH},
    stats::{FixedStats, StatsSnapshot},
    touch::{Ft6336u, DEFAULT_TOUCH_ADDR},
    Error,
};

const RAMWR: u8 = 0x2C;

struct Rig {
    start: Instant,
    dispatcher: TabDispatcher<FixedStats>,
    display: St7796<FakeDisplayBus, NoopDelay>,
    touch: Ft6336u<FakeTouchBus>,
}

impl Rig {
    fn new(timing: DispatchTiming) -> Self {
        let start = Instant::now();
        let dispatcher = TabDispatcher::new(
            default_tabs(),
            FixedStats::new(StatsSnapshot::default()),
            (PANEL_WIDTH, PANEL_HEIGHT),
            timing,
            start,
        )
        .unwrap();
        Self {
            start,
            dispatcher,
            display: St7796::new(FakeDisplayBus::default(), NoopDelay),
            touch: Ft6336u::new(FakeTouchBus::default(), DEFAULT_TOUCH_ADDR),
        }
    }

    fn step_at(&mut self, ms: u64) -> statpanel::app::dispatch::StepOutcome {
        let now = self.start + Duration::from_millis(ms);
        self.dispatcher
            .step(now, &mut self.display, &mut self.touch)
    }

    fn index(&self) -> usize {
        self.dispatcher.state().current_tab_index()
    }
}

#[test]
fn idle_panel_refreshes_once_per_interval() {
    let mut rig = Rig::new(DispatchTiming::default());
    for ms in (0..=1200).step_by(15) {
        rig.step_at(ms);
    }
    assert_eq!(rig.dispatcher.frames_presented(), 1);
    assert_eq!(rig.display.bus().count_command(RAMWR), 1);
    assert_eq!(rig.index(), 0);
    assert_eq!(rig.dispatcher.current_tab().name(), "Overview");
}

#[test]
fn bottom_tap_switches_tab_and_presents_immediately() {
    let mut rig = Rig::new(DispatchTiming::default());
    for ms in (0..=1200).step_by(15) {
        rig.step_at(ms);
    }
    rig.display.bus_mut().clear_ops();

    rig.touch.bus_mut().push(Ok(touch_report(160, 450, 2)));
    let outcome = rig.step_at(1215);
    assert_eq!(outcome.navigated, Some(Navigation::Next));
    assert!(outcome.presented);
    assert_eq!(rig.index(), 1);
    assert_eq!(rig.dispatcher.current_tab().name(), "CPU");
    assert_eq!(rig.display.bus().count_command(RAMWR), 1);
    assert_eq!(rig.dispatcher.frames_presented(), 2);
}

#[test]
fn held_finger_switches_only_once() {
    let mut rig = Rig::new(DispatchTiming::default());
    rig.touch.bus_mut().hold(160, 470, 40);
    let mut switches = 0;
    for i in 0..40u64 {
        if rig.step_at(i * 15).navigated.is_some() {
            switches += 1;
        }
    }
    assert_eq!(switches, 1);
    assert_eq!(rig.index(), 1);
}

#[test]
fn taps_wrap_in_both_directions() {
    let timing = DispatchTiming {
        debounce: Duration::ZERO,
        ..DispatchTiming::default()
    };
    let mut rig = Rig::new(timing);
    let mut ms = 0;

    // top band from the first tab lands on the last one
    rig.touch.bus_mut().push(Ok(touch_report(160, 5, 2)));
    rig.step_at(ms);
    assert_eq!(rig.index(), 4);
    assert_eq!(rig.dispatcher.current_tab().name(), "Network");

    // five bottom taps, each separated by a release, come back around
    for _ in 0..5 {
        ms += 15;
        rig.step_at(ms);
        ms += 15;
        rig.touch.bus_mut().push(Ok(touch_report(160, 475, 2)));
        rig.step_at(ms);
    }
    assert_eq!(rig.index(), 4);
    ms += 15;
    rig.step_at(ms);
    ms += 15;
    rig.touch.bus_mut().push(Ok(touch_report(160, 475, 2)));
    rig.step_at(ms);
    assert_eq!(rig.index(), 0);
}

#[test]
fn middle_of_the_panel_does_not_navigate() {
    let mut rig = Rig::new(DispatchTiming::default());
    rig.touch.bus_mut().push(Ok(touch_report(160, 240, 2)));
    let outcome = rig.step_at(15);
    assert_eq!(outcome.navigated, None);
    assert!(!outcome.presented);
    assert_eq!(rig.index(), 0);
}

#[test]
fn touch_read_error_is_treated_as_no_touch() {
    let mut rig = Rig::new(DispatchTiming::default());
    rig.touch
        .bus_mut()
        .push(Err(Error::TouchRead("i2c nack".into())));
    rig.touch.bus_mut().push(Ok(touch_report(160, 450, 2)));
    assert_eq!(rig.step_at(0).navigated, None);
    assert_eq!(rig.step_at(15).navigated, Some(Navigation::Next));
}

#[test]
fn read_error_during_a_hold_does_not_switch_again() {
    let mut rig = Rig::new(DispatchTiming::default());
    rig.touch.bus_mut().hold(160, 470, 14);
    rig.touch
        .bus_mut()
        .push(Err(Error::TouchRead("i2c nack".into())));
    rig.touch.bus_mut().hold(160, 470, 20);

    let mut switches = 0;
    for i in 0..35u64 {
        if rig.step_at(i * 15).navigated.is_some() {
            switches += 1;
        }
    }
    // the finger never lifted, so the read after the error is not a new press
    assert_eq!(switches, 1);
    assert_eq!(rig.index(), 1);
}

#[test]
fn transient_display_error_skips_one_frame() {
    let mut rig = Rig::new(DispatchTiming::default());
    rig.display.bus_mut().fail_next_writes(1);

    let failed = rig.step_at(1000);
    assert!(failed.frame_failed);
    assert!(!failed.presented);
    assert!(!rig.display.bus().is_selected());

    for ms in (1015..2000).step_by(15) {
        assert!(!rig.step_at(ms).presented, "retried early at {ms}ms");
    }
    assert!(rig.step_at(2000).presented);
    assert_eq!(rig.dispatcher.frames_presented(), 1);
}
