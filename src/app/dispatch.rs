//! Tab dispatch loop: touch polling, band gestures and the refresh cadence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use embedded_graphics::{
    prelude::*,
    primitives::{Circle, PrimitiveStyle, Rectangle},
    text::Alignment,
};
use embedded_hal::delay::DelayNs;

use crate::{
    bus::{DisplayBus, TouchBus},
    display::{widgets, FrameBuffer, Tab},
    lcd_driver::St7796,
    stats::StatsProvider,
    touch::{Ft6336u, TouchEvent},
    Error, Result,
};

/// Height of the top (previous) and bottom (next) touch bands.
pub const NAV_BAND_HEIGHT: u16 = 60;
/// Strip at the bottom of the frame holding the page dots and tab name.
pub const INDICATOR_HEIGHT: u16 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Previous,
    Next,
}

/// Map a touch row to a gesture. The middle of the panel is not a gesture.
pub fn classify_touch(y: u16, panel_height: u16) -> Option<Navigation> {
    if y < NAV_BAND_HEIGHT {
        Some(Navigation::Previous)
    } else if y >= panel_height.saturating_sub(NAV_BAND_HEIGHT) {
        Some(Navigation::Next)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTiming {
    pub refresh_interval: Duration,
    pub poll_interval: Duration,
    /// Minimum gap between two navigations, on top of edge detection.
    pub debounce: Duration,
}

impl Default for DispatchTiming {
    fn default() -> Self {
        Self {
            refresh_interval: crate::config::DEFAULT_REFRESH_INTERVAL,
            poll_interval: crate::config::DEFAULT_POLL_INTERVAL,
            debounce: crate::config::DEFAULT_DEBOUNCE,
        }
    }
}

/// Mutable loop state. `current_tab_index` is always below `tab_count`.
#[derive(Debug, Clone)]
pub struct DispatchState {
    current_tab_index: usize,
    tab_count: usize,
    last_touch_pressed: bool,
    last_refresh_time: Instant,
    last_navigation: Option<Instant>,
}

impl DispatchState {
    pub fn new(tab_count: usize, now: Instant) -> Result<Self> {
        if tab_count == 0 {
            return Err(Error::InvalidArgs("at least one tab is required".into()));
        }
        Ok(Self {
            current_tab_index: 0,
            tab_count,
            last_touch_pressed: false,
            last_refresh_time: now,
            last_navigation: None,
        })
    }

    pub fn current_tab_index(&self) -> usize {
        self.current_tab_index
    }

    pub fn tab_count(&self) -> usize {
        self.tab_count
    }

    pub fn last_touch_pressed(&self) -> bool {
        self.last_touch_pressed
    }

    pub fn last_refresh_time(&self) -> Instant {
        self.last_refresh_time
    }

    pub fn navigate(&mut self, nav: Navigation) {
        self.current_tab_index = match nav {
            Navigation::Previous => (self.current_tab_index + self.tab_count - 1) % self.tab_count,
            Navigation::Next => (self.current_tab_index + 1) % self.tab_count,
        };
    }

    /// Feed one poll result. Only a released-to-pressed edge in a band navigates,
    /// and never twice within `debounce`.
    pub fn on_touch(
        &mut self,
        touch: Option<TouchEvent>,
        panel_height: u16,
        debounce: Duration,
        now: Instant,
    ) -> Option<Navigation> {
        let pressed = touch.is_some_and(|t| t.pressed);
        let rising = pressed && !self.last_touch_pressed;
        self.last_touch_pressed = pressed;
        if !rising {
            return None;
        }
        let event = touch?;
        let nav = classify_touch(event.y, panel_height)?;
        if let Some(prev) = self.last_navigation {
            if now.saturating_duration_since(prev) < debounce {
                tracing::debug!(y = event.y, "tap inside debounce window ignored");
                return None;
            }
        }
        self.navigate(nav);
        self.last_navigation = Some(now);
        Some(nav)
    }

    pub fn refresh_due(&self, now: Instant, interval: Duration) -> bool {
        now.saturating_duration_since(self.last_refresh_time) >= interval
    }

    pub fn mark_refreshed(&mut self, now: Instant) {
        self.last_refresh_time = now;
    }
}

/// What one loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOutcome {
    pub navigated: Option<Navigation>,
    pub presented: bool,
    pub frame_failed: bool,
}

/// Owns the tabs, the frame buffer and the dispatch state; the drivers are
/// lent to it per step so the caller keeps control of their lifetime.
pub struct TabDispatcher<S: StatsProvider> {
    tabs: Vec<Box<dyn Tab>>,
    stats: S,
    frame: FrameBuffer,
    state: DispatchState,
    timing: DispatchTiming,
    frames_presented: u64,
}

impl<S: StatsProvider> TabDispatcher<S> {
    pub fn new(
        tabs: Vec<Box<dyn Tab>>,
        stats: S,
        (width, height): (u16, u16),
        timing: DispatchTiming,
        now: Instant,
    ) -> Result<Self> {
        let state = DispatchState::new(tabs.len(), now)?;
        Ok(Self {
            tabs,
            stats,
            frame: FrameBuffer::new(width, height),
            state,
            timing,
            frames_presented: 0,
        })
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    pub fn timing(&self) -> DispatchTiming {
        self.timing
    }

    pub fn current_tab(&self) -> &dyn Tab {
        self.tabs[self.state.current_tab_index].as_ref()
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn stats(&self) -> &S {
        &self.stats
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// One loop iteration: poll touch, navigate on a qualifying edge, and
    /// redraw when navigation happened or the refresh interval elapsed.
    pub fn step<B, D, T>(
        &mut self,
        now: Instant,
        display: &mut St7796<B, D>,
        touch: &mut Ft6336u<T>,
    ) -> StepOutcome
    where
        B: DisplayBus,
        D: DelayNs,
        T: TouchBus,
    {
        let mut outcome = StepOutcome::default();
        // A failed read says nothing about the finger: keep the previous
        // pressed state so a held touch does not re-arm the edge detector.
        outcome.navigated = match touch.read() {
            Ok(sample) => {
                self.state
                    .on_touch(sample, self.frame.height(), self.timing.debounce, now)
            }
            Err(err) => {
                tracing::warn!(error = %err, "touch read failed; skipping navigation");
                None
            }
        };
        if let Some(nav) = outcome.navigated {
            tracing::info!(
                ?nav,
                tab = self.current_tab().name(),
                index = self.state.current_tab_index,
                "switched tab"
            );
        }

        let due = outcome.navigated.is_some()
            || self.state.refresh_due(now, self.timing.refresh_interval);
        if !due {
            return outcome;
        }

        let started = Instant::now();
        self.render();
        match display.present(&self.frame) {
            Ok(()) => {
                self.frames_presented += 1;
                outcome.presented = true;
                tracing::debug!(
                    tab = self.current_tab().name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "frame presented"
                );
            }
            Err(err) => {
                outcome.frame_failed = true;
                tracing::warn!(error = %err, "frame skipped; retrying at next refresh");
            }
        }
        self.state.mark_refreshed(now);
        outcome
    }

    /// Draw the active tab and the indicator strip into the frame buffer.
    pub fn render(&mut self) {
        let snapshot = self.stats.snapshot();
        let width = self.frame.width() as u32;
        let content_height = self.frame.height().saturating_sub(INDICATOR_HEIGHT) as u32;

        let tab = &self.tabs[self.state.current_tab_index];
        {
            let mut view = self
                .frame
                .view(Rectangle::new(Point::zero(), Size::new(width, content_height)));
            tab.render(&mut view, &snapshot);
        }
        self.draw_indicator(content_height as i32);
    }

    fn draw_indicator(&mut self, top: i32) {
        let width = self.frame.width() as u32;
        let count = self.tabs.len() as i32;
        let current = self.state.current_tab_index;
        let name = self.tabs[current].name().to_string();

        let mut view = self.frame.view(Rectangle::new(
            Point::new(0, top),
            Size::new(width, INDICATOR_HEIGHT as u32),
        ));
        let _ = view.clear(widgets::INDICATOR_BACKGROUND);

        let spacing = 40.min(width as i32 / (count + 1));
        let start_x = (width as i32 - (count - 1) * spacing) / 2;
        for i in 0..count {
            let centre = Point::new(start_x + i * spacing, 21);
            if i as usize == current {
                widgets::draw(
                    &mut view,
                    &Circle::with_center(centre, 13)
                        .into_styled(PrimitiveStyle::with_fill(widgets::ACCENT)),
                );
            } else {
                widgets::draw(
                    &mut view,
                    &Circle::with_center(centre, 9)
                        .into_styled(PrimitiveStyle::with_stroke(widgets::rgb(100, 100, 120), 1)),
                );
            }
        }
        widgets::text(
            &mut view,
            &name,
            Point::new(width as i32 / 2, 1),
            widgets::SMALL_FONT,
            widgets::LABEL,
            Alignment::Center,
        );
    }
}

/// Run the dispatcher until `running` is cleared. Blocks the calling thread.
pub fn run_display<S, B, D, T>(
    dispatcher: &mut TabDispatcher<S>,
    display: &mut St7796<B, D>,
    touch: &mut Ft6336u<T>,
    running: &AtomicBool,
) where
    S: StatsProvider,
    B: DisplayBus,
    D: DelayNs,
    T: TouchBus,
{
    let poll_interval = dispatcher.timing().poll_interval;
    tracing::info!(
        tabs = dispatcher.state().tab_count(),
        refresh_ms = dispatcher.timing().refresh_interval.as_millis() as u64,
        poll_ms = poll_interval.as_millis() as u64,
        "dispatch loop started"
    );
    while running.load(Ordering::SeqCst) {
        dispatcher.step(Instant::now(), display, touch);
        thread::sleep(poll_interval);
    }
    tracing::info!(
        frames = dispatcher.frames_presented(),
        "dispatch loop stopped"
    );
}
