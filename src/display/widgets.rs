//! Drawing helpers shared by the tabs.

use embedded_graphics::{
    mono_font::{iso_8859_1, MonoFont, MonoTextStyle},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{PrimitiveStyleBuilder, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

use crate::display::framebuffer::FrameView;

pub const MARGIN: i32 = 10;

pub const TITLE_FONT: &MonoFont<'static> = &iso_8859_1::FONT_10X20;
pub const LABEL_FONT: &MonoFont<'static> = &iso_8859_1::FONT_9X15;
pub const VALUE_FONT: &MonoFont<'static> = &iso_8859_1::FONT_9X15_BOLD;
pub const SMALL_FONT: &MonoFont<'static> = &iso_8859_1::FONT_7X13;

pub const fn rgb(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

pub const BACKGROUND: Rgb565 = rgb(20, 20, 30);
pub const INDICATOR_BACKGROUND: Rgb565 = rgb(30, 30, 40);
pub const TITLE: Rgb565 = rgb(255, 255, 255);
pub const LABEL: Rgb565 = rgb(180, 180, 200);
pub const VALUE: Rgb565 = rgb(255, 255, 255);
pub const MUTED: Rgb565 = rgb(150, 150, 170);
pub const BAR_TRACK: Rgb565 = rgb(40, 40, 50);
pub const BAR_OUTLINE: Rgb565 = rgb(100, 100, 100);
pub const ACCENT: Rgb565 = rgb(100, 150, 255);

pub fn temperature_color(celsius: f32) -> Rgb565 {
    if celsius < 50.0 {
        rgb(100, 255, 100)
    } else if celsius < 70.0 {
        rgb(255, 255, 100)
    } else {
        rgb(255, 100, 100)
    }
}

pub fn cpu_color(percent: f32) -> Rgb565 {
    if percent < 50.0 {
        rgb(50, 200, 50)
    } else if percent < 80.0 {
        rgb(255, 200, 50)
    } else {
        rgb(255, 50, 50)
    }
}

pub fn storage_color(percent: f32) -> Rgb565 {
    if percent < 70.0 {
        rgb(100, 200, 255)
    } else if percent < 90.0 {
        rgb(255, 200, 50)
    } else {
        rgb(255, 50, 50)
    }
}

/// Draw anything onto a view. Views never fail.
pub fn draw<T>(view: &mut FrameView<'_>, item: &T)
where
    T: Drawable<Color = Rgb565>,
{
    let _ = item.draw(view);
}

/// Text with its top edge at `pos.y`.
pub fn text(
    view: &mut FrameView<'_>,
    content: &str,
    pos: Point,
    font: &MonoFont<'_>,
    color: Rgb565,
    alignment: Alignment,
) {
    let style = TextStyleBuilder::new()
        .alignment(alignment)
        .baseline(Baseline::Top)
        .build();
    draw(
        view,
        &Text::with_text_style(content, pos, MonoTextStyle::new(font, color), style),
    );
}

/// Centred title across the top of the view; returns the next free row.
pub fn title(view: &mut FrameView<'_>, content: &str) -> i32 {
    let centre = view.size().width as i32 / 2;
    text(
        view,
        content,
        Point::new(centre, 15),
        TITLE_FONT,
        TITLE,
        Alignment::Center,
    );
    55
}

/// `label` flush left and `value` flush right on the same row.
pub fn label_value(view: &mut FrameView<'_>, y: i32, label: &str, value: &str, color: Rgb565) {
    let right = view.size().width as i32 - MARGIN;
    text(
        view,
        label,
        Point::new(MARGIN, y),
        LABEL_FONT,
        LABEL,
        Alignment::Left,
    );
    text(
        view,
        value,
        Point::new(right, y),
        VALUE_FONT,
        color,
        Alignment::Right,
    );
}

/// Horizontal bar filled to `percent` (clamped to 0..=100).
pub fn progress_bar(view: &mut FrameView<'_>, area: Rectangle, percent: f32, color: Rgb565) {
    let track = PrimitiveStyleBuilder::new()
        .stroke_color(BAR_OUTLINE)
        .stroke_width(1)
        .fill_color(BAR_TRACK)
        .build();
    draw(view, &area.into_styled(track));
    let filled = filled_width(area.size.width, percent);
    if filled > 0 {
        let fill = PrimitiveStyleBuilder::new().fill_color(color).build();
        draw(
            view,
            &Rectangle::new(area.top_left, Size::new(filled, area.size.height)).into_styled(fill),
        );
    }
}

/// Progress bar with the percentage printed in its middle.
pub fn labelled_bar(view: &mut FrameView<'_>, area: Rectangle, percent: f32, color: Rgb565) {
    progress_bar(view, area, percent, color);
    let centre = area.center();
    let style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    draw(
        view,
        &Text::with_text_style(
            &format!("{percent:.1}%"),
            centre,
            MonoTextStyle::new(VALUE_FONT, VALUE),
            style,
        ),
    );
}

pub fn filled_width(width: u32, percent: f32) -> u32 {
    let pct = percent.clamp(0.0, 100.0);
    (width as f32 * pct / 100.0) as u32
}

/// Shorten `s` to at most `max` characters, ending in `...` when cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::framebuffer::FrameBuffer;

    #[test]
    fn filled_width_clamps() {
        assert_eq!(filled_width(200, 50.0), 100);
        assert_eq!(filled_width(200, -5.0), 0);
        assert_eq!(filled_width(200, 150.0), 200);
    }

    #[test]
    fn truncate_marks_cut_strings() {
        assert_eq!(truncate("/", 20), "/");
        assert_eq!(truncate("/mnt/some/very/long/mount", 20), "/mnt/some/very/lo...");
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        let mut fb = FrameBuffer::new(100, 20);
        {
            let mut view = fb.view(fb_area(100, 20));
            progress_bar(
                &mut view,
                Rectangle::new(Point::new(0, 0), Size::new(100, 10)),
                25.0,
                Rgb565::RED,
            );
        }
        assert_eq!(fb.pixel(10, 5), Some(Rgb565::RED));
        assert_eq!(fb.pixel(50, 5), Some(BAR_TRACK));
        assert_eq!(fb.pixel(50, 15), Some(Rgb565::BLACK));
    }

    #[test]
    fn thresholds_pick_colours() {
        assert_eq!(temperature_color(45.0), rgb(100, 255, 100));
        assert_eq!(temperature_color(75.0), rgb(255, 100, 100));
        assert_eq!(cpu_color(60.0), rgb(255, 200, 50));
        assert_eq!(storage_color(95.0), rgb(255, 50, 50));
    }

    fn fb_area(w: u32, h: u32) -> Rectangle {
        Rectangle::new(Point::zero(), Size::new(w, h))
    }
}
