use std::convert::Infallible;

use embedded_graphics::{
    pixelcolor::{IntoStorage, Rgb565},
    prelude::*,
    primitives::Rectangle,
    Pixel,
};

/// Off-screen RGB565 image the size of the panel in its mounted orientation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    pixels: Vec<Rgb565>,
}

impl FrameBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb565::BLACK; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb565> {
        self.index(x as i32, y as i32).map(|idx| self.pixels[idx])
    }

    pub fn fill(&mut self, color: Rgb565) {
        self.pixels.fill(color);
    }

    /// Length of the encoded frame in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.len() * 2
    }

    /// Encode row-major, big-endian RGB565 as the controller expects it.
    pub fn encode_be(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.byte_len());
        for px in &self.pixels {
            out.extend_from_slice(&px.into_storage().to_be_bytes());
        }
    }

    /// Borrow a clipped, translated region so a tab can draw without owning the frame.
    pub fn view(&mut self, area: Rectangle) -> FrameView<'_> {
        let area = area.intersection(&self.bounding_box());
        FrameView { fb: self, area }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some(idx) = self.index(point.x, point.y) {
                self.pixels[idx] = color;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color);
        Ok(())
    }
}

/// Mutable window into a [`FrameBuffer`]; coordinates start at the window's top-left.
pub struct FrameView<'a> {
    fb: &'a mut FrameBuffer,
    area: Rectangle,
}

impl FrameView<'_> {
    pub fn area(&self) -> Rectangle {
        self.area
    }
}

impl OriginDimensions for FrameView<'_> {
    fn size(&self) -> Size {
        self.area.size
    }
}

impl DrawTarget for FrameView<'_> {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let size = self.area.size;
        let origin = self.area.top_left;
        self.fb.draw_iter(pixels.into_iter().filter_map(|Pixel(p, c)| {
            let inside =
                p.x >= 0 && p.y >= 0 && (p.x as u32) < size.width && (p.y as u32) < size.height;
            inside.then(|| Pixel(p + origin, c))
        }))
    }
}
