//! Off-screen rendering: the frame buffer, the tabs that draw into it and
//! the small widget kit they share.

pub mod framebuffer;
pub mod tabs;
pub mod widgets;

pub use framebuffer::{FrameBuffer, FrameView};
pub use tabs::{default_tabs, Tab};
