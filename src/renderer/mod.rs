//! Pixel sink abstraction.
//!
//! *The engine never owns a window.* It writes shaded pixels into a type
//! that implements [`PixelSink`] and asks it to [`present`](PixelSink::present)
//! once the frame is complete.
//!
//! * [`Framebuffer`] is the in-memory back-end used by the viewer, the tests
//!   and the benches.
//! * Anything that can show a `&[Rgba]` (a window, a video encoder, …) can
//!   wrap a [`Framebuffer`] and forward its front buffer.

use glam::Vec3;

/// Pixel format of the software frame-buffer (0x00RRGGBB).
pub type Rgba = u32;

/// Things that can go wrong when handing a finished frame to the display.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The display back-end refused the buffer.
    #[error("failed to present frame: {0}")]
    Present(String),
}

/// Destination of the rasterizer's colour writes.
pub trait PixelSink {
    /// Fill the whole back buffer with `color`.
    fn clear(&mut self, color: Vec3);

    /// Write one pixel. `(0, 0)` is the top-left corner.
    fn set_pixel(&mut self, x: usize, y: usize, color: Vec3);

    /// Push the completed raster to the display.
    fn present(&mut self) -> Result<(), SinkError>;
}

/// Pack a linear `[0, 1]` colour into `0x00RRGGBB`, saturating out-of-range
/// channels.
#[inline]
pub fn pack_rgb(color: Vec3) -> Rgba {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    ((c.x as u32) << 16) | ((c.y as u32) << 8) | c.z as u32
}

/// Inverse of [`pack_rgb`], up to quantisation.
#[inline]
pub fn unpack_rgb(px: Rgba) -> Vec3 {
    Vec3::new(
        ((px >> 16) & 0xFF) as f32,
        ((px >> 8) & 0xFF) as f32,
        (px & 0xFF) as f32,
    ) / 255.0
}

pub mod software;

pub use software::Framebuffer;
