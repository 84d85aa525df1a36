//! ---------------------------------------------------------------------------
//! Double-buffered CPU frame-buffer
//!
//! * The rasterizer writes into the **back** buffer through [`PixelSink`].
//! * [`PixelSink::present`] copies the back buffer into the **front** buffer,
//!   which is what a window or an image writer reads.
//! ---------------------------------------------------------------------------

use glam::Vec3;

use crate::renderer::{PixelSink, Rgba, SinkError, pack_rgb};

/// In-memory pixel sink in `0x00RRGGBB` format.
pub struct Framebuffer {
    back: Vec<Rgba>,
    front: Vec<Rgba>,
    width: usize,
    height: usize,
    frames: u64,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            back: vec![0; width * height],
            front: vec![0; width * height],
            width,
            height,
            frames: 0,
        }
    }

    /// (Re)allocate for a new resolution. Contents are undefined afterwards.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.back.resize(width * height, 0);
            self.front.resize(width * height, 0);
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Last presented frame.
    #[inline]
    pub fn front(&self) -> &[Rgba] {
        &self.front
    }

    /// Frame currently being drawn.
    #[inline]
    pub fn back(&self) -> &[Rgba] {
        &self.back
    }

    /// Presented pixel at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Rgba {
        self.front[y * self.width + x]
    }

    /// Number of frames presented so far.
    #[inline]
    pub fn frames_presented(&self) -> u64 {
        self.frames
    }
}

/*──────────────────────── PixelSink impl ────────────────────────────*/
impl PixelSink for Framebuffer {
    fn clear(&mut self, color: Vec3) {
        self.back.fill(pack_rgb(color));
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: Vec3) {
        debug_assert!(x < self.width && y < self.height);
        self.back[y * self.width + x] = pack_rgb(color);
    }

    fn present(&mut self) -> Result<(), SinkError> {
        debug_assert_eq!(self.front.len(), self.back.len());
        self.front.copy_from_slice(&self.back); // one fast memcpy
        self.frames += 1;
        Ok(())
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
