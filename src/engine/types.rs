use glam::{IVec2, Vec3, Vec4};

use crate::engine::octree::OctreeParams;

/// Constants that depend on the *frame-buffer*, not on the scene.
#[derive(Clone, Copy, Debug)]
pub struct Screen {
    pub w: usize,
    pub h: usize,
    pub half_w: f32, // pre-derived for speed
    pub half_h: f32, // pre-derived for speed
}

/// Vertex after the perspective divide and viewport transform.
///
/// `x`/`y` are rounded to the nearest pixel corner and clamped to
/// `[0, w] × [0, h]`, so geometry clipped to the screen border lands exactly
/// on it. `z` stays NDC depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenVertex {
    pub x: i32,
    pub y: i32,
    pub z: f32,
}

impl ScreenVertex {
    #[inline]
    pub fn xy(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }
}

impl Screen {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            half_w: w as f32 * 0.5,
            half_h: h as f32 * 0.5,
        }
    }

    /// Clip-space → continuous screen space (`y` down), `z` = NDC depth.
    ///
    /// Callers guarantee `clip.w > 0`.
    #[inline]
    pub fn project(&self, clip: Vec4) -> Vec3 {
        let ndc = clip.truncate() / clip.w;
        Vec3::new(
            (ndc.x + 1.0) * self.half_w,
            (1.0 - ndc.y) * self.half_h,
            ndc.z,
        )
    }

    /// Clip-space → snapped screen vertex.
    #[inline]
    pub fn to_screen(&self, clip: Vec4) -> ScreenVertex {
        let p = self.project(clip);
        ScreenVertex {
            x: (p.x.round() as i32).clamp(0, self.w as i32),
            y: (p.y.round() as i32).clamp(0, self.h as i32),
            z: p.z,
        }
    }
}

/// Visibility strategy used by [`Engine::render_frame`](crate::engine::Engine::render_frame).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Plain per-pixel depth test, one scan pass per frame.
    #[default]
    ZBuffer,
    /// Per-triangle occlusion test against the screen quadtree.
    Hierarchical,
    /// Front-to-back octree walk with subtree culling plus the
    /// hierarchical per-triangle test.
    Octree,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [
        RenderMode::ZBuffer,
        RenderMode::Hierarchical,
        RenderMode::Octree,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RenderMode::ZBuffer => "z-buffer",
            RenderMode::Hierarchical => "hierarchical",
            RenderMode::Octree => "octree",
        }
    }

    #[inline]
    pub fn uses_hierarchy(self) -> bool {
        !matches!(self, RenderMode::ZBuffer)
    }
}

/// Counters for the last rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub nodes_visited: u32,
    pub nodes_culled: u32,
    pub triangles_visited: u32,
    /// Triangles with nothing left after clipping.
    pub clipped_away: u32,
    /// Triangles rejected by the occlusion hierarchy.
    pub occluded: u32,
    pub polygons_rasterized: u32,
    pub pixels_written: u32,
}

/// Knobs of the frame pipeline.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub mode: RenderMode,
    pub clear_color: Vec3,
    pub octree: OctreeParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::ZBuffer,
            clear_color: Vec3::splat(0.1),
            octree: OctreeParams::default(),
        }
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
