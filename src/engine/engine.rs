//! ----------------------------------------------------------------------------
//! **Frame pipeline**
//!
//! Owns every per-resolution structure (depth buffer, occlusion hierarchy,
//! rasterizer tables) plus the per-mesh spatial index, and drives one frame:
//!
//! ```text
//! clip → project → [hierarchy test] → scanline tables → depth test → sink
//! ```
//!
//! The three [`RenderMode`]s produce pixel-identical images; they differ
//! only in how much work is rejected before scan conversion.
//! ----------------------------------------------------------------------------

use glam::{IVec2, Mat4, Vec3};
use smallvec::SmallVec;

use crate::{
    engine::{
        clipper::{self, W_EPSILON},
        depth::DepthBuffer,
        error::EngineError,
        octree::{SpatialIndex, SpatialNode, Walk},
        quadtree::OcclusionHierarchy,
        scanline::{DepthTarget, ScanlineRasterizer},
        shading::Shading,
        types::{EngineConfig, FrameStats, RenderMode, Screen, ScreenVertex},
    },
    renderer::PixelSink,
    world::{Camera, Mesh, Triangle, TriangleId},
};

/// Slack subtracted from a node's nearest depth before the hierarchy test.
const NODE_DEPTH_SLACK: f32 = 1e-5;

/// Slack, in pixels, for the off-screen node test.
const NODE_SCREEN_SLACK: f32 = 1.0;

pub struct Engine {
    screen: Screen,
    config: EngineConfig,
    depth: DepthBuffer,
    hierarchy: OcclusionHierarchy,
    rasterizer: ScanlineRasterizer,
    index: Option<SpatialIndex>,
    stats: FrameStats,
}

impl Engine {
    pub fn new(width: usize, height: usize, config: EngineConfig) -> Result<Self, EngineError> {
        // validates the resolution for everything below
        let hierarchy = OcclusionHierarchy::new(width, height)?;

        log::debug!(
            "engine {}x{}, mode {}",
            width,
            height,
            config.mode.name()
        );

        Ok(Self {
            screen: Screen::new(width, height),
            config,
            depth: DepthBuffer::new(width, height),
            hierarchy,
            rasterizer: ScanlineRasterizer::new(width, height),
            index: None,
            stats: FrameStats::default(),
        })
    }

    /*──────────────────────────── configuration ─────────────────────────*/

    pub fn set_mode(&mut self, mode: RenderMode) {
        if mode != self.config.mode {
            log::debug!("render mode {} → {}", self.config.mode.name(), mode.name());
        }
        self.config.mode = mode;
    }

    #[inline]
    pub fn mode(&self) -> RenderMode {
        self.config.mode
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Build the spatial index for `mesh`. Call again whenever the mesh
    /// changes; [`render_frame`](Self::render_frame) only notices a change in
    /// triangle count.
    pub fn load_mesh(&mut self, mesh: &Mesh) {
        self.index = Some(SpatialIndex::build(mesh.faces(), self.config.octree));
    }

    /*──────────────────────────── accessors ─────────────────────────────*/

    /// Counters of the last rendered frame.
    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    #[inline]
    pub fn depth_buffer(&self) -> &DepthBuffer {
        &self.depth
    }

    #[inline]
    pub fn hierarchy(&self) -> &OcclusionHierarchy {
        &self.hierarchy
    }

    #[inline]
    pub fn spatial_index(&self) -> Option<&SpatialIndex> {
        self.index.as_ref()
    }

    /*──────────────────────────── frame entry ───────────────────────────*/

    /// Render `mesh` as seen from `camera` into `sink` and present it.
    pub fn render_frame<S: PixelSink + ?Sized>(
        &mut self,
        camera: &Camera,
        mesh: &Mesh,
        shading: &Shading,
        sink: &mut S,
    ) -> Result<(), EngineError> {
        let mode = self.config.mode;
        self.stats = FrameStats::default();

        sink.clear(self.config.clear_color);
        self.depth.clear();
        if mode.uses_hierarchy() {
            self.hierarchy.reset();
        }
        self.rasterizer.begin();

        let view = camera.view_matrix();
        let view_proj = camera.projection_matrix() * view;

        match mode {
            RenderMode::ZBuffer => self.render_zbuffer(view_proj, mesh, shading, sink),
            RenderMode::Hierarchical => self.render_hierarchical(view_proj, mesh, shading, sink),
            RenderMode::Octree => {
                if self
                    .index
                    .as_ref()
                    .is_none_or(|i| i.triangle_count() != mesh.len())
                {
                    self.load_mesh(mesh);
                }
                self.render_octree(view, view_proj, mesh, shading, sink);
            }
        }

        sink.present()?;
        log::trace!("{} frame: {:?}", mode.name(), self.stats);
        Ok(())
    }

    /// One batch, flat depth buffer.
    fn render_zbuffer<S: PixelSink + ?Sized>(
        &mut self,
        view_proj: Mat4,
        mesh: &Mesh,
        shading: &Shading,
        sink: &mut S,
    ) {
        for (id, tri) in mesh.faces().iter().enumerate() {
            self.queue_triangle(view_proj, id as TriangleId, tri, shading, false);
        }
        self.flush(false, sink);
    }

    /// Mesh order, one triangle at a time, each tested against the
    /// hierarchy built by the triangles before it.
    fn render_hierarchical<S: PixelSink + ?Sized>(
        &mut self,
        view_proj: Mat4,
        mesh: &Mesh,
        shading: &Shading,
        sink: &mut S,
    ) {
        for (id, tri) in mesh.faces().iter().enumerate() {
            self.queue_triangle(view_proj, id as TriangleId, tri, shading, true);
            self.flush(true, sink);
        }
    }

    /// Front-to-back octree walk; hidden subtrees are skipped whole.
    fn render_octree<S: PixelSink + ?Sized>(
        &mut self,
        view: Mat4,
        view_proj: Mat4,
        mesh: &Mesh,
        shading: &Shading,
        sink: &mut S,
    ) {
        // moved out for the walk so the visitor may borrow `self` mutably
        let Some(index) = self.index.take() else {
            return;
        };

        index.walk_front_to_back(view, |node| {
            if !self.node_visible(view_proj, node) {
                self.stats.nodes_culled += 1;
                return Walk::Skip;
            }
            self.stats.nodes_visited += 1;

            for &id in &node.triangles {
                if let Some(tri) = mesh.face(id) {
                    self.queue_triangle(view_proj, id, tri, shading, true);
                }
            }
            self.flush(true, sink);
            Walk::Descend
        });

        self.index = Some(index);
    }

    /*──────────────────────────── per-primitive ─────────────────────────*/

    /// Clip, project and (optionally) hierarchy-test one mesh triangle, then
    /// queue its fan pieces in the rasterizer.
    fn queue_triangle(
        &mut self,
        view_proj: Mat4,
        id: TriangleId,
        tri: &Triangle,
        shading: &Shading,
        occlusion_test: bool,
    ) {
        self.stats.triangles_visited += 1;

        let clip_space = tri.positions().map(|p| view_proj * p.extend(1.0));
        let poly = clipper::clip(&clip_space);
        if poly.is_empty() {
            self.stats.clipped_away += 1;
            return;
        }

        let projected: SmallVec<[ScreenVertex; 10]> =
            poly.iter().map(|&c| self.screen.to_screen(c)).collect();

        if occlusion_test {
            let nearest = projected.iter().map(|v| v.z).fold(f32::INFINITY, f32::min);
            let points: SmallVec<[IVec2; 10]> = projected.iter().map(ScreenVertex::xy).collect();
            if self.hierarchy.is_occluded(&points, nearest) {
                self.stats.occluded += 1;
                return;
            }
        }

        let color = shading.flat_color(tri);
        for piece in clipper::fan(&projected) {
            if self.rasterizer.push_triangle(&piece, id, color) {
                self.stats.polygons_rasterized += 1;
            }
        }
    }

    /// Scan-convert whatever is queued.
    fn flush<S: PixelSink + ?Sized>(&mut self, hierarchical: bool, sink: &mut S) {
        if self.rasterizer.pending() == 0 {
            return;
        }
        let mut target = if hierarchical {
            DepthTarget::Hierarchical {
                depth: &mut self.depth,
                tree: &mut self.hierarchy,
            }
        } else {
            DepthTarget::Flat(&mut self.depth)
        };
        let raster = self.rasterizer.flush(&mut target, sink);
        self.stats.pixels_written += raster.pixels_written;
    }

    /// Conservative visibility of an octree cube.
    ///
    /// `false` only if every point of the cube is off-screen, beyond the far
    /// plane, or behind the hierarchy cell enclosing its screen rectangle.
    fn node_visible(&self, view_proj: Mat4, node: &SpatialNode) -> bool {
        let corners = node.bounds.corners().map(|c| view_proj * c.extend(1.0));
        if corners.iter().any(|c| c.w <= W_EPSILON) {
            // straddles the eye plane, projection is meaningless
            return true;
        }

        let (lo, hi) = corners
            .iter()
            .map(|&c| self.screen.project(c))
            .fold((Vec3::INFINITY, Vec3::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p), hi.max(p))
            });

        let (w, h) = (self.screen.w as f32, self.screen.h as f32);
        if hi.x < -NODE_SCREEN_SLACK
            || hi.y < -NODE_SCREEN_SLACK
            || lo.x > w + NODE_SCREEN_SLACK
            || lo.y > h + NODE_SCREEN_SLACK
            || lo.z > 1.0
        {
            return false;
        }

        let rect = [
            IVec2::new(
                (lo.x.floor().clamp(0.0, w)) as i32,
                (lo.y.floor().clamp(0.0, h)) as i32,
            ),
            IVec2::new(
                (hi.x.ceil().clamp(0.0, w)) as i32,
                (hi.y.ceil().clamp(0.0, h)) as i32,
            ),
        ];
        !self
            .hierarchy
            .is_occluded(&rect, lo.z - NODE_DEPTH_SLACK)
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
