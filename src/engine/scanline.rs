//! ----------------------------------------------------------------------------
//! **Scanline rasterizer** – classified polygon / edge tables
//!
//! 1. `push_triangle` turns a projected triangle into a [`Polygon`] (screen
//!    plane `a·x + b·y + c·z + d = 0`) filed under its top scanline, plus one
//!    [`Edge`] per non-horizontal side filed under the edge's top scanline.
//! 2. `flush` walks the touched rows top to bottom. Polygons starting on a
//!    row become an [`ActiveEdgePair`]; every pair fills one span per row and
//!    steps its x and depth incrementally. When an edge runs out before its
//!    polygon does, the polygon's edge starting on the next row takes over.
//!
//! Fill rule: row `y` covers pixels `[ceil(xl), ceil(xr))`, rows
//! `[top, bottom)`. Adjacent triangles sharing an edge never both write a
//! pixel.
//! ----------------------------------------------------------------------------

use glam::Vec3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    engine::{depth::DepthBuffer, quadtree::OcclusionHierarchy, types::ScreenVertex},
    renderer::PixelSink,
    world::TriangleId,
};

/// Twice the signed pixel area below which a triangle counts as degenerate.
const AREA_EPSILON: f32 = 0.5;

/// Screen-space plane plus everything the span loop needs per polygon.
#[derive(Clone, Copy, Debug)]
pub struct Polygon {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    /// Unique within one batch; ties edges to their polygon.
    pub id: u32,
    /// Mesh triangle this polygon came from, used to break depth ties.
    pub triangle: TriangleId,
    /// Scanlines still to be drawn.
    pub remaining: u32,
    pub color: Vec3,
    pub z_min: f32,
    pub z_max: f32,
    pub x_min: i32,
    pub x_max: i32,
}

impl Polygon {
    /// Depth of the plane at `(x, y)`.
    #[inline]
    pub fn depth_at(&self, x: f32, y: f32) -> f32 {
        -(self.a * x + self.b * y + self.d) / self.c
    }
}

/// One non-horizontal polygon side, stored under its top scanline.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    /// x at the top end.
    pub x: f32,
    /// x step per scanline.
    pub dx: f32,
    /// Scanlines covered.
    pub dy: u32,
    pub poly: u32,
}

/// Left and right edge of a polygon crossing the current scanline.
#[derive(Clone, Copy, Debug)]
pub struct ActiveEdgePair {
    pub xl: f32,
    pub dxl: f32,
    pub dyl: u32,
    pub xr: f32,
    pub dxr: f32,
    pub dyr: u32,
    /// Depth at `(xl, y)`.
    pub zl: f32,
    /// Depth step per pixel.
    pub dzx: f32,
    /// Depth step per scanline at fixed x.
    pub dzy: f32,
    pub poly: u32,
}

/// Where depth tests go.
pub enum DepthTarget<'a> {
    /// Plain z-buffer.
    Flat(&'a mut DepthBuffer),
    /// Z-buffer plus the occlusion hierarchy kept in sync on every write.
    Hierarchical {
        depth: &'a mut DepthBuffer,
        tree: &'a mut OcclusionHierarchy,
    },
}

impl DepthTarget<'_> {
    #[inline]
    fn test_and_set(&mut self, x: usize, y: usize, z: f32, owner: TriangleId) -> bool {
        match self {
            DepthTarget::Flat(depth) => depth.test_and_set(x, y, z, owner),
            DepthTarget::Hierarchical { depth, tree } => {
                if depth.test_and_set(x, y, z, owner) {
                    tree.update(x, y, z);
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// Result of one [`ScanlineRasterizer::flush`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub polygons: u32,
    pub pixels_written: u32,
}

pub struct ScanlineRasterizer {
    width: usize,
    height: usize,
    polygon_table: Vec<Vec<Polygon>>,
    edge_table: Vec<Vec<Edge>>,
    active_polygons: FxHashMap<u32, Polygon>,
    active_pairs: Vec<ActiveEdgePair>,
    next_id: u32,
    /// Rows `[lo, hi)` that hold table entries.
    dirty: Option<(usize, usize)>,
}

impl ScanlineRasterizer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            polygon_table: vec![Vec::new(); height],
            edge_table: vec![Vec::new(); height],
            active_polygons: FxHashMap::default(),
            active_pairs: Vec::new(),
            next_id: 0,
            dirty: None,
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

    /// Polygons waiting for the next [`flush`](Self::flush).
    #[inline]
    pub fn pending(&self) -> u32 {
        self.next_id
    }

    /// Drop everything queued so far.
    pub fn begin(&mut self) {
        if let Some((lo, hi)) = self.dirty.take() {
            for row in &mut self.polygon_table[lo..hi] {
                row.clear();
            }
            for row in &mut self.edge_table[lo..hi] {
                row.clear();
            }
        }
        self.active_polygons.clear();
        self.active_pairs.clear();
        self.next_id = 0;
    }

    /// Queue a projected triangle. Vertices must lie inside
    /// `[0, width] × [0, height]` (see [`Screen::to_screen`](crate::engine::Screen::to_screen)).
    ///
    /// Returns `false` when it covers no scanline or has no area.
    pub fn push_triangle(
        &mut self,
        v: &[ScreenVertex; 3],
        triangle: TriangleId,
        color: Vec3,
    ) -> bool {
        if v.iter().any(|p| p.y < 0 || p.y > self.height as i32) {
            return false;
        }
        let top = v.iter().map(|p| p.y).min().unwrap_or(0);
        let bottom = v.iter().map(|p| p.y).max().unwrap_or(0);
        if bottom <= top {
            return false;
        }

        let (mut a, mut b, mut c, mut d) = (0.0, 0.0, 0.0, 0.0);
        for j in 0..3 {
            let p = v[j];
            let q = v[(j + 1) % 3];
            let r = v[(j + 2) % 3];
            let (px, py) = (p.x as f32, p.y as f32);
            let (qx, qy) = (q.x as f32, q.y as f32);
            let (rx, ry) = (r.x as f32, r.y as f32);
            a += py * (q.z - r.z);
            b += p.z * (qx - rx);
            c += px * (qy - ry);
            d -= px * (qy * r.z - ry * q.z);
        }
        if c.abs() < AREA_EPSILON {
            return false;
        }

        let id = self.next_id;
        self.next_id += 1;

        let (z_min, z_max) = v
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.z), hi.max(p.z))
            });
        let poly = Polygon {
            a,
            b,
            c,
            d,
            id,
            triangle,
            remaining: (bottom - top) as u32,
            color,
            z_min,
            z_max,
            x_min: v.iter().map(|p| p.x).min().unwrap_or(0),
            x_max: v.iter().map(|p| p.x).max().unwrap_or(0),
        };
        self.polygon_table[top as usize].push(poly);

        for j in 0..3 {
            let (mut p, mut q) = (v[j], v[(j + 1) % 3]);
            if p.y == q.y {
                continue;
            }
            if p.y > q.y {
                std::mem::swap(&mut p, &mut q);
            }
            let dy = q.y - p.y;
            self.edge_table[p.y as usize].push(Edge {
                x: p.x as f32,
                dx: (q.x - p.x) as f32 / dy as f32,
                dy: dy as u32,
                poly: id,
            });
        }

        let (lo, hi) = (top as usize, bottom as usize);
        self.dirty = Some(match self.dirty {
            Some((l, h)) => (l.min(lo), h.max(hi)),
            None => (lo, hi),
        });
        true
    }

    /// Scan-convert everything queued since the last flush, then reset.
    pub fn flush<S: PixelSink + ?Sized>(
        &mut self,
        target: &mut DepthTarget<'_>,
        sink: &mut S,
    ) -> RasterStats {
        let mut stats = RasterStats {
            polygons: self.next_id,
            ..RasterStats::default()
        };
        let Some((lo, hi)) = self.dirty else {
            return stats;
        };

        let Self {
            width,
            polygon_table,
            edge_table,
            active_polygons,
            active_pairs,
            ..
        } = self;
        let width = *width;

        for y in lo..hi {
            /* (a) polygons entering on this row */
            for poly in &polygon_table[y] {
                if let Some(pair) = activate(poly, &edge_table[y], y) {
                    active_polygons.insert(poly.id, *poly);
                    active_pairs.push(pair);
                }
            }

            /* (b) spans, (c) step edges */
            active_pairs.retain_mut(|pair| {
                let Some(poly) = active_polygons.get(&pair.poly) else {
                    contract_violation("active edge pair without polygon", pair.poly);
                    return false;
                };
                stats.pixels_written += fill_span(pair, poly, y, width, target, sink);

                if poly.remaining <= 1 {
                    return false;
                }
                step(pair, poly, edge_table.get(y + 1).map_or(&[][..], |r| r.as_slice()), y + 1)
            });

            /* (d) retire finished polygons */
            active_polygons.retain(|_, p| {
                p.remaining -= 1;
                p.remaining > 0
            });
        }

        self.begin();
        stats
    }
}

/// Pair up the two edges of `poly` that start on row `y`.
fn activate(poly: &Polygon, row: &[Edge], y: usize) -> Option<ActiveEdgePair> {
    let starts: SmallVec<[Edge; 3]> = row.iter().filter(|e| e.poly == poly.id).copied().collect();
    if starts.len() != 2 {
        contract_violation("polygon does not start with exactly two edges", poly.id);
        return None;
    }
    let (l, r) = if starts[0].x < starts[1].x
        || (starts[0].x == starts[1].x && starts[0].dx <= starts[1].dx)
    {
        (starts[0], starts[1])
    } else {
        (starts[1], starts[0])
    };

    Some(ActiveEdgePair {
        xl: l.x,
        dxl: l.dx,
        dyl: l.dy,
        xr: r.x,
        dxr: r.dx,
        dyr: r.dy,
        zl: poly.depth_at(l.x, y as f32),
        dzx: -poly.a / poly.c,
        dzy: -poly.b / poly.c,
        poly: poly.id,
    })
}

/// Write one span; returns the number of pixels that passed the depth test.
fn fill_span<S: PixelSink + ?Sized>(
    pair: &ActiveEdgePair,
    poly: &Polygon,
    y: usize,
    width: usize,
    target: &mut DepthTarget<'_>,
    sink: &mut S,
) -> u32 {
    let lo = pair.xl.ceil().max(poly.x_min as f32).max(0.0);
    let hi = pair.xr.ceil().min(poly.x_max as f32).min(width as f32);
    if !(lo < hi) {
        return 0;
    }
    let (x0, x1) = (lo as usize, hi as usize);

    let mut written = 0;
    let mut z = pair.zl + (x0 as f32 - pair.xl) * pair.dzx;
    for x in x0..x1 {
        let zc = z.clamp(poly.z_min, poly.z_max);
        if target.test_and_set(x, y, zc, poly.triangle) {
            sink.set_pixel(x, y, poly.color);
            written += 1;
        }
        z += pair.dzx;
    }
    written
}

/// Advance `pair` to row `next_y`; returns `false` if the pair must be dropped.
fn step(pair: &mut ActiveEdgePair, poly: &Polygon, next_row: &[Edge], next_y: usize) -> bool {
    pair.xl += pair.dxl;
    pair.xr += pair.dxr;
    pair.zl += pair.dzy + pair.dzx * pair.dxl;
    pair.dyl -= 1;
    pair.dyr -= 1;

    if pair.dyl > 0 && pair.dyr > 0 {
        return true;
    }
    if pair.dyl == 0 && pair.dyr == 0 {
        contract_violation("both edges expired before their polygon", poly.id);
        return false;
    }
    let Some(next) = next_row.iter().find(|e| e.poly == poly.id) else {
        contract_violation("no edge continues the polygon", poly.id);
        return false;
    };
    if pair.dyl == 0 {
        pair.xl = next.x;
        pair.dxl = next.dx;
        pair.dyl = next.dy;
    } else {
        pair.xr = next.x;
        pair.dxr = next.dx;
        pair.dyr = next.dy;
    }
    pair.zl = poly.depth_at(pair.xl, next_y as f32);
    true
}

#[cold]
fn contract_violation(what: &str, poly: u32) {
    if cfg!(debug_assertions) {
        panic!("{what} (polygon {poly})");
    }
    log::warn!("scanline: {what} (polygon {poly}), skipped");
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::depth::FAR_DEPTH, renderer::Framebuffer};

    fn sv(x: i32, y: i32, z: f32) -> ScreenVertex {
        ScreenVertex { x, y, z }
    }

    fn raster(
        w: usize,
        h: usize,
        tris: &[([ScreenVertex; 3], TriangleId)],
    ) -> (DepthBuffer, Framebuffer, RasterStats) {
        let mut r = ScanlineRasterizer::new(w, h);
        let mut zb = DepthBuffer::new(w, h);
        let mut fb = Framebuffer::new(w, h);
        for (t, id) in tris {
            r.push_triangle(t, *id, Vec3::ONE);
        }
        let stats = r.flush(&mut DepthTarget::Flat(&mut zb), &mut fb);
        (zb, fb, stats)
    }

    fn covered(zb: &DepthBuffer) -> usize {
        zb.as_slice().iter().filter(|z| **z != FAR_DEPTH).count()
    }

    #[test]
    fn right_triangle_follows_fill_rule() {
        let tri = [sv(0, 0, 0.5), sv(10, 0, 0.5), sv(0, 10, 0.5)];
        let (zb, _, stats) = raster(16, 16, &[(tri, 0)]);
        assert_eq!(stats.polygons, 1);
        assert_eq!(stats.pixels_written, 55);
        assert_eq!(covered(&zb), 55);
        for y in 0..10 {
            for x in 0..16 {
                let inside = x < 10 - y;
                assert_eq!(zb.get(x, y) == 0.5, inside, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn edge_hand_off_at_middle_vertex() {
        // right side bends at (20, 10)
        let tri = [sv(0, 0, 0.0), sv(20, 10, 0.0), sv(0, 20, 0.0)];
        let (zb, _, stats) = raster(32, 32, &[(tri, 0)]);
        assert_eq!(stats.pixels_written, 200);
        assert_eq!(covered(&zb), 200);
        assert_ne!(zb.get(19, 10), FAR_DEPTH);
        assert_eq!(zb.get(20, 10), FAR_DEPTH);
    }

    #[test]
    fn depth_follows_the_plane() {
        // z grows with x
        let tri = [sv(0, 0, 0.0), sv(20, 0, 0.4), sv(0, 20, 0.0)];
        let (zb, _, _) = raster(32, 32, &[(tri, 0)]);
        for (x, y) in [(0, 0), (5, 3), (10, 9), (2, 15)] {
            let expect = 0.02 * x as f32;
            assert!((zb.get(x, y) - expect).abs() < 1e-5, "({x},{y})");
        }
    }

    #[test]
    fn shared_edge_pixels_are_written_once() {
        let a = [sv(0, 0, 0.3), sv(8, 0, 0.3), sv(0, 8, 0.3)];
        let b = [sv(8, 0, 0.3), sv(8, 8, 0.3), sv(0, 8, 0.3)];
        let (zb, _, stats) = raster(8, 8, &[(a, 0), (b, 1)]);
        assert_eq!(stats.pixels_written, 64);
        assert_eq!(covered(&zb), 64);
    }

    #[test]
    fn degenerate_triangles_are_rejected() {
        let mut r = ScanlineRasterizer::new(8, 8);
        assert!(!r.push_triangle(&[sv(0, 0, 0.0), sv(2, 2, 0.0), sv(4, 4, 0.0)], 0, Vec3::ONE));
        assert!(!r.push_triangle(&[sv(0, 3, 0.0), sv(5, 3, 0.0), sv(7, 3, 0.0)], 1, Vec3::ONE));
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn overlap_resolves_independent_of_order() {
        let near = [sv(0, 0, 0.2), sv(12, 0, 0.2), sv(0, 12, 0.2)];
        let far = [sv(0, 0, 0.6), sv(12, 0, 0.6), sv(12, 12, 0.6)];
        let same = [sv(0, 0, 0.2), sv(12, 0, 0.2), sv(12, 12, 0.2)];

        let (ab, _, _) = raster(12, 12, &[(near, 1), (far, 2), (same, 0)]);
        let (ba, _, _) = raster(12, 12, &[(same, 0), (far, 2), (near, 1)]);
        for y in 0..12 {
            for x in 0..12 {
                assert_eq!(ab.get(x, y), ba.get(x, y));
                assert_eq!(ab.owner(x, y), ba.owner(x, y));
            }
        }
        // equal depth, lower id wins
        assert_eq!(ab.owner(5, 1), 0);
    }

    #[test]
    fn hierarchical_target_keeps_tree_in_sync() {
        let (w, h) = (8, 8);
        let mut r = ScanlineRasterizer::new(w, h);
        let mut zb = DepthBuffer::new(w, h);
        let mut tree = OcclusionHierarchy::new(w, h).unwrap();
        let mut fb = Framebuffer::new(w, h);

        r.push_triangle(&[sv(0, 0, 0.5), sv(8, 0, 0.5), sv(0, 8, 0.5)], 0, Vec3::ONE);
        r.push_triangle(&[sv(8, 0, 0.5), sv(8, 8, 0.5), sv(0, 8, 0.5)], 1, Vec3::ONE);
        let mut target = DepthTarget::Hierarchical {
            depth: &mut zb,
            tree: &mut tree,
        };
        let stats = r.flush(&mut target, &mut fb);
        assert_eq!(stats.pixels_written, 64);
        assert_eq!(tree.root().depth, 0.5);
    }

    #[test]
    fn flush_resets_tables() {
        let mut r = ScanlineRasterizer::new(8, 8);
        let mut zb = DepthBuffer::new(8, 8);
        let mut fb = Framebuffer::new(8, 8);
        r.push_triangle(&[sv(0, 0, 0.5), sv(8, 0, 0.5), sv(0, 8, 0.5)], 0, Vec3::ONE);
        r.flush(&mut DepthTarget::Flat(&mut zb), &mut fb);
        assert_eq!(r.pending(), 0);
        let again = r.flush(&mut DepthTarget::Flat(&mut zb), &mut fb);
        assert_eq!(again, RasterStats::default());
    }
}
