//! ----------------------------------------------------------------------------
//! **Spatial index** – world-space octree over triangle ids
//!
//! * Built once per mesh. Every triangle starts at the root; a node holding
//!   more than `threshold` triangles pushes each triangle whose three
//!   vertices share one octant down into that child. Straddling triangles
//!   stay where they are.
//! * Nodes are keyed by location code (root = 1, 3 bits per level).
//! * The frame pipeline walks it **front-to-back** so near geometry fills the
//!   occlusion hierarchy before far subtrees are tested against it.
//! ----------------------------------------------------------------------------

use bitflags::bitflags;
use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    engine::quadtree::{LocCode, ROOT_CODE},
    world::{Triangle, TriangleId},
};

/// Bits appended per tree level.
const LEVEL_BITS: u32 = 3;

/// Deepest level whose codes still fit in a `u32`.
pub const MAX_DEPTH_LIMIT: u32 = 10;

/// Relative padding applied to the root cube.
const ROOT_PADDING: f32 = 1e-4;

bitflags! {
    /// Which of a node's eight children exist. Bit `i` is octant
    /// `i = (x > cx) << 2 | (y > cy) << 1 | (z > cz)`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Octants: u8 {
        const X0Y0Z0 = 1 << 0;
        const X0Y0Z1 = 1 << 1;
        const X0Y1Z0 = 1 << 2;
        const X0Y1Z1 = 1 << 3;
        const X1Y0Z0 = 1 << 4;
        const X1Y0Z1 = 1 << 5;
        const X1Y1Z0 = 1 << 6;
        const X1Y1Z1 = 1 << 7;
    }
}

impl Octants {
    #[inline]
    pub fn slot(octant: u32) -> Self {
        Self::from_bits_truncate(1 << octant)
    }
}

/// Axis-aligned cube.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cube {
    pub center: Vec3,
    pub half: f32,
}

impl Cube {
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            let s = Vec3::new(
                if i & 4 != 0 { 1.0 } else { -1.0 },
                if i & 2 != 0 { 1.0 } else { -1.0 },
                if i & 1 != 0 { 1.0 } else { -1.0 },
            );
            self.center + s * self.half
        })
    }

    /// Sub-cube for `octant`.
    pub fn child(&self, octant: u32) -> Cube {
        let q = self.half * 0.5;
        let offset = Vec3::new(
            if octant & 4 != 0 { q } else { -q },
            if octant & 2 != 0 { q } else { -q },
            if octant & 1 != 0 { q } else { -q },
        );
        Cube {
            center: self.center + offset,
            half: q,
        }
    }

    /// Closed containment test with tolerance `eps`.
    #[inline]
    pub fn contains(&self, p: Vec3, eps: f32) -> bool {
        ((p - self.center).abs() - Vec3::splat(self.half + eps)).max_element() <= 0.0
    }
}

/// Subdivision policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OctreeParams {
    /// A node holding more triangles than this is split.
    pub threshold: usize,
    /// Hard cap on tree depth (clamped to [`MAX_DEPTH_LIMIT`]).
    pub max_depth: u32,
}

impl Default for OctreeParams {
    fn default() -> Self {
        Self {
            threshold: 10,
            max_depth: 8,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SpatialNode {
    pub code: LocCode,
    pub bounds: Cube,
    /// Triangles that live exactly here.
    pub triangles: Vec<TriangleId>,
    pub children: Octants,
    /// Set when construction subdivided this node.
    pub split: bool,
}

impl SpatialNode {
    fn new(code: LocCode, bounds: Cube, triangles: Vec<TriangleId>) -> Self {
        Self {
            code,
            bounds,
            triangles,
            children: Octants::empty(),
            split: false,
        }
    }

    #[inline]
    pub fn child_code(&self, octant: u32) -> LocCode {
        (self.code << LEVEL_BITS) | octant
    }

    pub fn child_codes(&self) -> impl Iterator<Item = LocCode> + '_ {
        (0..8)
            .filter(|&o| self.children.contains(Octants::slot(o)))
            .map(|o| self.child_code(o))
    }
}

/// Verdict of a traversal visitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Walk {
    /// Continue into the node's children.
    Descend,
    /// Prune everything below this node.
    Skip,
}

pub struct SpatialIndex {
    nodes: FxHashMap<LocCode, SpatialNode>,
    triangle_count: usize,
    depth: u32,
}

impl SpatialIndex {
    pub fn build(triangles: &[Triangle], params: OctreeParams) -> Self {
        let max_depth = params.max_depth.min(MAX_DEPTH_LIMIT);
        let mut nodes = FxHashMap::default();

        let root = SpatialNode::new(
            ROOT_CODE,
            bounding_cube(triangles),
            (0..triangles.len() as TriangleId).collect(),
        );
        nodes.insert(ROOT_CODE, root);

        let mut depth = 0;
        let mut work = vec![ROOT_CODE];
        while let Some(code) = work.pop() {
            let level = Self::level(code);
            depth = depth.max(level);

            let Some(node) = nodes.get_mut(&code) else {
                continue;
            };
            if node.triangles.len() <= params.threshold || level >= max_depth {
                continue;
            }
            let bounds = node.bounds;
            let resident = std::mem::take(&mut node.triangles);

            let mut keep = Vec::new();
            let mut moved: [Vec<TriangleId>; 8] = Default::default();
            for id in resident {
                let [a, b, c] = triangles[id as usize].positions();
                let o = Self::octant_of(a, bounds.center);
                if o == Self::octant_of(b, bounds.center) && o == Self::octant_of(c, bounds.center)
                {
                    moved[o as usize].push(id);
                } else {
                    keep.push(id);
                }
            }

            let mut mask = Octants::empty();
            for (octant, ids) in moved.into_iter().enumerate() {
                if ids.is_empty() {
                    continue;
                }
                let octant = octant as u32;
                let child_code = (code << LEVEL_BITS) | octant;
                nodes.insert(
                    child_code,
                    SpatialNode::new(child_code, bounds.child(octant), ids),
                );
                mask |= Octants::slot(octant);
                work.push(child_code);
            }

            if let Some(node) = nodes.get_mut(&code) {
                node.triangles = keep;
                node.children = mask;
                node.split = true;
            }
        }

        log::debug!(
            "spatial index: {} triangles, {} nodes, depth {}",
            triangles.len(),
            nodes.len(),
            depth
        );

        Self {
            nodes,
            triangle_count: triangles.len(),
            depth,
        }
    }

    /// `(x > cx) << 2 | (y > cy) << 1 | (z > cz)`
    #[inline]
    pub fn octant_of(p: Vec3, center: Vec3) -> u32 {
        (((p.x > center.x) as u32) << 2) | (((p.y > center.y) as u32) << 1) | (p.z > center.z) as u32
    }

    #[inline]
    pub fn level(code: LocCode) -> u32 {
        (31 - code.leading_zeros()) / LEVEL_BITS
    }

    #[inline]
    pub fn parent_code(code: LocCode) -> LocCode {
        code >> LEVEL_BITS
    }

    #[inline]
    pub fn root(&self) -> &SpatialNode {
        &self.nodes[&ROOT_CODE]
    }

    #[inline]
    pub fn node(&self, code: LocCode) -> Option<&SpatialNode> {
        self.nodes.get(&code)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SpatialNode> {
        self.nodes.values()
    }

    pub fn children(&self, code: LocCode) -> impl Iterator<Item = &SpatialNode> + '_ {
        self.nodes
            .get(&code)
            .into_iter()
            .flat_map(|n| n.child_codes())
            .filter_map(|c| self.nodes.get(&c))
    }

    /// Number of triangles the index was built from.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Deepest level reached during construction.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of triangles in the subtree rooted at `code`.
    pub fn subtree_triangles(&self, code: LocCode) -> usize {
        let mut total = 0;
        let mut work = vec![code];
        while let Some(c) = work.pop() {
            if let Some(node) = self.nodes.get(&c) {
                total += node.triangles.len();
                work.extend(node.child_codes());
            }
        }
        total
    }

    /// Depth-first walk, nearest child first.
    ///
    /// Siblings are ordered by the view-space distance of their cube centres
    /// along the viewing direction. `visit` decides whether a node's
    /// children are entered.
    pub fn walk_front_to_back(&self, view: Mat4, mut visit: impl FnMut(&SpatialNode) -> Walk) {
        let mut stack = vec![ROOT_CODE];
        while let Some(code) = stack.pop() {
            let Some(node) = self.nodes.get(&code) else {
                continue;
            };
            if visit(node) == Walk::Skip || node.children.is_empty() {
                continue;
            }

            // right-handed view space looks down -Z, so distance is -z
            let mut order: SmallVec<[(f32, LocCode); 8]> = node
                .child_codes()
                .filter_map(|c| self.nodes.get(&c))
                .map(|c| (-view.transform_point3(c.bounds.center).z, c.code))
                .collect();
            // farthest pushed first, nearest popped first
            order.sort_by(|a, b| b.0.total_cmp(&a.0));
            stack.extend(order.into_iter().map(|(_, c)| c));
        }
    }
}

/// Smallest axis-aligned cube around every vertex, slightly padded.
fn bounding_cube(triangles: &[Triangle]) -> Cube {
    if triangles.is_empty() {
        return Cube {
            center: Vec3::ZERO,
            half: 0.0,
        };
    }
    let (lo, hi) = triangles
        .iter()
        .flat_map(|t| t.positions())
        .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), p| {
            (lo.min(p), hi.max(p))
        });
    let center = (lo + hi) * 0.5;
    let half = ((hi - lo) * 0.5).max_element();
    Cube {
        center,
        half: half * (1.0 + ROOT_PADDING) + ROOT_PADDING,
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
