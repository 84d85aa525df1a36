//! ----------------------------------------------------------------------------
//! **Occlusion hierarchy** – screen-space quadtree over the depth buffer
//!
//! * Built once per resolution, recursively halving the screen down to 1×1
//!   leaves. Shape never changes afterwards; only cached depths do.
//! * Every node caches the **farthest** depth of the pixels it covers, so a
//!   primitive whose nearest depth lies behind that value is hidden
//!   everywhere inside the node.
//! * Nodes live in a flat map keyed by *location code* (root = 1, each level
//!   appends two bits), parents and children are found arithmetically.
//! ----------------------------------------------------------------------------

use bitflags::bitflags;
use glam::IVec2;
use rustc_hash::FxHashMap;

use crate::engine::{depth::FAR_DEPTH, error::EngineError};

/// Root-to-node path, 2 bits per level below a leading 1.
pub type LocCode = u32;

pub const ROOT_CODE: LocCode = 1;

/// Bits appended per tree level.
const LEVEL_BITS: u32 = 2;

/// Widest screen whose leaf codes still fit in a `u32`.
pub const MAX_SIDE: usize = 1 << 15;

bitflags! {
    /// Which of a node's four children exist.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Quadrants: u8 {
        const TOP_LEFT     = 1 << 0;
        const TOP_RIGHT    = 1 << 1;
        const BOTTOM_LEFT  = 1 << 2;
        const BOTTOM_RIGHT = 1 << 3;
    }
}

impl Quadrants {
    /// Flag for child slot `slot` (`bit0 = right half`, `bit1 = bottom half`).
    #[inline]
    pub fn slot(slot: u32) -> Self {
        Self::from_bits_truncate(1 << slot)
    }
}

/// Half-open integer rectangle `[left, right) × [top, bottom)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenRect {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl ScreenRect {
    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    #[inline]
    pub fn contains(&self, p: IVec2) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    /// Split point used to classify points into quadrants.
    #[inline]
    fn center(&self) -> IVec2 {
        IVec2::new(
            (self.left + self.right + 1) / 2,
            (self.top + self.bottom + 1) / 2,
        )
    }

    /// Sub-rectangle for child `slot`; may be empty.
    fn quadrant(&self, slot: u32, c: IVec2) -> ScreenRect {
        let (left, right) = if slot & 1 == 0 {
            (self.left, c.x)
        } else {
            (c.x, self.right)
        };
        let (top, bottom) = if slot & 2 == 0 {
            (self.top, c.y)
        } else {
            (c.y, self.bottom)
        };
        ScreenRect {
            left,
            right,
            top,
            bottom,
        }
    }
}

/// One cell of the hierarchy.
#[derive(Clone, Debug)]
pub struct OcclusionNode {
    pub code: LocCode,
    pub rect: ScreenRect,
    pub center: IVec2,
    /// Farthest depth of any pixel inside `rect`.
    pub depth: f32,
    pub children: Quadrants,
}

impl OcclusionNode {
    fn new(code: LocCode, rect: ScreenRect) -> Self {
        Self {
            code,
            rect,
            center: rect.center(),
            depth: FAR_DEPTH,
            children: Quadrants::empty(),
        }
    }

    /// Child slot `p` falls into.
    #[inline]
    pub fn quadrant_of(&self, p: IVec2) -> u32 {
        (((p.y >= self.center.y) as u32) << 1) | (p.x >= self.center.x) as u32
    }

    #[inline]
    pub fn child_code(&self, slot: u32) -> LocCode {
        (self.code << LEVEL_BITS) | slot
    }

    /// Codes of the children that exist.
    pub fn child_codes(&self) -> impl Iterator<Item = LocCode> + '_ {
        (0..4)
            .filter(|&s| self.children.contains(Quadrants::slot(s)))
            .map(|s| self.child_code(s))
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Screen quadtree plus the pixel → leaf index.
pub struct OcclusionHierarchy {
    width: usize,
    height: usize,
    nodes: FxHashMap<LocCode, OcclusionNode>,
    /// `index_of[y * width + x]` = code of the 1×1 leaf covering that pixel.
    index_of: Vec<LocCode>,
}

impl OcclusionHierarchy {
    /// Build the full tree for a `width × height` screen.
    pub fn new(width: usize, height: usize) -> Result<Self, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidResolution { width, height });
        }
        if width > MAX_SIDE || height > MAX_SIDE {
            return Err(EngineError::ResolutionTooLarge {
                width,
                height,
                max: MAX_SIDE,
            });
        }

        let mut nodes = FxHashMap::default();
        nodes.reserve(width * height * 4 / 3 + 1);
        let mut index_of = vec![ROOT_CODE; width * height];

        let root = OcclusionNode::new(
            ROOT_CODE,
            ScreenRect {
                left: 0,
                right: width as i32,
                top: 0,
                bottom: height as i32,
            },
        );
        nodes.insert(ROOT_CODE, root);

        let mut work = vec![ROOT_CODE];
        while let Some(code) = work.pop() {
            let Some(node) = nodes.get(&code) else {
                continue;
            };
            let (rect, center) = (node.rect, node.center);

            if rect.width() <= 1 && rect.height() <= 1 {
                index_of[rect.top as usize * width + rect.left as usize] = code;
                continue;
            }

            let mut mask = Quadrants::empty();
            for slot in 0..4 {
                let sub = rect.quadrant(slot, center);
                if sub.width() <= 0 || sub.height() <= 0 {
                    continue;
                }
                let child_code = (code << LEVEL_BITS) | slot;
                nodes.insert(child_code, OcclusionNode::new(child_code, sub));
                mask |= Quadrants::slot(slot);
                work.push(child_code);
            }
            if let Some(node) = nodes.get_mut(&code) {
                node.children = mask;
            }
        }

        log::debug!(
            "occlusion hierarchy {}x{}: {} nodes",
            width,
            height,
            nodes.len()
        );

        Ok(Self {
            width,
            height,
            nodes,
            index_of,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of nodes, leaves included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn root(&self) -> &OcclusionNode {
        &self.nodes[&ROOT_CODE]
    }

    #[inline]
    pub fn node(&self, code: LocCode) -> Option<&OcclusionNode> {
        self.nodes.get(&code)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &OcclusionNode> {
        self.nodes.values()
    }

    /// Code of the 1×1 leaf covering pixel `(x, y)`.
    #[inline]
    pub fn leaf_code(&self, x: usize, y: usize) -> LocCode {
        self.index_of[y * self.width + x]
    }

    #[inline]
    pub fn parent_code(code: LocCode) -> LocCode {
        code >> LEVEL_BITS
    }

    /// Tree level of `code`; the root is level 0.
    #[inline]
    pub fn level(code: LocCode) -> u32 {
        (31 - code.leading_zeros()) / LEVEL_BITS
    }

    /// Forget every cached depth.
    pub fn reset(&mut self) {
        for node in self.nodes.values_mut() {
            node.depth = FAR_DEPTH;
        }
    }

    /// Tightest node whose quadrant classification agrees for every point.
    ///
    /// Points are expected inside the closed screen rectangle
    /// `[0, width] × [0, height]`.
    pub fn search(&self, points: &[IVec2]) -> &OcclusionNode {
        let mut node = self.root();
        while let Some(child) = self.descend(node, points) {
            node = child;
        }
        node
    }

    /// Conservative visibility query: `true` if some node enclosing `points`
    /// is entirely nearer than `nearest_z`.
    pub fn is_occluded(&self, points: &[IVec2], nearest_z: f32) -> bool {
        let mut node = self.root();
        loop {
            if nearest_z > node.depth {
                return true;
            }
            match self.descend(node, points) {
                Some(child) => node = child,
                None => return false,
            }
        }
    }

    fn descend(&self, node: &OcclusionNode, points: &[IVec2]) -> Option<&OcclusionNode> {
        let (&first, rest) = points.split_first()?;
        let slot = node.quadrant_of(first);
        if !node.children.contains(Quadrants::slot(slot))
            || rest.iter().any(|&p| node.quadrant_of(p) != slot)
        {
            return None;
        }
        self.nodes.get(&node.child_code(slot))
    }

    /// Record a new depth at pixel `(x, y)` and propagate it upwards until a
    /// parent's farthest depth stops changing.
    pub fn update(&mut self, x: usize, y: usize, depth: f32) {
        let mut code = self.index_of[y * self.width + x];
        if let Some(leaf) = self.nodes.get_mut(&code) {
            leaf.depth = depth;
        }

        while code > ROOT_CODE {
            let parent = Self::parent_code(code);
            let farthest = self.recomputed_depth(parent);
            let Some(node) = self.nodes.get_mut(&parent) else {
                break;
            };
            if node.depth == farthest {
                break;
            }
            node.depth = farthest;
            code = parent;
        }
    }

    /// Farthest depth over `code`'s existing children; a leaf's own depth.
    pub fn recomputed_depth(&self, code: LocCode) -> f32 {
        let Some(node) = self.nodes.get(&code) else {
            return FAR_DEPTH;
        };
        if node.is_leaf() {
            return node.depth;
        }
        node.child_codes()
            .filter_map(|c| self.nodes.get(&c))
            .fold(f32::NEG_INFINITY, |acc, c| acc.max(c.depth))
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_resolutions() {
        assert!(matches!(
            OcclusionHierarchy::new(0, 4),
            Err(EngineError::InvalidResolution { .. })
        ));
        assert!(matches!(
            OcclusionHierarchy::new(MAX_SIDE + 1, 1),
            Err(EngineError::ResolutionTooLarge { .. })
        ));
    }

    #[test]
    fn location_codes_chain_to_root() {
        let tree = OcclusionHierarchy::new(13, 7).unwrap();
        assert_eq!(tree.root().code, ROOT_CODE);
        for node in tree.nodes() {
            if node.code == ROOT_CODE {
                continue;
            }
            let parent = tree
                .node(OcclusionHierarchy::parent_code(node.code))
                .expect("parent must exist");
            assert_eq!(node.code >> 2, parent.code);
            let slot = node.code & 3;
            assert!(parent.children.contains(Quadrants::slot(slot)));
            assert_eq!(OcclusionHierarchy::level(node.code), OcclusionHierarchy::level(parent.code) + 1);
        }
    }

    #[test]
    fn children_partition_their_parent() {
        let tree = OcclusionHierarchy::new(10, 6).unwrap();
        for node in tree.nodes().filter(|n| !n.is_leaf()) {
            let area: i32 = node
                .child_codes()
                .map(|c| {
                    let r = tree.node(c).unwrap().rect;
                    r.width() * r.height()
                })
                .sum();
            assert_eq!(area, node.rect.width() * node.rect.height());
        }
    }

    #[test]
    fn every_pixel_has_a_unit_leaf() {
        let (w, h) = (9, 5);
        let tree = OcclusionHierarchy::new(w, h).unwrap();
        let leaves = tree.nodes().filter(|n| n.is_leaf()).count();
        assert_eq!(leaves, w * h);
        for y in 0..h {
            for x in 0..w {
                let leaf = tree.node(tree.leaf_code(x, y)).unwrap();
                assert!(leaf.is_leaf());
                assert_eq!((leaf.rect.width(), leaf.rect.height()), (1, 1));
                assert!(leaf.rect.contains(IVec2::new(x as i32, y as i32)));
            }
        }
    }

    #[test]
    fn search_finds_tightest_enclosing_cell() {
        let tree = OcclusionHierarchy::new(16, 16).unwrap();
        let pts = [IVec2::new(0, 0), IVec2::new(1, 0), IVec2::new(0, 1)];
        let node = tree.search(&pts);
        assert!(pts.iter().all(|&p| node.rect.contains(p)));
        assert_eq!((node.rect.width(), node.rect.height()), (2, 2));

        // straddling the screen centre stays at the root
        let wide = [IVec2::new(2, 2), IVec2::new(12, 3), IVec2::new(4, 12)];
        assert_eq!(tree.search(&wide).code, ROOT_CODE);
    }

    #[test]
    fn incremental_update_matches_full_recompute() {
        let (w, h) = (11, 9);
        let mut tree = OcclusionHierarchy::new(w, h).unwrap();
        let mut seed = 12345u32;
        for _ in 0..400 {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            let x = (seed >> 8) as usize % w;
            let y = (seed >> 16) as usize % h;
            let z = ((seed >> 4) % 1000) as f32 / 1000.0;
            // the rasterizer only ever moves a pixel nearer
            let leaf = tree.node(tree.leaf_code(x, y)).unwrap().depth;
            if z < leaf {
                tree.update(x, y, z);
            }
        }
        for node in tree.nodes().filter(|n| !n.is_leaf()) {
            assert_eq!(node.depth, tree.recomputed_depth(node.code), "node {}", node.code);
        }
    }

    #[test]
    fn fully_covered_cell_occludes_farther_primitives() {
        let mut tree = OcclusionHierarchy::new(8, 8).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                tree.update(x, y, 0.25);
            }
        }
        let pts = [IVec2::new(0, 0), IVec2::new(3, 0), IVec2::new(0, 3)];
        assert!(tree.is_occluded(&pts, 0.5));
        assert!(!tree.is_occluded(&pts, 0.1));
        // equal depth is not hidden: a lower triangle id may still win
        assert!(!tree.is_occluded(&pts, 0.25));
        // partly uncovered region stays visible
        let wide = [IVec2::new(0, 0), IVec2::new(7, 0), IVec2::new(0, 7)];
        assert!(!tree.is_occluded(&wide, 0.5));

        tree.reset();
        assert!(!tree.is_occluded(&pts, 0.5));
        assert_eq!(tree.root().depth, FAR_DEPTH);
    }
}
