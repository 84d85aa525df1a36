use crate::world::TriangleId;

/// Cleared depth: "infinitely far".
pub const FAR_DEPTH: f32 = f32::INFINITY;

/// Owner of a pixel nothing has been drawn into.
pub const NO_OWNER: TriangleId = TriangleId::MAX;

/// Flat per-pixel depth buffer.
///
/// Depth is NDC z (`-1` near plane … `1` far plane); smaller is nearer.
/// Each pixel also remembers which triangle wrote it so that equal depths
/// resolve to the lower triangle id, independent of submission order.
pub struct DepthBuffer {
    depth: Vec<f32>,
    owner: Vec<TriangleId>,
    width: usize,
    height: usize,
}

impl DepthBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            depth: vec![FAR_DEPTH; width * height],
            owner: vec![NO_OWNER; width * height],
            width,
            height,
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

    /// Reset every pixel to [`FAR_DEPTH`].
    pub fn clear(&mut self) {
        self.depth.fill(FAR_DEPTH);
        self.owner.fill(NO_OWNER);
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.depth[y * self.width + x]
    }

    #[inline]
    pub fn owner(&self, x: usize, y: usize) -> TriangleId {
        self.owner[y * self.width + x]
    }

    /// Raw row-major depth values.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.depth
    }

    /// Store `z` if it is nearer than the current value (ties go to the lower
    /// `owner`). Returns whether the pixel was written.
    #[inline]
    pub fn test_and_set(&mut self, x: usize, y: usize, z: f32, owner: TriangleId) -> bool {
        let i = y * self.width + x;
        let stored = self.depth[i];
        if z < stored || (z == stored && owner < self.owner[i]) {
            self.depth[i] = z;
            self.owner[i] = owner;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearer_wins_farther_loses() {
        let mut zb = DepthBuffer::new(2, 2);
        assert!(zb.test_and_set(1, 1, 0.5, 3));
        assert!(!zb.test_and_set(1, 1, 0.7, 1));
        assert!(zb.test_and_set(1, 1, 0.2, 9));
        assert_eq!(zb.get(1, 1), 0.2);
        assert_eq!(zb.owner(1, 1), 9);
        assert_eq!(zb.get(0, 0), FAR_DEPTH);
    }

    #[test]
    fn ties_resolve_to_lower_owner() {
        let mut zb = DepthBuffer::new(1, 1);
        assert!(zb.test_and_set(0, 0, 0.5, 4));
        assert!(!zb.test_and_set(0, 0, 0.5, 4));
        assert!(!zb.test_and_set(0, 0, 0.5, 7));
        assert!(zb.test_and_set(0, 0, 0.5, 2));
        assert_eq!(zb.owner(0, 0), 2);
    }

    #[test]
    fn clear_resets_depth_and_owner() {
        let mut zb = DepthBuffer::new(3, 1);
        zb.test_and_set(2, 0, -0.3, 0);
        zb.clear();
        assert_eq!(zb.get(2, 0), FAR_DEPTH);
        assert_eq!(zb.owner(2, 0), NO_OWNER);
    }
}
