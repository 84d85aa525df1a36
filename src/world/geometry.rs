use glam::{Vec2, Vec3};

/// Index of a triangle inside its [`Mesh`].
pub type TriangleId = u32;

/// One corner of a triangle as it comes out of the mesh source.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    #[inline]
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Three vertices, immutable after the mesh is built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub v: [Vertex; 3],
}

impl Triangle {
    pub fn new(a: Vertex, b: Vertex, c: Vertex) -> Self {
        Self { v: [a, b, c] }
    }

    /// Build a triangle from bare positions; every vertex gets the face normal.
    pub fn from_positions(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let n = (b - a).cross(c - a).normalize_or_zero();
        Self {
            v: [
                Vertex::new(a, n, Vec2::ZERO),
                Vertex::new(b, n, Vec2::X),
                Vertex::new(c, n, Vec2::Y),
            ],
        }
    }

    #[inline]
    pub fn positions(&self) -> [Vec3; 3] {
        [self.v[0].position, self.v[1].position, self.v[2].position]
    }

    /// Geometric (winding-derived) unit normal, zero for degenerate triangles.
    pub fn face_normal(&self) -> Vec3 {
        let [a, b, c] = self.positions();
        (b - a).cross(c - a).normalize_or_zero()
    }

    /// Normal used for flat shading: the first vertex normal, or the face
    /// normal when the mesh supplied none.
    pub fn shading_normal(&self) -> Vec3 {
        let n = self.v[0].normal.normalize_or_zero();
        if n == Vec3::ZERO {
            self.face_normal()
        } else {
            n
        }
    }
}

/// Flat triangle list. Read-only while a frame is being rendered.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// All faces in submission order.
    #[inline]
    pub fn faces(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn face(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.get(id as usize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Append every face of `other`, keeping ids of existing faces stable.
    pub fn extend(&mut self, other: &Mesh) {
        self.triangles.extend_from_slice(&other.triangles);
    }

    pub fn push(&mut self, tri: Triangle) -> TriangleId {
        self.triangles.push(tri);
        (self.triangles.len() - 1) as TriangleId
    }
}

impl FromIterator<Triangle> for Mesh {
    fn from_iter<I: IntoIterator<Item = Triangle>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
