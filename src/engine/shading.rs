use glam::Vec3;

use crate::world::Triangle;

/// Ambient share of the light colour.
const AMBIENT: f32 = 0.1;

/// Flat Lambertian lighting, one colour per triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shading {
    pub object_color: Vec3,
    pub light_color: Vec3,
    /// Direction *towards* the light; normalised on use.
    pub light_dir: Vec3,
}

impl Default for Shading {
    fn default() -> Self {
        Self {
            object_color: Vec3::new(1.0, 0.5, 0.31),
            light_color: Vec3::ONE,
            light_dir: Vec3::new(0.3, 0.5, 1.0),
        }
    }
}

impl Shading {
    /// `(ambient + diffuse) · object`
    pub fn flat_color(&self, tri: &Triangle) -> Vec3 {
        let n = tri.shading_normal();
        let l = self.light_dir.normalize_or_zero();
        let ambient = AMBIENT * self.light_color;
        let diffuse = n.dot(l).max(0.0) * self.light_color;
        (ambient + diffuse) * self.object_color
    }
}
