//! Procedural test geometry.
//!
//! Asset loading lives outside this crate; these builders give the viewer,
//! the tests and the benches something to draw.

use glam::{Vec2, Vec3};

use super::geometry::{Mesh, Triangle, Vertex};

/// Axis-aligned rectangle facing +Z, centred at `center`.
pub fn quad_z(center: Vec3, half_w: f32, half_h: f32) -> Mesh {
    let a = center + Vec3::new(-half_w, -half_h, 0.0);
    let b = center + Vec3::new(half_w, -half_h, 0.0);
    let c = center + Vec3::new(half_w, half_h, 0.0);
    let d = center + Vec3::new(-half_w, half_h, 0.0);
    Mesh::new(vec![
        Triangle::from_positions(a, b, c),
        Triangle::from_positions(a, c, d),
    ])
}

/// Axis-aligned cube with outward-facing, per-face normals.
pub fn cube(center: Vec3, half: f32) -> Mesh {
    // (normal, u axis, v axis) with u × v = normal
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut tris = Vec::with_capacity(12);
    for (n, u, v) in FACES {
        let o = center + n * half;
        let corner = |su: f32, sv: f32, uv: Vec2| {
            Vertex::new(o + u * (su * half) + v * (sv * half), n, uv)
        };
        let p00 = corner(-1.0, -1.0, Vec2::new(0.0, 0.0));
        let p10 = corner(1.0, -1.0, Vec2::new(1.0, 0.0));
        let p11 = corner(1.0, 1.0, Vec2::new(1.0, 1.0));
        let p01 = corner(-1.0, 1.0, Vec2::new(0.0, 1.0));
        tris.push(Triangle::new(p00, p10, p11));
        tris.push(Triangle::new(p00, p11, p01));
    }
    Mesh::new(tris)
}

/// Latitude/longitude sphere. `stacks ≥ 2`, `slices ≥ 3`.
pub fn uv_sphere(center: Vec3, radius: f32, stacks: u32, slices: u32) -> Mesh {
    let stacks = stacks.max(2);
    let slices = slices.max(3);

    let point = |i: u32, j: u32| {
        let theta = std::f32::consts::PI * i as f32 / stacks as f32;
        let phi = std::f32::consts::TAU * j as f32 / slices as f32;
        let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
        let uv = Vec2::new(j as f32 / slices as f32, i as f32 / stacks as f32);
        Vertex::new(center + n * radius, n, uv)
    };

    let mut tris = Vec::with_capacity((stacks * slices * 2) as usize);
    for i in 0..stacks {
        for j in 0..slices {
            let a = point(i, j);
            let b = point(i + 1, j);
            let c = point(i + 1, j + 1);
            let d = point(i, j + 1);
            // pole rows collapse one of the two triangles
            if i + 1 != stacks {
                tris.push(Triangle::new(a, c, b));
            }
            if i != 0 {
                tris.push(Triangle::new(a, d, c));
            }
        }
    }
    Mesh::new(tris)
}

/// `n × n × n` cubes spaced `spacing` apart, centred on the origin.
pub fn cube_grid(n: u32, spacing: f32, half: f32) -> Mesh {
    let mut mesh = Mesh::default();
    let offset = (n.saturating_sub(1)) as f32 * spacing * 0.5;
    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                let c = Vec3::new(x as f32, y as f32, z as f32) * spacing - Vec3::splat(offset);
                mesh.extend(&cube(c, half));
            }
        }
    }
    mesh
}

/// A large wall close to the origin hiding a dense sphere cluster behind it.
///
/// Viewed from `(0, 0, 10)` looking down -Z the wall fills the screen.
pub fn occluder_scene() -> Mesh {
    let mut mesh = quad_z(Vec3::new(0.0, 0.0, 6.0), 40.0, 40.0);
    for i in 0..4 {
        for j in 0..4 {
            let c = Vec3::new(4.0 + i as f32 * 3.0, 4.0 + j as f32 * 3.0, -30.0);
            mesh.extend(&uv_sphere(c, 1.0, 8, 12));
        }
    }
    mesh
}
