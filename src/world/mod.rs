mod camera;
mod geometry;
pub mod scene;

pub use camera::Camera;

pub use geometry::{Mesh, Triangle, TriangleId, Vertex};
