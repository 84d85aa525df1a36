//! CPU renderer built around a hierarchical z-buffer.
//!
//! * [`engine`] – clipper, occlusion quadtree, spatial octree, scanline
//!   rasterizer and the per-frame pipeline tying them together.
//! * [`renderer`] – where finished pixels go.
//! * [`world`] – camera, triangle meshes and procedural scenes.

pub mod engine;
pub mod renderer;
pub mod world;
