//! Visibility and scan-conversion core.

pub mod clipper;
pub mod depth;
mod engine;
mod error;
pub mod octree;
pub mod quadtree;
pub mod scanline;
mod shading;
mod types;

pub use depth::{DepthBuffer, FAR_DEPTH};
pub use engine::Engine;
pub use error::EngineError;
pub use octree::{OctreeParams, SpatialIndex};
pub use quadtree::OcclusionHierarchy;
pub use scanline::ScanlineRasterizer;
pub use shading::Shading;
pub use types::{EngineConfig, FrameStats, RenderMode, Screen, ScreenVertex};
