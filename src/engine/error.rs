use crate::renderer::SinkError;

/// Errors surfaced by the frame pipeline.
///
/// Degenerate geometry is never an error: it is skipped and counted in
/// [`FrameStats`](crate::engine::FrameStats).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Width or height is zero.
    #[error("invalid resolution {width}x{height}")]
    InvalidResolution { width: usize, height: usize },

    /// Location codes of the occlusion quadtree would overflow `u32`.
    #[error("resolution {width}x{height} exceeds the {max}x{max} occlusion hierarchy limit")]
    ResolutionTooLarge {
        width: usize,
        height: usize,
        max: usize,
    },

    /// The pixel sink failed to present the finished frame.
    #[error(transparent)]
    Sink(#[from] SinkError),
}
