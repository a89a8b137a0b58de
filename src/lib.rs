#![warn(missing_docs, clippy::unwrap_used)]
#![doc = include_str!("../README.md")]

/// Custom error type.
pub mod error;

/// Frame throttling and statistics.
pub mod frame;

/// Font lookup table.
pub mod font_cache;

/// Software frame buffer.
pub mod surface;

/// Web utility functions.
pub mod utils;

/// Backend.
pub mod backend;

/// Animation frame loop.
mod render;

// Re-export the rasterizer.
pub use tiny_skia;

// Re-export the font rasterizer.
pub use fontdue;

// Re-export web_sys crate.
pub use web_sys;

pub use backend::{
    canvas2d::{Canvas2d, Canvas2dOptions},
    webgl::{CanvasWebGl, WebGlOptions},
    FrameRenderer,
};
pub use error::Error;
pub use font_cache::FontCache;
pub use frame::{FrameStats, FrameThrottle, FrameTiming};
pub use surface::Surface;
