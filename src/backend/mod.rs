//! ## Backends
//!
//! **webcanvas** provides two ways of driving a `<canvas>` element, one per
//! rendering context:
//!
//! - [`Canvas2d`]: software rendering. Draw calls go to an in-memory RGBA
//!   [`Surface`](crate::Surface) rasterized by [tiny-skia][tiny-skia]; the
//!   buffer is copied into the canvas with `putImageData` after every frame
//!   that reports a change.
//!
//! - [`CanvasWebGl`]: hands the `WebGlRenderingContext` to the render callback.
//!   Nothing is copied; the browser presents whatever the callback drew.
//!
//! [tiny-skia]: https://github.com/linebender/tiny-skia
//!
//! ## Backend Comparison
//!
//! | Feature                     | Canvas2d        | CanvasWebGl      |
//! |-----------------------------|-----------------|------------------|
//! | **Draws with**              | tiny-skia       | raw WebGL calls  |
//! | **Text**                    | ✓ (font cache)  | ✗                |
//! | **Per-frame copy**          | Full buffer     | None             |
//! | **Memory Usage**            | 4 bytes / pixel | GPU buffers only |
//! | **Browser Support**         | All             | All with WebGL   |
//!
//! Both run their render callback from `requestAnimationFrame`, throttled by
//! a maximum frame rate (see [`FrameThrottle`]).
//!
//! [`Canvas2d`]: canvas2d::Canvas2d
//! [`CanvasWebGl`]: webgl::CanvasWebGl

use std::cell::{Cell, RefCell};

use web_sys::HtmlCanvasElement;

use crate::{
    error::Error,
    frame::{FrameStats, FrameThrottle, FrameTiming},
};

/// 2D canvas backend.
pub mod canvas2d;

/// WebGL canvas backend.
pub mod webgl;

/// Backend utilities.
pub(crate) mod utils;

/// Performance mark around the user render callback.
pub(crate) const RENDER_CALLBACK_MARK: &str = "render-callback";

/// Performance mark around the frame buffer copy.
pub(crate) const COPY_FRAME_MARK: &str = "copy-frame";

/// A canvas driven by a per-frame render callback.
///
/// The callback is invoked from [`requestAnimationFrame`], at most `max_fps`
/// times per second, and returns whether it changed anything.
///
/// [`requestAnimationFrame`]: https://developer.mozilla.org/en-US/docs/Web/API/Window/requestAnimationFrame
pub trait FrameRenderer {
    /// What the render callback draws on.
    type Target;

    /// The rendering context of the canvas.
    type Context;

    /// Returns the canvas element.
    fn canvas(&self) -> &HtmlCanvasElement;

    /// Returns the rendering context.
    fn context(&self) -> &Self::Context;

    /// Returns the width of the canvas, in pixels.
    fn width(&self) -> u32;

    /// Returns the height of the canvas, in pixels.
    fn height(&self) -> u32;

    /// Starts the frame loop.
    ///
    /// A `max_fps` of `0` removes the cap. Starting a running loop stops the
    /// previous one first.
    fn start<F>(&mut self, max_fps: f64, render_callback: F) -> Result<(), Error>
    where
        F: FnMut(&mut Self::Target, &FrameTiming) -> bool + 'static;

    /// Stops the frame loop. No callback runs after this returns.
    fn stop(&mut self);

    /// Returns `true` while the frame loop is running.
    fn is_running(&self) -> bool;

    /// Changes the frame rate cap of the running loop.
    fn set_max_fps(&mut self, max_fps: f64);

    /// Returns the most recent frame rate.
    fn fps(&self) -> f64;

    /// Returns the frame counters since the loop was started.
    fn stats(&self) -> FrameStats;
}

/// State shared between a backend and the closure of its frame loop.
#[derive(Debug, Default)]
pub(crate) struct LoopState {
    /// Frame rate limiter.
    throttle: RefCell<FrameThrottle>,
    /// Frame counters.
    stats: Cell<FrameStats>,
    /// Frame rate of the last accepted frame.
    fps: Cell<f64>,
}

impl LoopState {
    /// Clears counters and installs a new cap, ready for a fresh loop.
    pub(crate) fn reset(&self, max_fps: f64) {
        *self.throttle.borrow_mut() = FrameThrottle::new(max_fps);
        self.stats.set(FrameStats::default());
        self.fps.set(0.0);
    }

    /// Changes the cap, keeping the counters.
    pub(crate) fn set_max_fps(&self, max_fps: f64) {
        self.throttle.borrow_mut().set_max_fps(max_fps);
    }

    /// Returns the frame rate of the last accepted frame.
    pub(crate) fn fps(&self) -> f64 {
        self.fps.get()
    }

    /// Returns the frame counters.
    pub(crate) fn stats(&self) -> FrameStats {
        self.stats.get()
    }

    /// Handles one animation frame.
    ///
    /// Calls `render` only if the throttle accepts the frame, and returns what
    /// it returned. Returns `None` for skipped frames.
    pub(crate) fn on_frame<F>(&self, timestamp: f64, render: F) -> Option<bool>
    where
        F: FnOnce(&FrameTiming) -> bool,
    {
        let timing = self.throttle.borrow_mut().tick(timestamp);
        let mut stats = self.stats.get();
        let changed = timing.map(|timing| {
            if timing.fps > 0.0 {
                self.fps.set(timing.fps);
            }
            render(&timing)
        });
        stats.record(changed.is_some(), changed.unwrap_or(false));
        self.stats.set(stats);
        changed
    }
}
