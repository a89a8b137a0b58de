use std::rc::Rc;

use web_sys::{
    wasm_bindgen::JsCast, Document, HtmlCanvasElement, WebGlRenderingContext, Window,
};

use crate::{
    backend::{utils::*, FrameRenderer, LoopState, RENDER_CALLBACK_MARK},
    error::Error,
    frame::{FrameStats, FrameTiming},
    render::AnimationLoop,
    utils::window_size,
};

/// Options for the [`CanvasWebGl`].
#[derive(Debug, Clone)]
pub struct WebGlOptions {
    /// The id of the canvas' parent element.
    parent_id: Option<String>,
    /// Override the automatically detected size.
    size: Option<(u32, u32)>,
    /// Whether the drawing buffer has an alpha channel.
    alpha: bool,
    /// Whether the drawing buffer has a depth buffer.
    depth: bool,
    /// Whether to perform anti-aliasing.
    antialias: bool,
    /// Keep the drawing buffer between frames instead of clearing it.
    preserve_drawing_buffer: bool,
    /// Measure performance using the `performance` API.
    measure_performance: bool,
}

impl Default for WebGlOptions {
    fn default() -> Self {
        Self {
            parent_id: None,
            size: None,
            alpha: true,
            depth: true,
            antialias: true,
            preserve_drawing_buffer: false,
            measure_performance: false,
        }
    }
}

impl WebGlOptions {
    /// Constructs a new [`WebGlOptions`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the element id of the canvas' parent element.
    pub fn parent_id(mut self, id: &str) -> Self {
        self.parent_id = Some(id.into());
        self
    }

    /// Sets the size of the canvas, in pixels.
    pub fn size(mut self, size: (u32, u32)) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets whether the drawing buffer has an alpha channel. Defaults to `true`.
    pub fn alpha(mut self, alpha: bool) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets whether the drawing buffer has a depth buffer. Defaults to `true`.
    pub fn depth(mut self, depth: bool) -> Self {
        self.depth = depth;
        self
    }

    /// Sets whether to perform anti-aliasing. Defaults to `true`.
    pub fn antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    /// Keeps the drawing buffer between frames. Defaults to `false`.
    pub fn preserve_drawing_buffer(mut self, preserve: bool) -> Self {
        self.preserve_drawing_buffer = preserve;
        self
    }

    /// Enables frame-based measurements using the
    /// [Performance](https://developer.mozilla.org/en-US/docs/Web/API/Performance) API.
    ///
    /// The render callback is measured as `render-callback`.
    pub fn measure_performance(mut self, measure: bool) -> Self {
        self.measure_performance = measure;
        self
    }

    /// Returns the `getContext` attributes.
    fn context_attributes(&self) -> [(&'static str, bool); 4] {
        [
            ("alpha", self.alpha),
            ("depth", self.depth),
            ("antialias", self.antialias),
            ("preserveDrawingBuffer", self.preserve_drawing_buffer),
        ]
    }
}

/// Canvas with a WebGL rendering context.
///
/// The render callback draws with the context directly; the browser presents
/// the drawing buffer after each animation frame. The value returned by the
/// callback only feeds [`FrameStats::presented`].
///
/// WebGL is supported in all modern browsers.
#[derive(Debug)]
pub struct CanvasWebGl {
    /// Window.
    window: Window,
    /// Document.
    document: Document,
    /// Canvas element.
    canvas: HtmlCanvasElement,
    /// WebGL rendering context.
    context: WebGlRenderingContext,
    /// Performance marks.
    marks: PerformanceMarks,
    /// Throttle and counters, shared with the frame loop.
    state: Rc<LoopState>,
    /// The running frame loop.
    animation: Option<AnimationLoop>,
}

impl CanvasWebGl {
    /// Constructs a new [`CanvasWebGl`] filling the window, appended to `<body>`.
    pub fn new() -> Result<Self, Error> {
        let (width, height) = window_size()?;
        Self::new_with_size(width, height)
    }

    /// Constructs a new [`CanvasWebGl`] with the given size, appended to `<body>`.
    pub fn new_with_size(width: u32, height: u32) -> Result<Self, Error> {
        Self::new_with_options(WebGlOptions::new().size((width, height)))
    }

    /// Constructs a new [`CanvasWebGl`] with the given options.
    pub fn new_with_options(options: WebGlOptions) -> Result<Self, Error> {
        let window = get_window()?;
        let document = get_document(&window)?;

        // Parent element of canvas (uses <body> unless specified)
        let parent = get_element_by_id_or_body(&document, options.parent_id.as_ref())?;
        let (width, height) = resolve_size(options.size, &parent)?;
        let canvas = create_canvas_in_element(&document, &parent, width, height)?;

        Self::init(window, document, canvas, &options)
    }

    /// Constructs a new [`CanvasWebGl`] on an existing `<canvas>` element.
    pub fn from_canvas(canvas: HtmlCanvasElement, options: WebGlOptions) -> Result<Self, Error> {
        let window = get_window()?;
        let document = get_document(&window)?;
        if let Some((width, height)) = options.size {
            canvas.set_width(width);
            canvas.set_height(height);
        }
        Self::init(window, document, canvas, &options)
    }

    /// Sets up the WebGL context for `canvas`.
    fn init(
        window: Window,
        document: Document,
        canvas: HtmlCanvasElement,
        options: &WebGlOptions,
    ) -> Result<Self, Error> {
        let attributes = context_options(&options.context_attributes())?;
        let context = canvas
            .get_context_with_context_options("webgl", &attributes)?
            .ok_or(Error::UnableToRetrieveWebGlContext)?
            .dyn_into::<WebGlRenderingContext>()
            .map_err(|_| Error::UnableToRetrieveWebGlContext)?;
        let marks = PerformanceMarks::new(&window, options.measure_performance)?;
        log::debug!(
            "Created WebGL canvas of {}x{}",
            canvas.width(),
            canvas.height()
        );

        Ok(Self {
            window,
            document,
            canvas,
            context,
            marks,
            state: Rc::new(LoopState::default()),
            animation: None,
        })
    }

    /// Returns the window.
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Returns the document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Resizes the canvas element and the WebGL viewport.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.context
            .viewport(0, 0, viewport_extent(width), viewport_extent(height));
        log::debug!("Resized WebGL canvas to {width}x{height}");
    }
}

impl FrameRenderer for CanvasWebGl {
    type Target = WebGlRenderingContext;
    type Context = WebGlRenderingContext;

    fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn context(&self) -> &Self::Context {
        &self.context
    }

    fn width(&self) -> u32 {
        self.canvas.width()
    }

    fn height(&self) -> u32 {
        self.canvas.height()
    }

    fn start<F>(&mut self, max_fps: f64, mut render_callback: F) -> Result<(), Error>
    where
        F: FnMut(&mut Self::Target, &FrameTiming) -> bool + 'static,
    {
        self.stop();
        self.state.reset(max_fps);

        let state = self.state.clone();
        let marks = self.marks.clone();
        let mut context = self.context.clone();
        self.animation = Some(AnimationLoop::start(
            self.window.clone(),
            move |timestamp| {
                state.on_frame(timestamp, |timing| {
                    marks.begin(RENDER_CALLBACK_MARK);
                    let changed = render_callback(&mut context, timing);
                    marks.end(RENDER_CALLBACK_MARK);
                    changed
                });
            },
        )?);
        log::debug!("Started WebGL frame loop (max {max_fps} FPS)");
        Ok(())
    }

    fn stop(&mut self) {
        self.animation.take();
    }

    fn is_running(&self) -> bool {
        self.animation.as_ref().is_some_and(AnimationLoop::is_pending)
    }

    fn set_max_fps(&mut self, max_fps: f64) {
        self.state.set_max_fps(max_fps);
    }

    fn fps(&self) -> f64 {
        self.state.fps()
    }

    fn stats(&self) -> FrameStats {
        self.state.stats()
    }
}

/// Converts a canvas dimension to a GL viewport dimension, clamping at `i32::MAX`.
fn viewport_extent(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
