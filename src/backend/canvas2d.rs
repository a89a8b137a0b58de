use std::{cell::RefCell, rc::Rc};

use compact_str::CompactString;
use tiny_skia::Color;
use web_sys::{
    js_sys::{Reflect, Uint8ClampedArray},
    wasm_bindgen::{JsCast, JsValue},
    CanvasRenderingContext2d, Document, HtmlCanvasElement, ImageData, Window,
};

use crate::{
    backend::{
        utils::*, FrameRenderer, LoopState, COPY_FRAME_MARK, RENDER_CALLBACK_MARK,
    },
    error::Error,
    frame::{FrameStats, FrameTiming},
    render::AnimationLoop,
    surface::Surface,
    utils::window_size,
};

/// Options for the [`Canvas2d`].
#[derive(Debug, Clone)]
pub struct Canvas2dOptions {
    /// The id of the canvas' parent element.
    parent_id: Option<String>,
    /// Override the automatically detected size.
    size: Option<(u32, u32)>,
    /// Fonts to load into the surface, as (name, TrueType/OpenType data).
    fonts: Vec<(CompactString, Vec<u8>)>,
    /// Name of the fallback font.
    default_font: Option<CompactString>,
    /// Initial font size, in pixels.
    font_size: Option<f32>,
    /// Color the surface is filled with before the first frame.
    background: Option<Color>,
    /// Whether the canvas has an alpha channel.
    alpha: bool,
    /// Hint the browser to decouple the canvas from the event loop.
    desynchronized: bool,
    /// Measure performance using the `performance` API.
    measure_performance: bool,
}

impl Default for Canvas2dOptions {
    fn default() -> Self {
        Self {
            parent_id: None,
            size: None,
            fonts: Vec::new(),
            default_font: None,
            font_size: None,
            background: None,
            alpha: true,
            desynchronized: false,
            measure_performance: false,
        }
    }
}

impl Canvas2dOptions {
    /// Constructs a new [`Canvas2dOptions`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the element id of the canvas' parent element.
    ///
    /// Defaults to `<body>`.
    pub fn parent_id(mut self, id: &str) -> Self {
        self.parent_id = Some(id.to_string());
        self
    }

    /// Sets the size of the canvas, in pixels.
    pub fn size(mut self, size: (u32, u32)) -> Self {
        self.size = Some(size);
        self
    }

    /// Adds a TrueType/OpenType font under `name`.
    pub fn font(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.fonts.push((name.into(), data.into()));
        self
    }

    /// Sets the name of the font used when a requested font is missing.
    pub fn default_font(mut self, name: &str) -> Self {
        self.default_font = Some(name.into());
        self
    }

    /// Sets the initial font size, in pixels.
    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Fills the surface with `color` before the first frame.
    pub fn background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    /// Sets whether the canvas has an alpha channel. Defaults to `true`.
    pub fn alpha(mut self, alpha: bool) -> Self {
        self.alpha = alpha;
        self
    }

    /// Requests a low-latency, desynchronized canvas. Defaults to `false`.
    pub fn desynchronized(mut self, desynchronized: bool) -> Self {
        self.desynchronized = desynchronized;
        self
    }

    /// Enables frame-based measurements using the
    /// [Performance](https://developer.mozilla.org/en-US/docs/Web/API/Performance) API.
    ///
    /// The render callback is measured as `render-callback`, the copy into the
    /// canvas as `copy-frame`.
    pub fn measure_performance(mut self, measure: bool) -> Self {
        self.measure_performance = measure;
        self
    }

    /// Builds the surface described by these options.
    fn build_surface(&self, width: u32, height: u32) -> Result<Surface, Error> {
        let mut surface = Surface::new(width, height)?;
        for (name, data) in &self.fonts {
            surface.fonts_mut().load_bytes(name, data)?;
        }
        if let Some(name) = &self.default_font {
            surface.fonts_mut().set_default(name);
            surface.set_font(name);
        }
        if let Some(size) = self.font_size {
            surface.set_font_size(size);
        }
        if let Some(color) = self.background {
            surface.clear(color);
        }
        Ok(surface)
    }
}

/// An `ImageData` together with a handle on its pixel array.
#[derive(Debug)]
struct FrameImage {
    /// Image passed to `putImageData`.
    image: ImageData,
    /// The `data` array of `image`.
    data: Uint8ClampedArray,
}

impl FrameImage {
    /// Allocates a transparent image of the given size.
    fn new(width: u32, height: u32) -> Result<Self, Error> {
        let image = ImageData::new_with_sw(width, height)?;
        let data = Reflect::get(&image, &JsValue::from_str("data"))?.dyn_into()?;
        Ok(Self { image, data })
    }

    /// Returns `true` if the image has the given size.
    fn has_size(&self, width: u32, height: u32) -> bool {
        (self.image.width(), self.image.height()) == (width, height)
    }
}

/// Copies a [`Surface`] into the canvas.
#[derive(Debug)]
struct FrameCopy {
    /// Rendering context of the canvas.
    context: CanvasRenderingContext2d,
    /// Straight-alpha bytes, reused between frames.
    scratch: Vec<u8>,
    /// Image reused between frames, replaced when the surface size changes.
    image: Option<FrameImage>,
    /// Performance marks.
    marks: PerformanceMarks,
}

impl FrameCopy {
    /// Copies `surface` to the top-left corner of the canvas.
    fn present(&mut self, surface: &Surface) -> Result<(), Error> {
        self.marks.begin(COPY_FRAME_MARK);
        surface.copy_rgba(&mut self.scratch);

        let (width, height) = (surface.width(), surface.height());
        let image = match self.image.take() {
            Some(image) if image.has_size(width, height) => image,
            _ => FrameImage::new(width, height)?,
        };
        image.data.copy_from(&self.scratch);
        self.context.put_image_data(&image.image, 0.0, 0.0)?;
        self.image = Some(image);

        self.marks.end(COPY_FRAME_MARK);
        Ok(())
    }

    /// Returns the image of the last copy, if any.
    fn image(&self) -> Option<&ImageData> {
        self.image.as_ref().map(|image| &image.image)
    }
}

/// Canvas with a software frame buffer.
///
/// Drawing happens on a [`Surface`] in WebAssembly memory. Once per animation
/// frame (subject to the frame rate cap) the render callback runs, and if it
/// reports a change the surface is copied into the canvas.
///
/// # Examples
///
/// ```no_run
/// use webcanvas::{tiny_skia::Color, Canvas2d, FrameRenderer};
///
/// let mut canvas = Canvas2d::new_with_size(320, 240).unwrap();
/// canvas
///     .start(60.0, |surface, timing| {
///         let shade = (timing.frame % 255) as u8;
///         surface.clear(Color::from_rgba8(shade, shade, shade, 255));
///         true
///     })
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct Canvas2d {
    /// Window.
    window: Window,
    /// Document.
    document: Document,
    /// Canvas element.
    canvas: HtmlCanvasElement,
    /// Rendering context.
    context: CanvasRenderingContext2d,
    /// Frame buffer, shared with the frame loop.
    surface: Rc<RefCell<Surface>>,
    /// Copy step, shared with the frame loop.
    frame_copy: Rc<RefCell<FrameCopy>>,
    /// Throttle and counters, shared with the frame loop.
    state: Rc<LoopState>,
    /// The running frame loop.
    animation: Option<AnimationLoop>,
}

impl Canvas2d {
    /// Constructs a new [`Canvas2d`] filling the window, appended to `<body>`.
    pub fn new() -> Result<Self, Error> {
        let (width, height) = window_size()?;
        Self::new_with_size(width, height)
    }

    /// Constructs a new [`Canvas2d`] with the given size, appended to `<body>`.
    pub fn new_with_size(width: u32, height: u32) -> Result<Self, Error> {
        Self::new_with_options(Canvas2dOptions::new().size((width, height)))
    }

    /// Constructs a new [`Canvas2d`] with the given options.
    ///
    /// A new `<canvas>` element is appended to the parent element.
    pub fn new_with_options(options: Canvas2dOptions) -> Result<Self, Error> {
        let window = get_window()?;
        let document = get_document(&window)?;

        // Parent element of canvas (uses <body> unless specified)
        let parent = get_element_by_id_or_body(&document, options.parent_id.as_ref())?;
        let (width, height) = resolve_size(options.size, &parent)?;
        let canvas = create_canvas_in_element(&document, &parent, width, height)?;

        Self::init(window, document, canvas, options)
    }

    /// Constructs a new [`Canvas2d`] on an existing `<canvas>` element.
    ///
    /// The element keeps its size unless [`Canvas2dOptions::size`] is set.
    pub fn from_canvas(canvas: HtmlCanvasElement, options: Canvas2dOptions) -> Result<Self, Error> {
        let window = get_window()?;
        let document = get_document(&window)?;
        if let Some((width, height)) = options.size {
            canvas.set_width(width);
            canvas.set_height(height);
        }
        Self::init(window, document, canvas, options)
    }

    /// Sets up the context and the frame buffer for `canvas`.
    fn init(
        window: Window,
        document: Document,
        canvas: HtmlCanvasElement,
        options: Canvas2dOptions,
    ) -> Result<Self, Error> {
        let context_options = context_options(&[
            ("alpha", options.alpha),
            ("desynchronized", options.desynchronized),
        ])?;
        let context = canvas
            .get_context_with_context_options("2d", &context_options)?
            .ok_or(Error::UnableToRetrieveCanvasContext)?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| Error::UnableToRetrieveCanvasContext)?;

        let surface = options.build_surface(canvas.width(), canvas.height())?;
        let marks = PerformanceMarks::new(&window, options.measure_performance)?;
        log::debug!(
            "Created 2D canvas of {}x{} with {} font(s)",
            surface.width(),
            surface.height(),
            surface.fonts().len()
        );

        Ok(Self {
            window,
            document,
            canvas,
            context: context.clone(),
            surface: Rc::new(RefCell::new(surface)),
            frame_copy: Rc::new(RefCell::new(FrameCopy {
                context,
                scratch: Vec::new(),
                image: None,
                marks,
            })),
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

    /// Returns the frame buffer.
    ///
    /// Do not hold a borrow of it across frames: the frame loop borrows it
    /// mutably for every render callback.
    pub fn surface(&self) -> Rc<RefCell<Surface>> {
        self.surface.clone()
    }

    /// Copies the frame buffer into the canvas right away.
    pub fn present(&self) -> Result<(), Error> {
        self.frame_copy.borrow_mut().present(&self.surface.borrow())
    }

    /// Returns the `ImageData` of the last copy into the canvas.
    ///
    /// The same image is reused for every frame until the size changes.
    pub fn image_data(&self) -> Option<ImageData> {
        self.frame_copy.borrow().image().cloned()
    }

    /// Resizes the canvas element and the frame buffer together.
    ///
    /// The new frame buffer is transparent.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        self.surface.borrow_mut().resize(width, height)?;
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        log::debug!("Resized 2D canvas to {width}x{height}");
        Ok(())
    }
}

impl FrameRenderer for Canvas2d {
    type Target = Surface;
    type Context = CanvasRenderingContext2d;

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
        let surface = self.surface.clone();
        let frame_copy = self.frame_copy.clone();
        self.animation = Some(AnimationLoop::start(
            self.window.clone(),
            move |timestamp| {
                state.on_frame(timestamp, |timing| {
                    let Ok(mut surface) = surface.try_borrow_mut() else {
                        log::warn!("Surface is borrowed elsewhere, skipping frame {}", timing.frame);
                        return false;
                    };
                    let mut frame_copy = frame_copy.borrow_mut();

                    frame_copy.marks.begin(RENDER_CALLBACK_MARK);
                    let changed = render_callback(&mut surface, timing);
                    frame_copy.marks.end(RENDER_CALLBACK_MARK);

                    if changed {
                        if let Err(err) = frame_copy.present(&surface) {
                            log::error!("Unable to copy frame {}: {err}", timing.frame);
                        }
                    }
                    changed
                });
            },
        )?);
        log::debug!("Started 2D frame loop (max {max_fps} FPS)");
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
