use web_sys::{
    js_sys::{Object, Reflect},
    wasm_bindgen::{JsCast, JsValue},
    window, Document, Element, HtmlCanvasElement, Performance, Window,
};

use crate::{error::Error, utils::window_size};

/// Returns the global window.
pub(crate) fn get_window() -> Result<Window, Error> {
    window().ok_or(Error::UnableToRetrieveWindow)
}

/// Returns the document of the given window.
pub(crate) fn get_document(window: &Window) -> Result<Document, Error> {
    window.document().ok_or(Error::UnableToRetrieveDocument)
}

/// Returns the element with the given id, or `<body>` if no id is given.
pub(crate) fn get_element_by_id_or_body(
    document: &Document,
    id: Option<&String>,
) -> Result<Element, Error> {
    match id {
        Some(id) => document
            .get_element_by_id(id)
            .ok_or_else(|| Error::UnableToRetrieveElement(id.clone())),
        None => document
            .body()
            .map(Element::from)
            .ok_or(Error::UnableToRetrieveBody),
    }
}

/// Creates a new `<canvas>` element of the given size and appends it to `parent`.
pub(crate) fn create_canvas_in_element(
    document: &Document,
    parent: &Element,
    width: u32,
    height: u32,
) -> Result<HtmlCanvasElement, Error> {
    let canvas = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(JsValue::from)?;
    canvas.set_width(width);
    canvas.set_height(height);
    parent.append_child(&canvas)?;
    Ok(canvas)
}

/// Picks the canvas size: the explicit size if any, otherwise the size of a
/// non-empty parent, otherwise the inner size of the window.
pub(crate) fn resolve_size(size: Option<(u32, u32)>, parent: &Element) -> Result<(u32, u32), Error> {
    if let Some(size) = size {
        return Ok(size);
    }
    let parent_size = (parent.client_width() as u32, parent.client_height() as u32);
    if parent_size.0 > 0 && parent_size.1 > 0 {
        Ok(parent_size)
    } else {
        window_size()
    }
}

/// Builds the dictionary passed to `getContext`.
pub(crate) fn context_options(flags: &[(&str, bool)]) -> Result<Object, Error> {
    let options = Object::new();
    for (key, value) in flags {
        Reflect::set(&options, &JsValue::from_str(key), &JsValue::from_bool(*value))?;
    }
    Ok(options)
}

/// Returns the `performance` object of the window.
fn performance(window: &Window) -> Result<Performance, Error> {
    window.performance().ok_or(Error::UnableToRetrievePerformance)
}

/// Optional marks on the browser's [Performance] timeline.
///
/// [Performance]: https://developer.mozilla.org/en-US/docs/Web/API/Performance
#[derive(Debug, Clone, Default)]
pub(crate) struct PerformanceMarks {
    /// `None` when measuring is disabled.
    performance: Option<Performance>,
}

impl PerformanceMarks {
    /// Constructs a new [`PerformanceMarks`], looking up `performance` only if enabled.
    pub(crate) fn new(window: &Window, enabled: bool) -> Result<Self, Error> {
        let performance = if enabled {
            Some(performance(window)?)
        } else {
            None
        };
        Ok(Self { performance })
    }

    /// Measures the beginning of a performance mark.
    pub(crate) fn begin(&self, label: &str) {
        if let Some(performance) = &self.performance {
            let _ = performance.mark(label);
        }
    }

    /// Measures the end of a performance mark.
    pub(crate) fn end(&self, label: &str) {
        if let Some(performance) = &self.performance {
            let _ = performance.measure_with_start_mark(label, label);
        }
    }
}
