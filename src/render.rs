use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use web_sys::{
    wasm_bindgen::{prelude::Closure, JsCast},
    Window,
};

use crate::error::Error;

/// Slot holding the self-rescheduling animation frame closure.
type FrameClosure = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// A callback registered with [`requestAnimationFrame`] that re-registers
/// itself after every invocation.
///
/// Dropping the loop cancels the pending request and releases the closure,
/// so the callback is never invoked after teardown.
///
/// [`requestAnimationFrame`]: https://developer.mozilla.org/en-US/docs/Web/API/Window/requestAnimationFrame
pub(crate) struct AnimationLoop {
    /// Window the requests are made on.
    window: Window,
    /// Id of the pending request, used for cancellation.
    request_id: Rc<Cell<Option<i32>>>,
    /// The registered closure.
    closure: FrameClosure,
}

impl AnimationLoop {
    /// Registers `on_frame` and starts the loop.
    ///
    /// `on_frame` receives the frame timestamp in milliseconds.
    pub(crate) fn start<F>(window: Window, mut on_frame: F) -> Result<Self, Error>
    where
        F: FnMut(f64) + 'static,
    {
        let closure: FrameClosure = Rc::new(RefCell::new(None));
        let request_id = Rc::new(Cell::new(None));

        // The closure only holds a weak handle to itself, otherwise the
        // slot and the closure would keep each other alive.
        let slot = Rc::downgrade(&closure);
        let frame = Closure::<dyn FnMut(f64)>::new({
            let window = window.clone();
            let request_id = request_id.clone();
            move |timestamp: f64| {
                request_id.set(None);
                on_frame(timestamp);

                let Some(slot) = slot.upgrade() else {
                    return;
                };
                let slot = slot.borrow();
                if let Some(closure) = slot.as_ref() {
                    match request_animation_frame(&window, closure) {
                        Ok(id) => request_id.set(Some(id)),
                        Err(err) => log::error!("Unable to request animation frame: {err}"),
                    }
                }
            }
        });

        let id = request_animation_frame(&window, &frame)?;
        *closure.borrow_mut() = Some(frame);
        request_id.set(Some(id));
        log::debug!("Animation loop started");

        Ok(Self {
            window,
            request_id,
            closure,
        })
    }

    /// Returns `true` while an animation frame request is pending.
    pub(crate) fn is_pending(&self) -> bool {
        self.request_id.get().is_some()
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        if let Some(id) = self.request_id.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        self.closure.borrow_mut().take();
        log::debug!("Animation loop stopped");
    }
}

impl std::fmt::Debug for AnimationLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationLoop")
            .field("request_id", &self.request_id.get())
            .finish()
    }
}

/// Requests an animation frame.
fn request_animation_frame(window: &Window, f: &Closure<dyn FnMut(f64)>) -> Result<i32, Error> {
    Ok(window.request_animation_frame(f.as_ref().unchecked_ref())?)
}
