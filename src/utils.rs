use web_sys::window;

use crate::error::Error;

/// Returns the inner size of the browser window, in CSS pixels.
pub fn window_size() -> Result<(u32, u32), Error> {
    let window = window().ok_or(Error::UnableToRetrieveWindow)?;
    let width = window.inner_width()?.as_f64().unwrap_or(0.0);
    let height = window.inner_height()?.as_f64().unwrap_or(0.0);
    Ok((width as u32, height as u32))
}

/// Forwards panic messages to the browser console.
///
/// Safe to call more than once.
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Routes [`log`] records of at least `level` to the browser console.
///
/// Fails if a logger was already installed.
pub fn init_logging(level: log::Level) -> Result<(), Error> {
    console_log::init_with_level(level)?;
    Ok(())
}
