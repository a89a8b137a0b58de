use web_sys::wasm_bindgen::JsValue;

/// Error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unable to retrieve the window.
    #[error("Unable to retrieve window")]
    UnableToRetrieveWindow,

    /// Unable to retrieve the document.
    #[error("Unable to retrieve document")]
    UnableToRetrieveDocument,

    /// Unable to retrieve the body.
    #[error("Unable to retrieve body")]
    UnableToRetrieveBody,

    /// Unable to find an element with the given id.
    #[error("Unable to retrieve element with id `{0}`")]
    UnableToRetrieveElement(String),

    /// Unable to retrieve the 2D rendering context of the canvas.
    #[error("Unable to retrieve canvas context")]
    UnableToRetrieveCanvasContext,

    /// Unable to retrieve the WebGL rendering context of the canvas.
    #[error("Unable to retrieve WebGL context")]
    UnableToRetrieveWebGlContext,

    /// Unable to retrieve the `performance` object of the window.
    #[error("Unable to retrieve performance")]
    UnableToRetrievePerformance,

    /// A frame buffer cannot be created with the given dimensions.
    #[error("Invalid frame buffer size: {width}x{height}")]
    InvalidSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Font data could not be parsed.
    #[error("Unable to parse font `{name}`: {reason}")]
    FontParse {
        /// Name the font was going to be stored under.
        name: String,
        /// Parser message.
        reason: &'static str,
    },

    /// Neither the requested font nor the default font is cached.
    #[error("Font `{0}` not found and no default font is loaded")]
    FontNotFound(String),

    /// A global logger is already installed.
    #[error(transparent)]
    Logger(#[from] log::SetLoggerError),

    /// An error raised by a browser API.
    #[error("JavaScript error: {0:?}")]
    Js(JsValue),
}

impl From<JsValue> for Error {
    fn from(value: JsValue) -> Self {
        Self::Js(value)
    }
}

impl From<Error> for JsValue {
    fn from(error: Error) -> Self {
        match error {
            Error::Js(value) => value,
            other => JsValue::from_str(&other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NopLogger;

    impl log::Log for NopLogger {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            false
        }

        fn log(&self, _: &log::Record<'_>) {}

        fn flush(&self) {}
    }

    static LOGGER: NopLogger = NopLogger;

    #[test]
    fn test_logger_already_installed() {
        let _ = log::set_logger(&LOGGER);
        let error: Error = log::set_logger(&LOGGER)
            .expect_err("second logger is rejected")
            .into();

        assert!(matches!(error, Error::Logger(_)));
        assert!(error.to_string().contains("logger"));
        assert!(std::error::Error::source(&error).is_none());
    }
}
