use std::collections::HashMap;

use compact_str::CompactString;
use fontdue::{Font, FontSettings};

use crate::error::Error;

/// Name of the font used when a lookup misses.
pub const DEFAULT_FONT_NAME: &str = "roboto";

/// DejaVu Sans Mono, stored under [`DEFAULT_FONT_NAME`] in every new
/// [`Surface`](crate::Surface).
///
/// See `assets/LICENSE-DejaVu.txt` for its license.
#[cfg(feature = "default-font")]
pub const DEFAULT_FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Name-to-font lookup table used when rasterizing text.
///
/// The cache is filled once during setup and only read while drawing. Looking
/// up a name that was never stored returns the font stored under the default
/// name instead, so text still renders with a known face.
///
/// The font type is generic so the lookup policy does not depend on a
/// particular font parser; [`Surface`](crate::Surface) uses [`fontdue::Font`].
#[derive(Debug)]
pub struct FontCache<F = Font> {
    /// Stored fonts keyed by name.
    fonts: HashMap<CompactString, F>,
    /// Fallback name.
    default_name: CompactString,
}

impl<F> Default for FontCache<F> {
    fn default() -> Self {
        Self::with_default(DEFAULT_FONT_NAME)
    }
}

impl<F> FontCache<F> {
    /// Constructs an empty [`FontCache`] falling back to [`DEFAULT_FONT_NAME`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Constructs an empty [`FontCache`] with the given fallback name.
    pub fn with_default(name: &str) -> Self {
        Self {
            fonts: HashMap::new(),
            default_name: name.into(),
        }
    }

    /// Stores a font under `name`, replacing any previous font with that name.
    pub fn store(&mut self, name: &str, font: F) {
        self.fonts.insert(name.into(), font);
    }

    /// Looks up the font stored under `name`.
    ///
    /// Falls back to the default font when `name` is absent. Returns `None`
    /// only if the default font is absent too.
    pub fn load(&self, name: &str) -> Option<&F> {
        self.fonts
            .get(name)
            .or_else(|| self.fonts.get(self.default_name.as_str()))
    }

    /// Returns `true` if a font is stored under exactly `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fonts.contains_key(name)
    }

    /// Returns the fallback name.
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Changes the fallback name.
    pub fn set_default(&mut self, name: &str) {
        self.default_name = name.into();
    }

    /// Returns the names of all stored fonts, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fonts.keys().map(CompactString::as_str)
    }

    /// Returns the number of stored fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Returns `true` if no font is stored.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

impl FontCache<Font> {
    /// Parses TrueType/OpenType data and stores the result under `name`.
    pub fn load_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), Error> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|reason| {
            Error::FontParse {
                name: name.to_string(),
                reason,
            }
        })?;
        log::debug!("Loaded font `{name}` ({} glyphs)", font.glyph_count());
        self.store(name, font);
        Ok(())
    }
}
