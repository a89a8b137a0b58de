use std::fmt::{Debug, Formatter};

use compact_str::CompactString;
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use tiny_skia::{Color, ColorU8, Pixmap, PremultipliedColorU8};

use crate::{
    error::Error,
    font_cache::{FontCache, DEFAULT_FONT_NAME},
};

/// Font size used for text until [`Surface::set_font_size`] is called.
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Software frame buffer that a [`Canvas2d`](crate::Canvas2d) copies to the screen.
///
/// Shapes are drawn straight onto the [`Pixmap`] with the [`tiny_skia`] API
/// (see [`Surface::pixmap_mut`]). Text goes through [`Surface::fill_text`],
/// which resolves the current font through the [`FontCache`].
pub struct Surface {
    /// Pixel buffer, premultiplied RGBA.
    pixmap: Pixmap,
    /// Fonts available to [`Surface::fill_text`].
    fonts: FontCache,
    /// Name of the current font.
    font_name: CompactString,
    /// Size of the current font, in pixels.
    font_size: f32,
}

impl Surface {
    /// Constructs a new transparent [`Surface`].
    ///
    /// With the `default-font` feature (on by default) the font cache starts
    /// with [`DEFAULT_FONT_DATA`](crate::font_cache::DEFAULT_FONT_DATA) stored
    /// under the default name, so text renders without any setup.
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        #[allow(unused_mut)]
        let mut fonts = FontCache::new();
        #[cfg(feature = "default-font")]
        fonts.load_bytes(DEFAULT_FONT_NAME, crate::font_cache::DEFAULT_FONT_DATA)?;

        Ok(Self {
            pixmap: new_pixmap(width, height)?,
            fonts,
            font_name: DEFAULT_FONT_NAME.into(),
            font_size: DEFAULT_FONT_SIZE,
        })
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Returns the pixel buffer.
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Returns the pixel buffer for drawing with [`tiny_skia`].
    ///
    /// # Examples
    ///
    /// ```
    /// use webcanvas::{tiny_skia::{Color, FillRule, Paint, PathBuilder, Transform}, Surface};
    ///
    /// let mut surface = Surface::new(64, 64).unwrap();
    /// let mut paint = Paint::default();
    /// paint.set_color(Color::from_rgba8(255, 0, 255, 255));
    /// let circle = PathBuilder::from_circle(32.0, 32.0, 10.0).unwrap();
    /// surface
    ///     .pixmap_mut()
    ///     .fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);
    /// ```
    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Fills the whole buffer with `color`.
    pub fn clear(&mut self, color: Color) {
        self.pixmap.fill(color);
    }

    /// Replaces the buffer with a transparent one of the given size.
    ///
    /// Fonts and the current font selection are kept.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if (width, height) != (self.width(), self.height()) {
            self.pixmap = new_pixmap(width, height)?;
        }
        Ok(())
    }

    /// Returns the font cache.
    pub fn fonts(&self) -> &FontCache {
        &self.fonts
    }

    /// Returns the font cache for loading fonts.
    pub fn fonts_mut(&mut self) -> &mut FontCache {
        &mut self.fonts
    }

    /// Returns the name of the current font.
    pub fn font(&self) -> &str {
        &self.font_name
    }

    /// Selects the font used by [`Surface::fill_text`].
    ///
    /// Unknown names fall back to the default font of the cache.
    pub fn set_font(&mut self, name: &str) {
        self.font_name = name.into();
    }

    /// Returns the size of the current font, in pixels.
    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Sets the size of the current font, in pixels.
    ///
    /// Sizes that are not finite and positive are ignored.
    pub fn set_font_size(&mut self, size: f32) {
        if size.is_finite() && size > 0.0 {
            self.font_size = size;
        }
    }

    /// Draws `text` with the current font, its line box starting at (`x`, `y`).
    ///
    /// Glyphs falling outside the buffer are clipped. Non-finite coordinates
    /// draw nothing.
    pub fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Color) -> Result<(), Error> {
        let font = self
            .fonts
            .load(&self.font_name)
            .ok_or_else(|| Error::FontNotFound(self.font_name.to_string()))?;
        if !x.is_finite() || !y.is_finite() {
            return Ok(());
        }

        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x,
            y,
            ..LayoutSettings::default()
        });
        layout.append(&[font], &TextStyle::new(text, self.font_size, 0));

        let color = color.to_color_u8();
        let width = i64::from(self.pixmap.width());
        let height = i64::from(self.pixmap.height());
        let pixels = self.pixmap.pixels_mut();

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            if !glyph.x.is_finite() || !glyph.y.is_finite() {
                continue;
            }
            let (metrics, coverage) = font.rasterize_config(glyph.key);
            if metrics.width == 0 {
                continue;
            }
            let left = glyph.x.round() as i64;
            let top = glyph.y.round() as i64;

            for (row, line) in coverage.chunks_exact(metrics.width).enumerate() {
                let py = top.saturating_add(row as i64);
                if !(0..height).contains(&py) {
                    continue;
                }
                for (column, &alpha) in line.iter().enumerate() {
                    let px = left.saturating_add(column as i64);
                    if alpha == 0 || !(0..width).contains(&px) {
                        continue;
                    }
                    let index = (py * width + px) as usize;
                    pixels[index] = blend(pixels[index], color, alpha);
                }
            }
        }

        Ok(())
    }

    /// Writes the buffer into `out` as straight (non-premultiplied) RGBA bytes.
    ///
    /// This is the layout `ImageData` expects. `out` is cleared first so it can
    /// be reused across frames.
    pub fn copy_rgba(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let color = pixel.demultiply();
            out.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
    }
}

impl Debug for Surface {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("fonts", &self.fonts.names().collect::<Vec<_>>())
            .field("font_name", &self.font_name)
            .field("font_size", &self.font_size)
            .finish()
    }
}

/// Allocates a pixmap, rejecting empty sizes.
fn new_pixmap(width: u32, height: u32) -> Result<Pixmap, Error> {
    Pixmap::new(width, height).ok_or(Error::InvalidSize { width, height })
}

/// Composites `color` at the given coverage over `dst` (source-over).
fn blend(dst: PremultipliedColorU8, color: ColorU8, coverage: u8) -> PremultipliedColorU8 {
    let alpha = u32::from(color.alpha()) * u32::from(coverage) / 255;
    if alpha == 0 {
        return dst;
    }
    let inverse = 255 - alpha;
    let mix = |src: u8, dst: u8| (u32::from(src) * alpha / 255 + u32::from(dst) * inverse / 255) as u8;

    PremultipliedColorU8::from_rgba(
        mix(color.red(), dst.red()),
        mix(color.green(), dst.green()),
        mix(color.blue(), dst.blue()),
        mix(255, dst.alpha()),
    )
    .unwrap_or(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn premultiplied(r: u8, g: u8, b: u8, a: u8) -> PremultipliedColorU8 {
        PremultipliedColorU8::from_rgba(r, g, b, a).expect("valid premultiplied color")
    }

    #[test]
    fn test_empty_size_is_rejected() {
        assert!(matches!(
            Surface::new(0, 10),
            Err(Error::InvalidSize {
                width: 0,
                height: 10
            })
        ));
        let mut surface = Surface::new(4, 4).expect("surface");
        assert!(surface.resize(4, 0).is_err());
        assert_eq!((surface.width(), surface.height()), (4, 4));
    }

    #[test]
    fn test_resize_keeps_font_selection() {
        let mut surface = Surface::new(4, 4).expect("surface");
        surface.set_font("mono");
        surface.set_font_size(24.0);
        surface.resize(8, 2).expect("resize");
        assert_eq!((surface.width(), surface.height()), (8, 2));
        assert_eq!(surface.font(), "mono");
        assert_eq!(surface.font_size(), 24.0);
    }

    #[test]
    fn test_copy_rgba_is_straight_alpha() {
        let mut surface = Surface::new(2, 1).expect("surface");
        surface.clear(Color::from_rgba8(255, 0, 0, 128));
        let mut out = vec![9; 3];
        surface.copy_rgba(&mut out);
        assert_eq!(out, vec![255, 0, 0, 128, 255, 0, 0, 128]);
    }

    #[test]
    fn test_copy_rgba_transparent() {
        let surface = Surface::new(3, 2).expect("surface");
        let mut out = Vec::new();
        surface.copy_rgba(&mut out);
        assert_eq!(out.len(), 3 * 2 * 4);
        assert!(out.iter().all(|&byte| byte == 0));
    }

    /// Returns the coordinates of all pixels with a non-zero alpha.
    fn painted(surface: &Surface) -> Vec<(u32, u32)> {
        surface
            .pixmap()
            .pixels()
            .iter()
            .enumerate()
            .filter(|(_, pixel)| pixel.alpha() > 0)
            .map(|(index, _)| {
                let index = index as u32;
                (index % surface.width(), index / surface.width())
            })
            .collect()
    }

    #[test]
    fn test_fill_text_without_fonts() {
        let mut surface = Surface::new(16, 16).expect("surface");
        *surface.fonts_mut() = FontCache::new();
        let result = surface.fill_text("hi", 0.0, 0.0, Color::BLACK);
        assert!(matches!(result, Err(Error::FontNotFound(name)) if name == DEFAULT_FONT_NAME));
    }

    #[test]
    fn test_font_size_rejects_invalid_values() {
        let mut surface = Surface::new(4, 4).expect("surface");
        for size in [f32::NAN, f32::INFINITY, 0.0, -3.0] {
            surface.set_font_size(size);
            assert_eq!(surface.font_size(), DEFAULT_FONT_SIZE);
        }
    }

    #[cfg(feature = "default-font")]
    #[test]
    fn test_default_font_is_loaded() {
        let surface = Surface::new(4, 4).expect("surface");
        assert!(surface.fonts().contains(DEFAULT_FONT_NAME));
        assert!(surface.fonts().load("anything").is_some());
    }

    #[cfg(feature = "default-font")]
    #[test]
    fn test_fill_text_draws_below_and_right_of_origin() {
        let mut surface = Surface::new(64, 48).expect("surface");
        surface
            .fill_text("Hg", 20.0, 10.0, Color::BLACK)
            .expect("text");

        let pixels = painted(&surface);
        assert!(!pixels.is_empty());
        assert!(pixels.iter().all(|&(x, y)| x >= 20 && y >= 10));
        // Nothing past a 16px line box and two monospace advances.
        assert!(pixels.iter().all(|&(x, y)| x < 20 + 24 && y < 10 + 24));
    }

    #[cfg(feature = "default-font")]
    #[test]
    fn test_fill_text_unknown_font_uses_default() {
        let mut expected = Surface::new(48, 24).expect("surface");
        expected
            .fill_text("Hg", 2.0, 2.0, Color::BLACK)
            .expect("text");

        let mut fallback = Surface::new(48, 24).expect("surface");
        fallback.set_font("missing");
        fallback
            .fill_text("Hg", 2.0, 2.0, Color::BLACK)
            .expect("text");

        assert!(!painted(&fallback).is_empty());
        assert_eq!(fallback.pixmap().data(), expected.pixmap().data());
    }

    #[cfg(feature = "default-font")]
    #[test]
    fn test_fill_text_is_clipped() {
        let mut surface = Surface::new(16, 16).expect("surface");
        surface.set_font_size(32.0);
        surface
            .fill_text("HH", -6.0, -6.0, Color::BLACK)
            .expect("text");
        assert!(!painted(&surface).is_empty());

        let mut outside = Surface::new(16, 16).expect("surface");
        for (x, y) in [(1000.0, 1000.0), (-1000.0, 0.0), (0.0, 1.0e30), (1.0e30, 1.0e30)] {
            outside.fill_text("HH", x, y, Color::BLACK).expect("text");
        }
        assert!(painted(&outside).is_empty());
    }

    #[cfg(feature = "default-font")]
    #[test]
    fn test_fill_text_non_finite_position() {
        let mut surface = Surface::new(16, 16).expect("surface");
        for (x, y) in [(f32::INFINITY, 0.0), (0.0, f32::NEG_INFINITY), (f32::NAN, 4.0)] {
            surface.fill_text("Hg", x, y, Color::BLACK).expect("text");
        }
        assert!(painted(&surface).is_empty());
    }

    #[cfg(feature = "default-font")]
    #[test]
    fn test_fill_text_blends_over_background() {
        let mut surface = Surface::new(48, 48).expect("surface");
        surface.clear(Color::WHITE);
        surface.set_font_size(32.0);
        surface
            .fill_text("H", 4.0, 2.0, Color::from_rgba8(255, 0, 0, 255))
            .expect("text");

        let pixels = surface.pixmap().pixels();
        assert!(pixels.iter().all(|pixel| pixel.alpha() == 255 && pixel.red() == 255));
        assert!(pixels.iter().any(|pixel| pixel.green() < 64 && pixel.blue() < 64));
        assert!(pixels.iter().any(|pixel| pixel.green() == 255));
    }

    #[test]
    fn test_blend_full_coverage() {
        let white = premultiplied(255, 255, 255, 255);
        let red = ColorU8::from_rgba(255, 0, 0, 255);
        assert_eq!(blend(white, red, 255), premultiplied(255, 0, 0, 255));
    }

    #[test]
    fn test_blend_zero_coverage() {
        let dst = premultiplied(10, 20, 30, 40);
        let red = ColorU8::from_rgba(255, 0, 0, 255);
        assert_eq!(blend(dst, red, 0), dst);
    }

    #[test]
    fn test_blend_partial_coverage_on_transparent() {
        let transparent = premultiplied(0, 0, 0, 0);
        let red = ColorU8::from_rgba(255, 0, 0, 255);
        let blended = blend(transparent, red, 128);
        assert_eq!(blended, premultiplied(128, 0, 0, 128));
        let straight = blended.demultiply();
        assert_eq!(
            (straight.red(), straight.alpha()),
            (255, 128)
        );
    }
}
