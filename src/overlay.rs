//! Draws text onto a generated banner through a transparent layer.

use std::path::Path;

use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont, point};
use image::{DynamicImage, Rgba, RgbImage, RgbaImage};
use tracing::debug;

use crate::constants::MAX_FONT_SIZE;
use crate::error::BannerError;

/// Opaque black, the default fill.
pub const DEFAULT_TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Text to draw and where.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayText {
    /// May contain `\n` line breaks
    pub text: String,
    /// Top-left corner of the first line, in pixels
    pub position: (i32, i32),
    /// Pixel height of the font
    pub font_size: f32,
    /// Fill colour, alpha included
    pub color: Rgba<u8>,
}

/// Finite, positive and no larger than [`MAX_FONT_SIZE`].
pub fn font_size_in_range(size: f32) -> bool {
    size.is_finite() && size > 0.0 && size <= MAX_FONT_SIZE
}

/// Reads and parses a TTF/OTF font file.
pub fn load_font(path: &Path) -> Result<FontVec, BannerError> {
    let data = std::fs::read(path).map_err(|err| BannerError::FontResource {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    FontVec::try_from_vec(data).map_err(|err| BannerError::FontResource {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Rasterises `text` onto `layer`. Each line starts at `x`, lines are one
/// font height plus line gap apart. Glyphs that miss the layer entirely are
/// never rasterised.
fn draw_text(layer: &mut RgbaImage, font: &FontVec, overlay: &OverlayText) {
    let scaled = font.as_scaled(PxScale::from(overlay.font_size));
    let line_advance = scaled.height() + scaled.line_gap();
    let (x, y) = overlay.position;
    let (width, height) = (i64::from(layer.width()), i64::from(layer.height()));
    let color = overlay.color;

    for (line_idx, line) in overlay.text.lines().enumerate() {
        let baseline = y as f32 + scaled.ascent() + line_idx as f32 * line_advance;
        let mut caret = x as f32;
        let mut previous: Option<GlyphId> = None;

        for ch in line.chars() {
            let glyph_id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(scaled.scale(), point(caret, baseline));
            caret += scaled.h_advance(glyph_id);
            previous = Some(glyph_id);

            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            if bounds.max.x <= 0.0
                || bounds.max.y <= 0.0
                || bounds.min.x >= width as f32
                || bounds.min.y >= height as f32
            {
                continue;
            }
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i64 + i64::from(gx);
                let py = bounds.min.y as i64 + i64::from(gy);
                if px < 0 || py < 0 || px >= width || py >= height {
                    return;
                }
                let alpha = (coverage.clamp(0.0, 1.0) * f32::from(color[3])).round() as u8;
                let pixel = layer.get_pixel_mut(px as u32, py as u32);
                // overlapping glyph edges keep the stronger coverage
                if alpha > pixel[3] {
                    *pixel = Rgba([color[0], color[1], color[2], alpha]);
                }
            });
        }
    }
}

/// Draws `overlay` over `image` and returns an opaque RGB result.
///
/// The text goes on a transparent layer of the same size which is then
/// alpha-composited over the base, so the base never covers the text.
pub fn add_text_to_image(
    image: &DynamicImage,
    overlay: &OverlayText,
    font_path: &Path,
) -> Result<RgbImage, BannerError> {
    if !font_size_in_range(overlay.font_size) {
        return Err(BannerError::Image(format!(
            "font size {} is outside 0 to {MAX_FONT_SIZE} px",
            overlay.font_size
        )));
    }
    let mut base = image.to_rgba8();
    let mut layer = RgbaImage::from_pixel(base.width(), base.height(), Rgba([255, 255, 255, 0]));
    let font = load_font(font_path)?;

    debug!(
        "Drawing {} line(s) at {:?}, {}px",
        overlay.text.lines().count(),
        overlay.position,
        overlay.font_size
    );
    draw_text(&mut layer, &font, overlay);
    image::imageops::overlay(&mut base, &layer, 0, 0);
    Ok(DynamicImage::ImageRgba8(base).to_rgb8())
}

/// Decodes provider bytes and draws the overlay on them.
pub fn overlay_bytes(
    bytes: &[u8],
    overlay: &OverlayText,
    font_path: &Path,
) -> Result<RgbImage, BannerError> {
    let image = image::load_from_memory(bytes)?;
    add_text_to_image(&image, overlay, font_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::path::PathBuf;

    fn font_path() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/fonts/DejaVuSans.ttf"))
    }

    fn white(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
    }

    fn overlay(text: &str, position: (i32, i32)) -> OverlayText {
        OverlayText {
            text: text.to_string(),
            position,
            font_size: 32.0,
            color: DEFAULT_TEXT_COLOR,
        }
    }

    fn changed_pixels(result: &RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) -> usize {
        (y0..y1)
            .flat_map(|y| (x0..x1).map(move |x| (x, y)))
            .filter(|(x, y)| *result.get_pixel(*x, *y) != Rgb([255, 255, 255]))
            .count()
    }

    #[test]
    fn two_lines_keep_dimensions_and_mark_the_anchor_region() {
        let base = white(240, 160);
        let result = add_text_to_image(&base, &overlay("Line1\nLine2", (20, 30)), &font_path())
            .expect("overlay");
        assert_eq!(result.dimensions(), (240, 160));
        assert!(changed_pixels(&result, 20, 30, 240, 160) > 0);
        // nothing above or left of the anchor
        assert_eq!(changed_pixels(&result, 0, 0, 240, 25), 0);
        assert_eq!(changed_pixels(&result, 0, 0, 15, 160), 0);
    }

    #[test]
    fn line_breaks_start_a_new_line() {
        let base = white(300, 200);
        let single = add_text_to_image(&base, &overlay("Line1", (10, 10)), &font_path())
            .expect("single line");
        let double = add_text_to_image(&base, &overlay("Line1\nLine2", (10, 10)), &font_path())
            .expect("two lines");
        // the second line lands below the first one's band
        assert_eq!(changed_pixels(&single, 0, 60, 300, 200), 0);
        assert!(changed_pixels(&double, 0, 60, 300, 200) > 0);
    }

    #[test]
    fn non_latin_text_renders() {
        let font = load_font(&font_path()).expect("font");
        assert_ne!(font.glyph_id('Ж'), GlyphId(0));
        let result = add_text_to_image(&white(300, 120), &overlay("Привет\nΓειά σου", (5, 5)), &font_path())
            .expect("overlay");
        assert!(changed_pixels(&result, 0, 0, 300, 120) > 0);
    }

    #[test]
    fn text_is_composited_over_the_base() {
        let base = DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 120, Rgb([255, 0, 0])));
        let blue_half = OverlayText {
            text: "\u{2588}".to_string(),
            position: (10, 10),
            font_size: 80.0,
            color: Rgba([0, 0, 255, 128]),
        };
        let result = add_text_to_image(&base, &blue_half, &font_path()).expect("overlay");
        let centre = result.get_pixel(30, 50);
        // half blue over red, so both channels survive
        assert!(centre[0] > 100 && centre[0] < 160, "red was {}", centre[0]);
        assert!(centre[2] > 100 && centre[2] < 160, "blue was {}", centre[2]);
        assert_eq!(*result.get_pixel(115, 115), Rgb([255, 0, 0]));
    }

    #[test]
    fn oversized_font_is_rejected_before_drawing() {
        let huge = OverlayText {
            text: "W".to_string(),
            position: (0, 0),
            font_size: 1.0e6,
            color: DEFAULT_TEXT_COLOR,
        };
        let result = add_text_to_image(&white(64, 64), &huge, &font_path());
        assert!(matches!(result, Err(BannerError::Image(_))));

        for font_size in [0.0, -3.0, f32::NAN, f32::INFINITY, MAX_FONT_SIZE + 1.0] {
            let bad = OverlayText {
                font_size,
                ..overlay("W", (0, 0))
            };
            assert!(add_text_to_image(&white(8, 8), &bad, &font_path()).is_err());
        }
    }

    #[test]
    fn largest_font_size_still_draws() {
        let biggest = OverlayText {
            font_size: MAX_FONT_SIZE,
            ..overlay("\u{2588}", (-10, -200))
        };
        let result = add_text_to_image(&white(64, 64), &biggest, &font_path()).expect("overlay");
        assert!(changed_pixels(&result, 0, 0, 64, 64) > 0);
    }

    #[test]
    fn off_canvas_anchor_leaves_the_image_unchanged() {
        let base = white(64, 64);
        for position in [
            (i32::MAX, i32::MAX),
            (i32::MIN, i32::MIN),
            (-100_000, 5),
            (5, 100_000),
            (64, 0),
        ] {
            let result = add_text_to_image(&base, &overlay("Line1\nLine2", position), &font_path())
                .expect("off-canvas text is not an error");
            assert_eq!(result, base.to_rgb8(), "anchor {position:?}");
        }
    }

    #[test]
    fn partly_visible_text_is_clipped() {
        let result = add_text_to_image(&white(64, 64), &overlay("WWWW", (40, -10)), &font_path())
            .expect("overlay");
        assert_eq!(result.dimensions(), (64, 64));
        assert!(changed_pixels(&result, 40, 0, 64, 64) > 0);
        assert_eq!(changed_pixels(&result, 0, 0, 38, 64), 0);
    }

    #[test]
    fn missing_font_is_a_font_error() {
        let result = add_text_to_image(
            &white(10, 10),
            &overlay("hi", (0, 0)),
            Path::new("/definitely/not/here.ttf"),
        );
        assert!(matches!(result, Err(BannerError::FontResource { .. })));
    }

    #[test]
    fn garbage_font_is_a_font_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").expect("write");
        assert!(matches!(
            load_font(&path),
            Err(BannerError::FontResource { .. })
        ));
    }

    #[test]
    fn undecodable_bytes_are_an_image_error() {
        assert!(matches!(
            overlay_bytes(b"nope", &overlay("x", (0, 0)), &font_path()),
            Err(BannerError::Image(_))
        ));
    }
}
