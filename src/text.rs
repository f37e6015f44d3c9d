//! Text rasterization for title/subtitle overlays.
//!
//! Produces a transparent, word-wrapped image with the classic cheap outline:
//! two 1-px offset passes in the shadow color, then the fill pass on top.

use std::path::Path;
use std::sync::Arc;

use crate::foundation::core::Rgb8;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::composite;

/// Extra pixels between wrapped lines.
const LINE_GAP: u32 = 6;
/// Total vertical margin added to the image height.
const V_MARGIN: u32 = 10;
/// Top inset of the first line.
const TOP_OFFSET: i64 = 5;

/// A rasterized text block: row-major premultiplied RGBA8 with transparency.
#[derive(Clone, Debug)]
pub struct TextImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Vec<u8>,
}

/// Load a TTF/OTF font, failing fast when the file is missing or unparsable.
///
/// Fallback selection happens in the config layer; by the time this runs the
/// path is the one the render will use.
pub fn load_font(path: &Path) -> ReelResult<Arc<fontdue::Font>> {
    let bytes = std::fs::read(path)
        .map_err(|e| ReelError::raster(format!("font not found '{}': {e}", path.display())))?;
    let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
        .map_err(|e| ReelError::raster(format!("failed to parse font '{}': {e}", path.display())))?;
    Ok(Arc::new(font))
}

/// Rasterize `text` word-wrapped to `max_width`, centered per line, with the
/// two-offset-pass stroke under the fill.
pub fn render_text(
    text: &str,
    font: &fontdue::Font,
    size_px: f32,
    max_width: u32,
    fill: Rgb8,
    stroke: Rgb8,
) -> ReelResult<TextImage> {
    if !size_px.is_finite() || size_px <= 0.0 {
        return Err(ReelError::raster("text size_px must be finite and > 0"));
    }
    if max_width == 0 {
        return Err(ReelError::raster("text max_width must be > 0"));
    }

    let lines = wrap_lines(text, max_width as f32, |s| measure_width(font, size_px, s));

    let metrics = font
        .horizontal_line_metrics(size_px)
        .ok_or_else(|| ReelError::raster("font has no horizontal line metrics"))?;
    let line_height = (metrics.ascent - metrics.descent).ceil() as u32 + LINE_GAP;

    let width = max_width;
    let height = line_height * lines.len() as u32 + V_MARGIN;
    let mut image = TextImage {
        width,
        height,
        rgba8_premul: vec![0u8; width as usize * height as usize * 4],
    };

    let mut y = TOP_OFFSET;
    for line in &lines {
        let line_w = measure_width(font, size_px, line);
        let x = ((width as f32 - line_w) / 2.0).round() as i64;
        // Offset shadow passes, then fill. Deliberately not a true outline.
        draw_line(&mut image, font, size_px, metrics.ascent, line, x - 1, y - 1, stroke);
        draw_line(&mut image, font, size_px, metrics.ascent, line, x + 1, y + 1, stroke);
        draw_line(&mut image, font, size_px, metrics.ascent, line, x, y, fill);
        y += i64::from(line_height);
    }

    Ok(image)
}

/// Greedy word wrap: append words while the measured line stays within
/// `max_width`. A single word wider than `max_width` gets its own line,
/// unbroken.
pub fn wrap_lines(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let test = if cur.is_empty() {
            word.to_string()
        } else {
            format!("{cur} {word}")
        };
        if measure(&test) <= max_width {
            cur = test;
        } else {
            if !cur.is_empty() {
                lines.push(cur);
            }
            cur = word.to_string();
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

fn measure_width(font: &fontdue::Font, size_px: f32, s: &str) -> f32 {
    s.chars()
        .map(|c| font.metrics(c, size_px).advance_width)
        .sum()
}

#[allow(clippy::too_many_arguments)]
fn draw_line(
    image: &mut TextImage,
    font: &fontdue::Font,
    size_px: f32,
    ascent: f32,
    line: &str,
    x: i64,
    y: i64,
    color: Rgb8,
) {
    let mut cursor = x as f32;
    for ch in line.chars() {
        let (metrics, coverage) = font.rasterize(ch, size_px);
        let gx = cursor.round() as i64 + i64::from(metrics.xmin);
        let gy = y + (ascent.round() as i64) - (metrics.height as i64 + i64::from(metrics.ymin));
        blend_glyph(image, &coverage, metrics.width, metrics.height, gx, gy, color);
        cursor += metrics.advance_width;
    }
}

fn blend_glyph(
    image: &mut TextImage,
    coverage: &[u8],
    glyph_w: usize,
    glyph_h: usize,
    x: i64,
    y: i64,
    color: Rgb8,
) {
    let iw = i64::from(image.width);
    let ih = i64::from(image.height);

    for gy in 0..glyph_h as i64 {
        let py = y + gy;
        if py < 0 || py >= ih {
            continue;
        }
        for gx in 0..glyph_w as i64 {
            let px = x + gx;
            if px < 0 || px >= iw {
                continue;
            }
            let a = coverage[gy as usize * glyph_w + gx as usize];
            if a == 0 {
                continue;
            }
            let src = premul(color, a);
            let di = (py as usize * image.width as usize + px as usize) * 4;
            let dst = [
                image.rgba8_premul[di],
                image.rgba8_premul[di + 1],
                image.rgba8_premul[di + 2],
                image.rgba8_premul[di + 3],
            ];
            image.rgba8_premul[di..di + 4].copy_from_slice(&composite::over(dst, src));
        }
    }
}

fn premul(color: Rgb8, a: u8) -> [u8; 4] {
    let m = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
    [m(color.r), m(color.g), m(color.b), a]
}
