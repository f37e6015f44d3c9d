//! Time-driven progress bar.
//!
//! The fill is a pure function of elapsed time, recomputed per frame
//! (never pre-baked), so the bar tracks playback position exactly.

use crate::foundation::core::{Canvas, Rgb8};
use crate::render::{Frame, composite};

/// Bar strip height in pixels.
pub const BAR_HEIGHT: u32 = 18;
/// Distance between the strip and the bottom canvas edge.
pub const BOTTOM_MARGIN: u32 = 40;

/// Full-width progress strip near the bottom of the canvas.
#[derive(Clone, Copy, Debug)]
pub struct ProgressBar {
    canvas: Canvas,
    duration_sec: f64,
    fg: Rgb8,
    bg: Rgb8,
}

impl ProgressBar {
    pub fn new(canvas: Canvas, duration_sec: f64, fg: Rgb8, bg: Rgb8) -> Self {
        Self {
            canvas,
            duration_sec,
            fg,
            bg,
        }
    }

    /// Filled width at elapsed time `t`: `floor((t / duration) * width)`,
    /// clamped to `[0, width]`. Non-decreasing in `t`, 0 at `t = 0`, exactly
    /// the canvas width at `t = duration`.
    pub fn filled_px(&self, t: f64) -> u32 {
        let frac = (t / self.duration_sec).clamp(0.0, 1.0);
        ((frac * f64::from(self.canvas.width)).floor() as u32).min(self.canvas.width)
    }

    /// Draw the strip for time `t` over `frame`.
    pub fn draw(&self, frame: &mut Frame, t: f64) {
        let y = i64::from(self.canvas.height) - i64::from(BAR_HEIGHT) - i64::from(BOTTOM_MARGIN);
        let filled = self.filled_px(t);

        composite::fill_rect(frame, 0, y, self.canvas.width, BAR_HEIGHT, self.bg.to_rgba8());
        if filled > 0 {
            composite::fill_rect(frame, 0, y, filled, BAR_HEIGHT, self.fg.to_rgba8());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar() -> ProgressBar {
        ProgressBar::new(
            Canvas::new(1080, 1920).unwrap(),
            10.0,
            Rgb8::new(255, 0, 0),
            Rgb8::new(40, 40, 40),
        )
    }

    #[test]
    fn empty_at_t0_and_full_at_duration() {
        let b = bar();
        assert_eq!(b.filled_px(0.0), 0);
        assert_eq!(b.filled_px(10.0), 1080);
    }

    #[test]
    fn fill_is_monotonic_and_clamped() {
        let b = bar();
        let mut prev = 0;
        for i in 0..=200 {
            let t = 10.0 * f64::from(i) / 200.0;
            let w = b.filled_px(t);
            assert!(w >= prev, "fill must not shrink");
            prev = w;
        }
        assert_eq!(b.filled_px(-1.0), 0);
        assert_eq!(b.filled_px(99.0), 1080);
    }

    #[test]
    fn draw_splits_strip_at_fill_boundary() {
        let canvas = Canvas::new(100, 200).unwrap();
        let b = ProgressBar::new(canvas, 10.0, Rgb8::new(200, 0, 0), Rgb8::new(1, 2, 3));
        let mut frame = Frame::transparent(canvas);
        b.draw(&mut frame, 5.0);

        let y = (200 - BAR_HEIGHT - BOTTOM_MARGIN) as usize;
        let row = y * 100 * 4;
        // 50 filled pixels, then background.
        assert_eq!(&frame.data[row..row + 4], &[200, 0, 0, 255]);
        let at_49 = row + 49 * 4;
        assert_eq!(&frame.data[at_49..at_49 + 4], &[200, 0, 0, 255]);
        let at_50 = row + 50 * 4;
        assert_eq!(&frame.data[at_50..at_50 + 4], &[1, 2, 3, 255]);
        // Above the strip stays untouched.
        let above = (y - 1) * 100 * 4;
        assert_eq!(&frame.data[above..above + 4], &[0, 0, 0, 0]);
    }
}
