//! Scene model: an immutable layer stack evaluated per frame.
//!
//! A [`Scene`] describes the whole render: background, text overlays,
//! progress bar. Every layer spans the full duration. Frame pixels are
//! a pure function of time, so workers can evaluate frames in any order; the
//! mutable decode caches live in per-worker [`SceneRenderer`]s.

pub mod background;
pub mod progress;

use std::path::Path;
use std::sync::Arc;

use crate::config::RenderConfig;
use crate::content::ContentPayload;
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::ReelResult;
use crate::render::{Frame, composite};
use crate::scene::background::{BackgroundSource, VideoFrameCache, resolve_background};
use crate::scene::progress::ProgressBar;
use crate::text::{TextImage, load_font, render_text};

/// Text overlays span this fraction of the canvas width.
const TEXT_WIDTH_FRAC: f64 = 0.9;

/// A rasterized overlay at a fixed canvas offset.
#[derive(Clone, Debug)]
pub struct Overlay {
    pub image: Arc<TextImage>,
    pub x: i64,
    pub y: i64,
}

impl Overlay {
    /// Place `image` by fractional anchor: `(canvas_w - image_w) * x_frac`
    /// horizontally, `canvas_h * y_frac` vertically.
    pub fn anchored(image: TextImage, canvas: Canvas, x_frac: f64, y_frac: f64) -> Self {
        let x = ((f64::from(canvas.width) - f64::from(image.width)) * x_frac).round() as i64;
        let y = (f64::from(canvas.height) * y_frac).round() as i64;
        Self {
            image: Arc::new(image),
            x,
            y,
        }
    }
}

/// Immutable description of one render: every layer, full duration.
#[derive(Clone, Debug)]
pub struct Scene {
    pub canvas: Canvas,
    pub fps: Fps,
    pub duration_sec: f64,
    pub background: BackgroundSource,
    /// Bottom-to-top overlays (title, then subtitle).
    pub overlays: Vec<Overlay>,
    pub progress: ProgressBar,
}

impl Scene {
    /// Compose the scene for `content`: resolve the background, rasterize
    /// both text layers, and set up the progress bar.
    pub fn build(
        cfg: &RenderConfig,
        content: &ContentPayload,
        assets_dir: &Path,
    ) -> ReelResult<Scene> {
        let canvas = cfg.canvas;
        let max_text_width = (f64::from(canvas.width) * TEXT_WIDTH_FRAC) as u32;

        let bold = load_font(&cfg.font_bold)?;
        let regular = load_font(&cfg.font_regular)?;

        let title_img = render_text(
            &content.title,
            &bold,
            cfg.title.fontsize,
            max_text_width,
            cfg.text_color,
            cfg.shadow_color,
        )?;
        let subtitle_img = render_text(
            &content.subtitle,
            &regular,
            cfg.subtitle.fontsize,
            max_text_width,
            cfg.text_color,
            cfg.shadow_color,
        )?;

        Ok(Scene {
            canvas,
            fps: cfg.fps,
            duration_sec: cfg.duration_sec,
            background: resolve_background(assets_dir),
            overlays: vec![
                Overlay::anchored(title_img, canvas, cfg.title.x, cfg.title.y),
                Overlay::anchored(subtitle_img, canvas, cfg.subtitle.x, cfg.subtitle.y),
            ],
            progress: ProgressBar::new(canvas, cfg.duration_sec, cfg.progress_fg, cfg.progress_bg),
        })
    }

    /// Total frame count of the render.
    pub fn frame_count(&self) -> u64 {
        self.fps.secs_to_frames_round(self.duration_sec)
    }
}

/// Per-worker frame evaluator holding the mutable decode caches.
pub struct SceneRenderer {
    scene: Arc<Scene>,
    video_cache: Option<VideoFrameCache>,
}

impl SceneRenderer {
    pub fn new(scene: Arc<Scene>) -> Self {
        let video_cache = match &scene.background {
            BackgroundSource::Video(info) => Some(VideoFrameCache::new(info.clone())),
            _ => None,
        };
        Self { scene, video_cache }
    }

    /// Render the full composite for frame `idx`, pure in frame time.
    pub fn render_frame(&mut self, idx: FrameIndex) -> ReelResult<Frame> {
        let scene = self.scene.clone();
        let t = scene.fps.frame_to_secs(idx);
        let zoom = background::zoom_at(t, scene.duration_sec);

        let mut frame = match &scene.background {
            BackgroundSource::Solid(color) => Frame::solid(scene.canvas, *color),
            BackgroundSource::Still(img) => background::sample_cover(
                &img.rgba8_premul,
                img.width,
                img.height,
                scene.canvas,
                zoom,
            ),
            BackgroundSource::Video(info) => {
                let cache = self
                    .video_cache
                    .as_mut()
                    .expect("video cache exists for video background");
                let st = background::source_time(t, info.duration_sec, info.source_fps());
                let data = cache.frame_at(st)?;
                background::sample_cover(&data, info.width, info.height, scene.canvas, zoom)
            }
        };

        for overlay in &scene.overlays {
            composite::blit_over(
                &mut frame,
                &overlay.image.rgba8_premul,
                overlay.image.width,
                overlay.image.height,
                overlay.x,
                overlay.y,
            );
        }

        scene.progress.draw(&mut frame, t);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgb8;
    use crate::scene::background::FALLBACK_COLOR;
    use crate::scene::progress::{BAR_HEIGHT, BOTTOM_MARGIN};

    fn solid_scene(canvas: Canvas, duration: f64) -> Arc<Scene> {
        Arc::new(Scene {
            canvas,
            fps: Fps::new(30, 1).unwrap(),
            duration_sec: duration,
            background: BackgroundSource::Solid(FALLBACK_COLOR),
            overlays: Vec::new(),
            progress: ProgressBar::new(canvas, duration, Rgb8::new(250, 50, 50), Rgb8::new(30, 30, 30)),
        })
    }

    #[test]
    fn overlay_anchoring_follows_fractional_rule() {
        let canvas = Canvas::new(1080, 1920).unwrap();
        let img = TextImage {
            width: 400,
            height: 100,
            rgba8_premul: vec![0; 400 * 100 * 4],
        };
        let o = Overlay::anchored(img, canvas, 0.5, 0.12);
        assert_eq!(o.x, 340); // (1080 - 400) * 0.5
        assert_eq!(o.y, 230); // round(1920 * 0.12)
    }

    #[test]
    fn solid_background_frame_has_canvas_dims_and_fallback_color() {
        let canvas = Canvas::new(108, 192).unwrap();
        let mut renderer = SceneRenderer::new(solid_scene(canvas, 10.0));
        let frame = renderer.render_frame(FrameIndex(0)).unwrap();
        assert_eq!((frame.width, frame.height), (108, 192));
        assert_eq!(&frame.data[0..4], &[10, 10, 10, 255]);
    }

    #[test]
    fn progress_reaches_full_width_on_final_instant() {
        let canvas = Canvas::new(100, 200).unwrap();
        let scene = solid_scene(canvas, 10.0);
        let mut renderer = SceneRenderer::new(scene.clone());

        // Frame at t = duration (one past the last encoded frame) is full.
        let f = renderer.render_frame(FrameIndex(300)).unwrap();
        let y = (200 - BAR_HEIGHT - BOTTOM_MARGIN) as usize;
        let last_px = (y * 100 + 99) * 4;
        assert_eq!(&f.data[last_px..last_px + 4], &[250, 50, 50, 255]);

        // And at t = 0 the strip shows only background color.
        let f0 = renderer.render_frame(FrameIndex(0)).unwrap();
        let first_px = (y * 100) * 4;
        assert_eq!(&f0.data[first_px..first_px + 4], &[30, 30, 30, 255]);
    }

    #[test]
    fn repeated_render_of_same_frame_is_identical() {
        let canvas = Canvas::new(64, 64).unwrap();
        let scene = solid_scene(canvas, 5.0);
        let mut a = SceneRenderer::new(scene.clone());
        let mut b = SceneRenderer::new(scene);
        assert_eq!(
            a.render_frame(FrameIndex(42)).unwrap(),
            b.render_frame(FrameIndex(42)).unwrap()
        );
    }
}
