//! Background layer: source resolution, cover fit, and the slow zoom.
//!
//! Any source (video, still, or the solid fallback) is normalized to the
//! canvas by scale-to-height, re-scale-by-width when still narrow, then
//! center crop. On top of that sits a linear zoom from 1.0 to 1 + [`BG_ZOOM`]
//! over the render, recomputed per frame as a pure function of time.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::assets::decode::{PreparedImage, decode_image_file};
use crate::assets::media::{
    VideoSourceInfo, decode_video_frames_rgba8, is_ffprobe_on_path, probe_video,
};
use crate::foundation::core::{Canvas, Rgb8};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::Frame;

/// Zoom amount reached at `t = duration` (Ken Burns strength).
pub const BG_ZOOM: f64 = 0.03;

/// Solid fallback color when no background asset exists.
pub const FALLBACK_COLOR: Rgb8 = Rgb8::new(10, 10, 10);

/// Consecutive frames fetched per ffmpeg invocation by the frame cache.
const DECODE_BATCH: u32 = 16;

/// Resolved background content for one render.
#[derive(Clone, Debug)]
pub enum BackgroundSource {
    /// Video file, looped or truncated to the render duration.
    Video(Arc<VideoSourceInfo>),
    /// Still image held for the full duration.
    Still(Arc<PreparedImage>),
    /// Solid color for the full duration.
    Solid(Rgb8),
}

/// Resolve the background source: `background.mp4`, else `background.jpg`,
/// else the solid fallback. Unreadable files degrade with a warning; a
/// missing background is never fatal.
pub fn resolve_background(assets_dir: &Path) -> BackgroundSource {
    let mp4 = assets_dir.join("background.mp4");
    if mp4.exists() && !is_ffprobe_on_path() {
        warn!(path = %mp4.display(), "ffprobe not on PATH, ignoring background video");
    } else if mp4.exists() {
        match probe_video(&mp4) {
            Ok(info) => {
                debug!(
                    path = %mp4.display(),
                    width = info.width,
                    height = info.height,
                    duration = info.duration_sec,
                    "using video background"
                );
                return BackgroundSource::Video(Arc::new(info));
            }
            Err(e) => {
                warn!(path = %mp4.display(), error = %e, "background video unreadable, trying still");
            }
        }
    }

    let jpg = assets_dir.join("background.jpg");
    if jpg.exists() {
        match decode_image_file(&jpg) {
            Ok(img) => {
                debug!(path = %jpg.display(), "using still background");
                return BackgroundSource::Still(Arc::new(img));
            }
            Err(e) => {
                warn!(path = %jpg.display(), error = %e, "background image unreadable, using solid fallback");
            }
        }
    }

    debug!("no background asset, using solid fallback");
    BackgroundSource::Solid(FALLBACK_COLOR)
}

/// Zoom factor at time `t` of a `duration`-second render.
pub fn zoom_at(t: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return 1.0;
    }
    1.0 + BG_ZOOM * (t / duration).clamp(0.0, 1.0)
}

/// Sample a source buffer into a canvas-sized opaque frame: cover fit plus
/// `zoom`, center-anchored, bilinear.
pub fn sample_cover(src: &[u8], src_w: u32, src_h: u32, canvas: Canvas, zoom: f64) -> Frame {
    let mut frame = Frame::transparent(canvas);
    if src_w == 0 || src_h == 0 {
        return frame;
    }

    // Scale so height covers; if the result is still narrower than the
    // canvas, scale by width instead. Zoom multiplies on top.
    let mut scale = f64::from(canvas.height) / f64::from(src_h);
    if f64::from(src_w) * scale < f64::from(canvas.width) {
        scale = f64::from(canvas.width) / f64::from(src_w);
    }
    scale *= zoom.max(1.0);

    let cx = f64::from(canvas.width) / 2.0;
    let cy = f64::from(canvas.height) / 2.0;
    let sx_center = f64::from(src_w) / 2.0;
    let sy_center = f64::from(src_h) / 2.0;

    for y in 0..canvas.height {
        let sy = (f64::from(y) + 0.5 - cy) / scale + sy_center;
        let row = y as usize * canvas.width as usize * 4;
        for x in 0..canvas.width {
            let sx = (f64::from(x) + 0.5 - cx) / scale + sx_center;
            let px = bilinear_rgba(src, src_w, src_h, sx, sy);
            let di = row + x as usize * 4;
            frame.data[di..di + 4].copy_from_slice(&px);
        }
    }
    frame
}

fn bilinear_rgba(src: &[u8], src_w: u32, src_h: u32, x: f64, y: f64) -> [u8; 4] {
    let max_x = (src_w - 1) as f64;
    let max_y = (src_h - 1) as f64;
    let fx = (x - 0.5).clamp(0.0, max_x);
    let fy = (y - 0.5).clamp(0.0, max_y);

    let x0 = fx.floor() as usize;
    let y0 = fy.floor() as usize;
    let x1 = (x0 + 1).min(src_w as usize - 1);
    let y1 = (y0 + 1).min(src_h as usize - 1);
    let tx = fx - x0 as f64;
    let ty = fy - y0 as f64;

    let idx = |xx: usize, yy: usize| (yy * src_w as usize + xx) * 4;
    let p00 = idx(x0, y0);
    let p10 = idx(x1, y0);
    let p01 = idx(x0, y1);
    let p11 = idx(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(src[p00 + c]) * (1.0 - tx) + f64::from(src[p10 + c]) * tx;
        let bot = f64::from(src[p01 + c]) * (1.0 - tx) + f64::from(src[p11 + c]) * tx;
        out[c] = (top * (1.0 - ty) + bot * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Map render time onto video source time: loop by modulo when the source is
/// shorter than the render, truncate otherwise.
pub fn source_time(t: f64, native_duration: f64, source_fps: f64) -> f64 {
    if native_duration <= 0.0 {
        return t.max(0.0);
    }
    let wrapped = if t >= native_duration {
        t % native_duration
    } else {
        t
    };
    // Keep a little headroom before the last frame so seeks near EOF still
    // return a frame.
    let headroom = if source_fps > 0.0 {
        1.0 / source_fps
    } else {
        0.04
    };
    wrapped.clamp(0.0, (native_duration - headroom).max(0.0))
}

/// Per-worker decoded-frame cache over batched ffmpeg seeks.
pub struct VideoFrameCache {
    info: Arc<VideoSourceInfo>,
    frames: HashMap<u64, Arc<Vec<u8>>>,
    lru: VecDeque<u64>,
    capacity: usize,
}

impl VideoFrameCache {
    pub fn new(info: Arc<VideoSourceInfo>) -> Self {
        Self {
            info,
            frames: HashMap::new(),
            lru: VecDeque::new(),
            capacity: DECODE_BATCH as usize * 4,
        }
    }

    /// Fetch the frame at `source_time_sec`, decoding a forward batch on a
    /// cache miss.
    pub fn frame_at(&mut self, source_time_sec: f64) -> ReelResult<Arc<Vec<u8>>> {
        let key = self.key_for_time(source_time_sec);
        if let Some(frame) = self.frames.get(&key).cloned() {
            self.touch(key);
            return Ok(frame);
        }

        let batch = decode_video_frames_rgba8(&self.info, source_time_sec, DECODE_BATCH)?;
        let step = if self.info.source_fps() > 0.0 {
            1.0 / self.info.source_fps()
        } else {
            0.0
        };
        for (i, data) in batch.into_iter().enumerate() {
            let frame_key = self.key_for_time(source_time_sec + step * i as f64);
            self.insert(frame_key, Arc::new(data));
        }

        if let Some(frame) = self.frames.get(&key).cloned() {
            self.touch(key);
            return Ok(frame);
        }
        // Batch landed on other keys (variable frame timing); fall back to
        // whatever the seek produced first.
        self.lru
            .back()
            .and_then(|k| self.frames.get(k))
            .cloned()
            .ok_or_else(|| {
                ReelError::media(format!(
                    "no decodable frame at {source_time_sec:.3}s in '{}'",
                    self.info.source_path.display()
                ))
            })
    }

    fn key_for_time(&self, source_time_sec: f64) -> u64 {
        ((source_time_sec.max(0.0)) * 1000.0).round() as u64
    }

    fn insert(&mut self, key: u64, frame: Arc<Vec<u8>>) {
        self.frames.insert(key, frame);
        self.touch(key);
        while self.lru.len() > self.capacity {
            if let Some(old) = self.lru.pop_front() {
                self.frames.remove(&old);
            }
        }
    }

    fn touch(&mut self, key: u64) {
        if let Some(pos) = self.lru.iter().position(|x| *x == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key);
    }
}
