//! Render configuration: serde document plus the resolved, validated form.
//!
//! Components never read shared config state; one immutable [`RenderConfig`]
//! is resolved up front and passed by reference through the whole render.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::foundation::core::{Canvas, Fps, Rgb8};
use crate::foundation::error::{ReelError, ReelResult};

/// Per-text-element styling: font size plus fractional anchor.
///
/// `x` positions the element as `(canvas_w - image_w) * x`; `y` as
/// `canvas_h * y`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TextElementDoc {
    pub fontsize: f32,
    pub x: f64,
    pub y: f64,
}

/// On-disk configuration document (JSON via serde).
///
/// Every field has a default so a partial document still resolves.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDoc {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_seconds: f64,
    pub text_color: String,
    pub shadow_color: String,
    pub progress_bg: String,
    pub progress_fg: String,
    pub font_bold: String,
    pub font_regular: String,
    pub title: TextElementDoc,
    pub subtitle: TextElementDoc,
    pub use_tts: bool,
    pub voice_lang: String,
    pub music_volume: f32,
    pub email_subject_prefix: String,
}

impl Default for ConfigDoc {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            duration_seconds: 12.0,
            text_color: "#FFFFFF".to_string(),
            shadow_color: "#000000".to_string(),
            progress_bg: "#303030".to_string(),
            progress_fg: "#FFD166".to_string(),
            font_bold: "fonts/DejaVuSans-Bold.ttf".to_string(),
            font_regular: "fonts/DejaVuSans.ttf".to_string(),
            title: TextElementDoc {
                fontsize: 88.0,
                x: 0.5,
                y: 0.12,
            },
            subtitle: TextElementDoc {
                fontsize: 54.0,
                x: 0.5,
                y: 0.26,
            },
            use_tts: true,
            voice_lang: "en".to_string(),
            music_volume: 0.12,
            email_subject_prefix: "Daily Reel".to_string(),
        }
    }
}

impl ConfigDoc {
    /// Read and parse a configuration document.
    pub fn from_json_file(path: &Path) -> ReelResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let doc: Self = serde_json::from_str(&content)
            .map_err(|e| ReelError::config(format!("parse config '{}': {e}", path.display())))?;
        Ok(doc)
    }

    /// Validate, parse colors, and resolve font paths into an immutable
    /// [`RenderConfig`].
    ///
    /// `fallback_font` is the caller-supplied last resort when a configured
    /// font file does not exist; with no usable font at all, resolution fails.
    pub fn resolve(
        &self,
        assets_dir: &Path,
        fallback_font: Option<&Path>,
    ) -> ReelResult<RenderConfig> {
        let canvas = Canvas::new(self.width, self.height)?;
        let fps = Fps::new(self.fps, 1)?;
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(ReelError::config("duration_seconds must be > 0"));
        }

        let music_volume = if (0.0..=1.0).contains(&self.music_volume) {
            self.music_volume
        } else {
            let clamped = self.music_volume.clamp(0.0, 1.0);
            warn!(
                configured = self.music_volume,
                clamped, "music_volume outside [0, 1], clamping"
            );
            clamped
        };

        Ok(RenderConfig {
            canvas,
            fps,
            duration_sec: self.duration_seconds,
            text_color: Rgb8::from_hex(&self.text_color)?,
            shadow_color: Rgb8::from_hex(&self.shadow_color)?,
            progress_bg: Rgb8::from_hex(&self.progress_bg)?,
            progress_fg: Rgb8::from_hex(&self.progress_fg)?,
            font_bold: resolve_font(&self.font_bold, assets_dir, fallback_font)?,
            font_regular: resolve_font(&self.font_regular, assets_dir, fallback_font)?,
            title: self.title,
            subtitle: self.subtitle,
            use_tts: self.use_tts,
            voice_lang: self.voice_lang.clone(),
            music_volume,
            email_subject_prefix: self.email_subject_prefix.clone(),
        })
    }
}

/// Resolved configuration, immutable for the duration of one render.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub canvas: Canvas,
    pub fps: Fps,
    pub duration_sec: f64,
    pub text_color: Rgb8,
    pub shadow_color: Rgb8,
    pub progress_bg: Rgb8,
    pub progress_fg: Rgb8,
    pub font_bold: PathBuf,
    pub font_regular: PathBuf,
    pub title: TextElementDoc,
    pub subtitle: TextElementDoc,
    pub use_tts: bool,
    pub voice_lang: String,
    pub music_volume: f32,
    pub email_subject_prefix: String,
}

impl RenderConfig {
    /// Total frame count of the render.
    pub fn frame_count(&self) -> u64 {
        self.fps.secs_to_frames_round(self.duration_sec)
    }
}

/// Resolve a configured font reference against the assets layout.
///
/// Order: `<assets_dir>/fonts/<basename>`, then the configured path itself,
/// then the caller-supplied fallback.
fn resolve_font(
    configured: &str,
    assets_dir: &Path,
    fallback: Option<&Path>,
) -> ReelResult<PathBuf> {
    let basename = Path::new(configured)
        .file_name()
        .ok_or_else(|| ReelError::config(format!("font path '{configured}' has no file name")))?;

    let bundled = assets_dir.join("fonts").join(basename);
    if bundled.exists() {
        return Ok(bundled);
    }

    let configured_path = PathBuf::from(configured);
    if configured_path.exists() {
        return Ok(configured_path);
    }

    if let Some(fb) = fallback
        && fb.exists()
    {
        warn!(
            configured,
            fallback = %fb.display(),
            "configured font not found, using fallback"
        );
        return Ok(fb.to_path_buf());
    }

    Err(ReelError::config(format!(
        "no usable font: '{configured}' not found and no fallback available"
    )))
}

/// Scan well-known system locations for a usable fallback font.
pub fn default_fallback_font() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ];
    CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
}
