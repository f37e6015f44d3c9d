//! Dailyreel assembles one fixed-duration vertical short video per day:
//! a fitted, slowly zooming background, rasterized title and subtitle
//! overlays, a time-driven progress bar, and an audio bed mixed from
//! optional TTS narration and looped background music, encoded through the
//! system `ffmpeg`.
//!
//! The flow is deterministic and session-free:
//!
//! - Resolve a [`RenderConfig`] from a JSON document
//! - Obtain a [`ContentPayload`] from a [`content::ContentProvider`]
//! - Call [`pipeline::render`] to compose, mix, and encode one dated MP4
#![forbid(unsafe_code)]

mod foundation;

pub mod assets;
pub mod audio;
pub mod config;
pub mod content;
pub mod encode;
pub mod notify;
pub mod pipeline;
pub mod render;
pub mod scene;
pub mod text;

pub use crate::config::{ConfigDoc, RenderConfig};
pub use crate::content::{ContentPayload, ContentProvider};
pub use crate::foundation::core::{Canvas, Fps, FrameIndex, Rgb8};
pub use crate::foundation::error::{ReelError, ReelResult};
pub use crate::pipeline::{RenderOpts, RenderResult};
