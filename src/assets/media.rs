//! Media probing and decoding through the system `ffmpeg`/`ffprobe`.
//!
//! Raw pipes keep the crate free of native FFmpeg dev headers: video frames
//! arrive as rawvideo RGBA batches on stdout, audio as interleaved f32le.

use std::path::{Path, PathBuf};

use crate::foundation::error::{ReelError, ReelResult};

/// Sample rate every decoded or mixed audio stream is normalized to.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Channel count for decoded and mixed audio.
pub const MIX_CHANNELS: u16 = 2;

#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub duration_sec: f64,
    pub has_audio: bool,
}

impl VideoSourceInfo {
    pub fn source_fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }
}

/// Decoded PCM audio.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (interleaved length / channels).
    pub fn sample_frames(&self) -> usize {
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    /// Native duration in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.sample_frames() as f64 / f64::from(self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.interleaved_f32.is_empty()
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn is_ffprobe_on_path() -> bool {
    std::process::Command::new("ffprobe")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn probe_video(source_path: &Path) -> ReelResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| ReelError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::media(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::media(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ReelError::media("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| ReelError::media("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| ReelError::media("missing video height from ffprobe"))?;

    let (fps_num, fps_den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| ReelError::media("invalid video r_frame_rate"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
        has_audio,
    })
}

/// Decode `frame_count` consecutive RGBA frames starting at `start_time_sec`.
pub fn decode_video_frames_rgba8(
    source: &VideoSourceInfo,
    start_time_sec: f64,
    frame_count: u32,
) -> ReelResult<Vec<Vec<u8>>> {
    if frame_count == 0 {
        return Ok(Vec::new());
    }

    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{start_time_sec:.9}")])
        .arg("-i")
        .arg(&source.source_path)
        .args([
            "-frames:v",
            &frame_count.to_string(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::media(format!("failed to run ffmpeg for video decode: {e}")))?;

    if !out.status.success() {
        return Err(ReelError::media(format!(
            "ffmpeg video decode failed for '{}': {}",
            source.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let expected_len = source.width as usize * source.height as usize * 4;
    if expected_len == 0 {
        return Err(ReelError::media(
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }
    if out.stdout.len() < expected_len || !out.stdout.len().is_multiple_of(expected_len) {
        return Err(ReelError::media(format!(
            "decoded video batch has invalid size: got {} bytes, expected multiples of {expected_len}",
            out.stdout.len()
        )));
    }

    let available = (out.stdout.len() / expected_len).min(frame_count as usize);
    let mut frames = Vec::with_capacity(available);
    for idx in 0..available {
        let off = idx * expected_len;
        frames.push(out.stdout[off..off + expected_len].to_vec());
    }
    Ok(frames)
}

/// Decode any audio source to interleaved stereo f32 at `sample_rate`.
///
/// Sources without an audio stream decode to empty PCM rather than an error.
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> ReelResult<AudioPcm> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::media(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // ffmpeg reports a missing audio stream as an error; treat it as
        // empty PCM so silent sources stay non-fatal.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels: MIX_CHANNELS,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(ReelError::media(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(ReelError::media(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: MIX_CHANNELS,
        interleaved_f32: pcm,
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}
