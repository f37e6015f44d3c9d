//! Audio track assembly primitives: exact-length looping, gain, summing mix.

use std::path::Path;

use crate::foundation::error::{ReelError, ReelResult};

/// A time-bound audio unit: interleaved f32 PCM of an exact sample length.
#[derive(Clone, Debug)]
pub struct AudioTrack {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples, `sample_frames * channels` long.
    pub samples: Vec<f32>,
}

impl AudioTrack {
    /// All-zero track covering `sample_frames` frames.
    pub fn silent(sample_rate: u32, channels: u16, sample_frames: u64) -> Self {
        Self {
            sample_rate,
            channels,
            samples: vec![0.0; sample_frames as usize * usize::from(channels)],
        }
    }

    pub fn sample_frames(&self) -> u64 {
        (self.samples.len() / usize::from(self.channels)) as u64
    }

    pub fn duration_sec(&self) -> f64 {
        self.sample_frames() as f64 / f64::from(self.sample_rate)
    }

    /// Add `src` (same layout) into this track, sample by sample. `src`
    /// shorter than the track contributes only its prefix; longer is
    /// truncated.
    pub fn mix_in(&mut self, src: &[f32], gain: f32) {
        let n = self.samples.len().min(src.len());
        for i in 0..n {
            self.samples[i] += src[i] * gain;
        }
    }

    /// Clamp all samples into `[-1, 1]` after mixing.
    pub fn clamp(&mut self) {
        for s in &mut self.samples {
            *s = s.clamp(-1.0, 1.0);
        }
    }
}

/// Number of sample frames covering `duration_sec` at `sample_rate`.
pub fn target_sample_frames(duration_sec: f64, sample_rate: u32) -> u64 {
    (duration_sec * f64::from(sample_rate)).round().max(0.0) as u64
}

/// Repeat `src` end-to-end (plain concatenation, no crossfade) until it
/// covers `target_frames`, then truncate to exactly that length. Longer
/// sources truncate directly.
pub fn loop_to_frames(src: &[f32], channels: u16, target_frames: u64) -> Vec<f32> {
    let target_len = target_frames as usize * usize::from(channels);
    if src.is_empty() || target_len == 0 {
        return vec![0.0; target_len];
    }

    let mut out = Vec::with_capacity(target_len);
    while out.len() < target_len {
        let remaining = target_len - out.len();
        let take = remaining.min(src.len());
        out.extend_from_slice(&src[..take]);
    }
    out
}

/// Write interleaved f32 PCM to a raw little-endian `.f32le` file.
pub fn write_f32le_file(samples: &[f32], out_path: &Path) -> ReelResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ReelError::media(format!(
                "failed to create audio output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples.len() * 4);
    for &sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ReelError::media(format!(
            "failed to write audio file '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_frames_rounds_to_nearest() {
        assert_eq!(target_sample_frames(12.0, 48_000), 576_000);
        assert_eq!(target_sample_frames(0.5, 48_000), 24_000);
        assert_eq!(target_sample_frames(-1.0, 48_000), 0);
    }

    #[test]
    fn loop_shorter_source_repeats_without_gaps() {
        // 4 "seconds" of stereo at rate 1: 4 frames.
        let src = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let out = loop_to_frames(&src, 2, 12);
        assert_eq!(out.len(), 24);
        // Three full repetitions, seam-free.
        assert_eq!(&out[0..8], &src[..]);
        assert_eq!(&out[8..16], &src[..]);
        assert_eq!(&out[16..24], &src[..]);
    }

    #[test]
    fn loop_truncates_longer_source() {
        let src: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let out = loop_to_frames(&src, 2, 10);
        assert_eq!(out.len(), 20);
        assert_eq!(out, src[..20]);
    }

    #[test]
    fn loop_with_partial_final_repetition() {
        let src = vec![1.0, 2.0];
        let out = loop_to_frames(&src, 1, 5);
        assert_eq!(out, vec![1.0, 2.0, 1.0, 2.0, 1.0]);
    }

    #[test]
    fn empty_source_yields_silence() {
        let out = loop_to_frames(&[], 2, 4);
        assert_eq!(out, vec![0.0; 8]);
    }

    #[test]
    fn mix_applies_gain_and_clamp() {
        let mut track = AudioTrack::silent(48_000, 2, 2);
        track.mix_in(&[0.5, 0.5, 0.5, 0.5], 1.0);
        track.mix_in(&[10.0, -10.0, 0.1, 0.1], 0.12);
        track.clamp();
        assert!((track.samples[0] - (0.5f32 + 1.2).clamp(-1.0, 1.0)).abs() < 1e-6);
        assert!((track.samples[1] - (0.5f32 - 1.2).clamp(-1.0, 1.0)).abs() < 1e-6);
        assert!(track.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn silent_track_duration_is_exact() {
        let track = AudioTrack::silent(48_000, 2, 576_000);
        assert_eq!(track.sample_frames(), 576_000);
        assert!((track.duration_sec() - 12.0).abs() < 1e-9);
    }
}
