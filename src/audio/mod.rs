//! Audio assembly: optional voice narration plus looped background music,
//! mixed into one composite track of exactly the render duration.

pub mod track;
pub mod tts;

use std::path::Path;

use tracing::{debug, warn};

use crate::assets::media::{MIX_CHANNELS, MIX_SAMPLE_RATE, decode_audio_f32_stereo};
use crate::audio::track::{AudioTrack, loop_to_frames, target_sample_frames};
use crate::audio::tts::{SpeechSynthesizer, TempFileGuard};

/// Build the composite audio track.
///
/// Voice comes from `tts` when narration text is given; music from
/// `music_path`, gain-scaled and looped/truncated to the exact target
/// length. Every failure on either source is recovered locally: the result
/// is `None` only when no source produced audio, and a silent render is
/// valid. The TTS scratch file is removed on all paths.
pub fn assemble_audio(
    narration: Option<&str>,
    music_path: Option<&Path>,
    duration_sec: f64,
    voice_lang: &str,
    music_volume: f32,
    tts: Option<&dyn SpeechSynthesizer>,
) -> Option<AudioTrack> {
    let target_frames = target_sample_frames(duration_sec, MIX_SAMPLE_RATE);
    let mut mixed = AudioTrack::silent(MIX_SAMPLE_RATE, MIX_CHANNELS, target_frames);
    let mut have_audio = false;

    if let (Some(text), Some(tts)) = (narration, tts) {
        match synthesize_voice(tts, text, voice_lang) {
            Some(voice) => {
                // Voice plays from t = 0; anything past the render duration
                // is dropped by the fixed-length mix.
                mixed.mix_in(&voice, 1.0);
                have_audio = true;
            }
            None => {
                warn!("continuing without voice track");
            }
        }
    }

    if let Some(path) = music_path {
        match decode_audio_f32_stereo(path, MIX_SAMPLE_RATE) {
            Ok(pcm) if !pcm.is_empty() => {
                debug!(
                    path = %path.display(),
                    native_sec = pcm.duration_sec(),
                    target_sec = duration_sec,
                    "looping music to target duration"
                );
                let looped = loop_to_frames(&pcm.interleaved_f32, MIX_CHANNELS, target_frames);
                mixed.mix_in(&looped, music_volume);
                have_audio = true;
            }
            Ok(_) => {
                warn!(path = %path.display(), "music file has no audio stream, skipping");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "music load failed, continuing without music");
            }
        }
    }

    if !have_audio {
        return None;
    }
    mixed.clamp();
    Some(mixed)
}

fn synthesize_voice(tts: &dyn SpeechSynthesizer, text: &str, lang: &str) -> Option<Vec<f32>> {
    let path = match tts.synthesize(text, lang) {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "tts synthesis failed");
            return None;
        }
    };
    // The scratch file is removed on every path out of this function.
    let _scratch = TempFileGuard(Some(path.clone()));

    match decode_audio_f32_stereo(&path, MIX_SAMPLE_RATE) {
        Ok(pcm) if !pcm.is_empty() => Some(pcm.interleaved_f32),
        Ok(_) => {
            warn!(path = %path.display(), "synthesized voice file is empty");
            None
        }
        Err(e) => {
            warn!(error = %e, "failed to decode synthesized voice");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::error::{ReelError, ReelResult};
    use std::path::PathBuf;

    struct FailingTts;

    impl SpeechSynthesizer for FailingTts {
        fn synthesize(&self, _text: &str, _lang: &str) -> ReelResult<PathBuf> {
            Err(ReelError::media("synthetic failure"))
        }
    }

    #[test]
    fn no_sources_yields_no_track() {
        assert!(assemble_audio(None, None, 12.0, "en", 0.12, None).is_none());
    }

    #[test]
    fn tts_failure_alone_yields_no_track() {
        let tts = FailingTts;
        let out = assemble_audio(Some("hello"), None, 12.0, "en", 0.12, Some(&tts));
        assert!(out.is_none());
    }

    #[test]
    fn narration_without_synthesizer_yields_no_track() {
        assert!(assemble_audio(Some("hello"), None, 12.0, "en", 0.12, None).is_none());
    }
}
