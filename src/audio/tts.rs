//! Text-to-speech seam.
//!
//! Synthesis is an external collaborator reached through a subprocess; the
//! assembler treats any failure here as "no voice track".

use std::path::PathBuf;
use std::process::Command;

use crate::foundation::error::{ReelError, ReelResult};

/// External speech synthesis: text + language in, audio file out.
pub trait SpeechSynthesizer {
    fn synthesize(&self, text: &str, lang: &str) -> ReelResult<PathBuf>;
}

/// Synthesizer that shells out to a configured command line.
///
/// The template is split on whitespace; `{text}`, `{lang}` and `{out}` are
/// substituted per call, e.g. `espeak-ng -v {lang} -w {out} {text}`. The
/// command must create the `{out}` file on success.
#[derive(Clone, Debug)]
pub struct CommandSynthesizer {
    argv: Vec<String>,
}

impl CommandSynthesizer {
    pub fn from_template(template: &str) -> ReelResult<Self> {
        let argv: Vec<String> = template.split_whitespace().map(str::to_string).collect();
        if argv.is_empty() {
            return Err(ReelError::config("tts command template is empty"));
        }
        if !argv.iter().any(|a| a.contains("{out}")) {
            return Err(ReelError::config(
                "tts command template must contain an {out} placeholder",
            ));
        }
        Ok(Self { argv })
    }

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!(
            "dailyreel_tts_{}_{}.wav",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ))
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn synthesize(&self, text: &str, lang: &str) -> ReelResult<PathBuf> {
        let out_path = Self::scratch_path();
        let out_str = out_path.to_string_lossy();

        let substituted: Vec<String> = self.argv[1..]
            .iter()
            .map(|a| {
                a.replace("{text}", text)
                    .replace("{lang}", lang)
                    .replace("{out}", &out_str)
            })
            .collect();

        let status = Command::new(&self.argv[0])
            .args(&substituted)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map_err(|e| ReelError::media(format!("failed to run tts command: {e}")))?;

        if !status.success() {
            let _ = std::fs::remove_file(&out_path);
            return Err(ReelError::media(format!(
                "tts command exited with status {status}"
            )));
        }
        if !out_path.exists() {
            return Err(ReelError::media(
                "tts command succeeded but produced no output file",
            ));
        }
        Ok(out_path)
    }
}

/// Remove a scratch file when the guard drops, on every exit path.
pub struct TempFileGuard(pub Option<PathBuf>);

impl TempFileGuard {
    pub fn none() -> Self {
        Self(None)
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
