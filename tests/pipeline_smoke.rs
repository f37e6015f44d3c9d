//! End-to-end render smoke tests over synthesized media fixtures.
//!
//! These need `ffmpeg`/`ffprobe` and a system font; they skip (with a note)
//! when either is missing so CI without media tooling stays green.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::NaiveDate;

use dailyreel::assets::media::probe_video;
use dailyreel::audio::tts::SpeechSynthesizer;
use dailyreel::config::ConfigDoc;
use dailyreel::content::ContentPayload;
use dailyreel::pipeline::{self, RenderOpts};
use dailyreel::{ReelError, ReelResult};

fn ffmpeg_tools_available() -> bool {
    let ok = |bin: &str| {
        Command::new(bin)
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    };
    ok("ffmpeg") && ok("ffprobe")
}

fn system_font() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ];
    CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
}

fn synth_background(dir: &Path) {
    let status = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=64x64:rate=10",
            "-t",
            "1",
            "-pix_fmt",
            "yuv420p",
            "-c:v",
            "libx264",
        ])
        .arg(dir.join("background.mp4"))
        .status()
        .expect("run ffmpeg");
    assert!(status.success(), "ffmpeg failed creating background.mp4");
}

fn synth_music(dir: &Path) {
    let status = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:sample_rate=48000",
            "-t",
            "2",
        ])
        .arg(dir.join("music.wav"))
        .status()
        .expect("run ffmpeg");
    assert!(status.success(), "ffmpeg failed creating music.wav");
}

fn small_config(font: &Path, duration: f64) -> ConfigDoc {
    let mut doc = ConfigDoc::default();
    doc.width = 64;
    doc.height = 128;
    doc.fps = 10;
    doc.duration_seconds = duration;
    doc.title.fontsize = 16.0;
    doc.subtitle.fontsize = 12.0;
    doc.font_bold = font.display().to_string();
    doc.font_regular = font.display().to_string();
    doc
}

fn payload() -> ContentPayload {
    ContentPayload {
        title: "Smoke Test".to_string(),
        subtitle: "small but complete".to_string(),
        body: "A narration line.".to_string(),
        hashtags: vec!["#test".to_string()],
    }
}

struct FailingTts;

impl SpeechSynthesizer for FailingTts {
    fn synthesize(&self, _text: &str, _lang: &str) -> ReelResult<PathBuf> {
        Err(ReelError::media("synthetic tts outage"))
    }
}

#[test]
fn render_with_media_and_failing_tts_produces_valid_mp4() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return;
    }
    let Some(font) = system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };

    let root = tempfile::tempdir().unwrap();
    let assets = root.path().join("assets");
    std::fs::create_dir_all(&assets).unwrap();
    synth_background(&assets);
    synth_music(&assets);

    let cfg = small_config(&font, 2.0).resolve(&assets, None).unwrap();
    let opts = RenderOpts {
        assets_dir: assets,
        out_dir: root.path().join("out"),
        parallel: true,
        threads: Some(2),
        channel_capacity: 4,
    };

    let date = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
    // TTS fails: the render must still succeed, with music only.
    let result = pipeline::render(&cfg, &payload(), date, &opts, Some(&FailingTts)).unwrap();

    assert!(result.out_path.exists());
    assert_eq!(
        result.out_path.file_name().unwrap().to_str().unwrap(),
        "daily_2026-08-08.mp4"
    );

    let info = probe_video(&result.out_path).unwrap();
    assert_eq!((info.width, info.height), (64, 128));
    assert!(
        (info.duration_sec - 2.0).abs() < 0.25,
        "expected ~2s, got {}",
        info.duration_sec
    );
    assert!(info.has_audio, "music track should be muxed in");
}

#[test]
fn render_without_assets_is_silent_solid_and_valid() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return;
    }
    let Some(font) = system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };

    let root = tempfile::tempdir().unwrap();
    let assets = root.path().join("assets");
    std::fs::create_dir_all(&assets).unwrap();

    let cfg = small_config(&font, 1.0).resolve(&assets, None).unwrap();
    let opts = RenderOpts {
        assets_dir: assets,
        out_dir: root.path().join("out"),
        parallel: false,
        threads: None,
        channel_capacity: 4,
    };

    let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
    let result = pipeline::render(&cfg, &payload(), date, &opts, None).unwrap();

    let info = probe_video(&result.out_path).unwrap();
    assert_eq!((info.width, info.height), (64, 128));
    assert!(!info.has_audio, "no sources means a silent container");
}

#[test]
fn rerender_same_date_overwrites_same_file() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return;
    }
    let Some(font) = system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };

    let root = tempfile::tempdir().unwrap();
    let assets = root.path().join("assets");
    std::fs::create_dir_all(&assets).unwrap();

    let cfg = small_config(&font, 1.0).resolve(&assets, None).unwrap();
    let opts = RenderOpts {
        assets_dir: assets,
        out_dir: root.path().join("out"),
        parallel: false,
        threads: None,
        channel_capacity: 4,
    };

    let date = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
    let first = pipeline::render(&cfg, &payload(), date, &opts, None).unwrap();
    let second = pipeline::render(&cfg, &payload(), date, &opts, None).unwrap();

    assert_eq!(first.out_path, second.out_path);
    assert!(second.out_path.exists());

    let siblings: Vec<_> = std::fs::read_dir(second.out_path.parent().unwrap())
        .unwrap()
        .collect();
    assert_eq!(siblings.len(), 1, "one file per date, overwritten in place");
}
