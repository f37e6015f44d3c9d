//! End-to-end render orchestration.
//!
//! Stage order is fixed: background, text layers, progress bar, audio,
//! encode. Frame production may fan out over a rayon pool (frames are pure
//! functions of time) while a dedicated encoder thread restores strict
//! frame order at the sink boundary, so the output is identical to a
//! sequential run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::audio::assemble_audio;
use crate::audio::track::write_f32le_file;
use crate::audio::tts::{SpeechSynthesizer, TempFileGuard};
use crate::config::RenderConfig;
use crate::content::ContentPayload;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::Frame;
use crate::scene::{Scene, SceneRenderer};

/// Options controlling one render invocation.
#[derive(Clone, Debug)]
pub struct RenderOpts {
    /// Directory holding `background.*`, `music.*` and `fonts/`.
    pub assets_dir: PathBuf,
    /// Directory the dated output file is written to.
    pub out_dir: PathBuf,
    /// Enable frame-level parallelism.
    pub parallel: bool,
    /// Worker thread override; `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Bounded channel capacity between workers and the encoder thread.
    pub channel_capacity: usize,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            out_dir: PathBuf::from("output"),
            parallel: true,
            threads: None,
            channel_capacity: 4,
        }
    }
}

/// A finished render: the encoded output file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderResult {
    pub out_path: PathBuf,
}

/// Deterministic output name for a render date: `daily_YYYY-MM-DD.mp4`.
/// Re-rendering the same UTC date overwrites the prior file.
pub fn output_path(out_dir: &Path, date: NaiveDate) -> PathBuf {
    out_dir.join(format!("daily_{}.mp4", date.format("%Y-%m-%d")))
}

/// Render one dated clip: compose the scene, assemble audio, encode MP4.
pub fn render(
    cfg: &RenderConfig,
    content: &ContentPayload,
    date: NaiveDate,
    opts: &RenderOpts,
    tts: Option<&dyn SpeechSynthesizer>,
) -> ReelResult<RenderResult> {
    info!(title = %content.title, date = %date, "starting render");

    let scene = Arc::new(Scene::build(cfg, content, &opts.assets_dir)?);
    debug!(
        frames = scene.frame_count(),
        width = cfg.canvas.width,
        height = cfg.canvas.height,
        "scene composed"
    );

    let narration = cfg.use_tts.then(|| content.narration());
    let music_path = existing_music(&opts.assets_dir);
    let track = assemble_audio(
        narration.as_deref(),
        music_path.as_deref(),
        cfg.duration_sec,
        &cfg.voice_lang,
        cfg.music_volume,
        tts,
    );

    // The mixed PCM goes through a scratch file handed to ffmpeg as a second
    // input; the guard removes it on every exit path.
    let mut audio_tmp = TempFileGuard::none();
    let audio_cfg = match track {
        Some(track) => {
            let path = std::env::temp_dir().join(format!(
                "dailyreel_audio_mix_{}_{}.f32le",
                std::process::id(),
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or(0)
            ));
            write_f32le_file(&track.samples, &path)?;
            audio_tmp.0 = Some(path.clone());
            debug!(seconds = track.duration_sec(), "audio track assembled");
            Some(AudioInputConfig {
                path,
                sample_rate: track.sample_rate,
                channels: track.channels,
            })
        }
        None => {
            debug!("no audio track, encoding silent output");
            None
        }
    };

    let out_path = output_path(&opts.out_dir, date);
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(out_path.clone()));
    render_into_sink(&scene, audio_cfg, &mut sink, opts)?;

    info!(path = %out_path.display(), "render finished");
    Ok(RenderResult { out_path })
}

/// Stream every scene frame, in order, into `sink`.
pub fn render_into_sink(
    scene: &Arc<Scene>,
    audio: Option<AudioInputConfig>,
    sink: &mut dyn FrameSink,
    opts: &RenderOpts,
) -> ReelResult<()> {
    let frame_count = scene.frame_count();
    if frame_count == 0 {
        return Err(ReelError::config("render duration yields zero frames"));
    }

    let cfg = SinkConfig {
        width: scene.canvas.width,
        height: scene.canvas.height,
        fps: scene.fps,
        audio,
    };

    if !opts.parallel {
        sink.begin(cfg)?;
        let mut renderer = SceneRenderer::new(scene.clone());
        for f in 0..frame_count {
            let frame = renderer.render_frame(FrameIndex(f))?;
            sink.push_frame(FrameIndex(f), &frame)?;
        }
        return sink.end();
    }

    let pool = build_thread_pool(opts.threads)?;
    let cap = opts.channel_capacity.max(1);

    // Encoder thread restores strict frame order regardless of worker
    // completion order; the bounded channel provides backpressure.
    std::thread::scope(|scope| -> ReelResult<()> {
        let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
        let sink_ref: &mut dyn FrameSink = sink;

        let enc = scope.spawn(move || -> ReelResult<()> {
            sink_ref.begin(cfg)?;

            let mut next = 0u64;
            let mut pending = HashMap::<u64, Frame>::new();
            while next < frame_count {
                if let Some(frame) = pending.remove(&next) {
                    sink_ref.push_frame(FrameIndex(next), &frame)?;
                    next += 1;
                    continue;
                }

                let msg = rx
                    .recv()
                    .map_err(|_| ReelError::encode("encoder channel disconnected unexpectedly"))?;
                pending.insert(msg.idx.0, msg.frame);

                while let Some(frame) = pending.remove(&next) {
                    sink_ref.push_frame(FrameIndex(next), &frame)?;
                    next += 1;
                    if next >= frame_count {
                        break;
                    }
                }
            }

            sink_ref.end()
        });

        let produce_res = pool.install(|| {
            (0..frame_count).into_par_iter().try_for_each_init(
                || (SceneRenderer::new(scene.clone()), tx.clone()),
                |(renderer, tx), f| -> ReelResult<()> {
                    let frame = renderer.render_frame(FrameIndex(f))?;
                    tx.send(FrameMsg {
                        idx: FrameIndex(f),
                        frame,
                    })
                    .map_err(|_| ReelError::encode("encoder thread is not accepting frames"))
                },
            )
        });

        drop(tx);
        let enc_res = enc
            .join()
            .map_err(|_| ReelError::encode("encoder thread panicked"))?;

        match (produce_res, enc_res) {
            (Ok(()), r) => r,
            (Err(e), Ok(())) => Err(e),
            // Both sides failed: the channel-plumbing error is secondary to
            // whichever side hit the real problem.
            (Err(produce_err), Err(enc_err)) => {
                if matches!(&enc_err, ReelError::Encode(m) if m.contains("disconnected")) {
                    Err(produce_err)
                } else {
                    Err(enc_err)
                }
            }
        }
    })
}

fn existing_music(assets_dir: &Path) -> Option<PathBuf> {
    ["music.mp3", "music.wav", "music.ogg"]
        .iter()
        .map(|name| assets_dir.join(name))
        .find(|path| path.exists())
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ReelError::config("render 'threads' must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ReelError::encode(format!("failed to build rayon thread pool: {e}")))
}

#[derive(Debug)]
struct FrameMsg {
    idx: FrameIndex,
    frame: Frame,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::sink::InMemorySink;
    use crate::foundation::core::{Canvas, Fps, Rgb8};
    use crate::scene::background::BackgroundSource;
    use crate::scene::progress::ProgressBar;

    fn test_scene(duration: f64) -> Arc<Scene> {
        let canvas = Canvas::new(32, 64).unwrap();
        Arc::new(Scene {
            canvas,
            fps: Fps::new(10, 1).unwrap(),
            duration_sec: duration,
            background: BackgroundSource::Solid(Rgb8::new(10, 10, 10)),
            overlays: Vec::new(),
            progress: ProgressBar::new(canvas, duration, Rgb8::new(200, 0, 0), Rgb8::new(40, 40, 40)),
        })
    }

    fn opts(parallel: bool) -> RenderOpts {
        RenderOpts {
            parallel,
            threads: parallel.then_some(2),
            ..RenderOpts::default()
        }
    }

    #[test]
    fn output_name_is_utc_date_deterministic() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        let p = output_path(Path::new("out"), date);
        assert_eq!(p, Path::new("out/daily_2026-08-08.mp4"));
        assert_eq!(p, output_path(Path::new("out"), date));
    }

    #[test]
    fn sequential_sink_receives_all_frames_in_order() {
        let scene = test_scene(2.0);
        let mut sink = InMemorySink::new();
        render_into_sink(&scene, None, &mut sink, &opts(false)).unwrap();

        assert_eq!(sink.frames().len(), 20);
        for (i, (idx, frame)) in sink.frames().iter().enumerate() {
            assert_eq!(idx.0, i as u64);
            assert_eq!((frame.width, frame.height), (32, 64));
        }
    }

    #[test]
    fn parallel_matches_sequential_output() {
        let scene = test_scene(2.0);

        let mut seq = InMemorySink::new();
        render_into_sink(&scene, None, &mut seq, &opts(false)).unwrap();

        let mut par = InMemorySink::new();
        render_into_sink(&scene, None, &mut par, &opts(true)).unwrap();

        assert_eq!(seq.frames().len(), par.frames().len());
        for ((ia, fa), (ib, fb)) in seq.frames().iter().zip(par.frames().iter()) {
            assert_eq!(ia, ib);
            assert_eq!(fa.data, fb.data);
        }
    }

    #[test]
    fn zero_duration_scene_is_rejected() {
        let scene = test_scene(0.0);
        let mut sink = InMemorySink::new();
        let err = render_into_sink(&scene, None, &mut sink, &opts(false)).unwrap_err();
        assert!(err.to_string().contains("zero frames"));
    }
}
