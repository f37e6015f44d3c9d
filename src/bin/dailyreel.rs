use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use dailyreel::audio::tts::{CommandSynthesizer, SpeechSynthesizer};
use dailyreel::config::{ConfigDoc, RenderConfig, default_fallback_font};
use dailyreel::content::{CatalogProvider, ContentProvider};
use dailyreel::notify::{LogNotifier, Notifier, subject_line};
use dailyreel::pipeline::{self, RenderOpts};
use dailyreel::scene::{Scene, SceneRenderer};
use dailyreel::{ContentPayload, FrameIndex};

#[derive(Parser, Debug)]
#[command(name = "dailyreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render today's clip as an MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single frame as a PNG, for inspecting the composition.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output directory for the dated MP4.
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,

    /// TTS command template with `{text}`, `{lang}` and `{out}`
    /// placeholders, e.g. `espeak-ng -v {lang} -w {out} {text}`.
    #[arg(long)]
    tts_cmd: Option<String>,

    /// Disable frame-level parallelism.
    #[arg(long)]
    sequential: bool,

    /// Worker thread count (defaults to rayon's heuristics).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Configuration document (JSON).
    #[arg(long, default_value = "templates/config.json")]
    config: PathBuf,

    /// Assets directory (`background.*`, `music.mp3`, `fonts/`).
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Content catalog (JSON array of payloads).
    #[arg(long, default_value = "templates/catalog.json")]
    catalog: PathBuf,

    /// Render date override (UTC), `YYYY-MM-DD`. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(path: &Path, assets_dir: &Path) -> anyhow::Result<RenderConfig> {
    let doc = if path.exists() {
        ConfigDoc::from_json_file(path)?
    } else {
        warn!(path = %path.display(), "config file not found, using defaults");
        ConfigDoc::default()
    };
    let fallback = default_fallback_font();
    Ok(doc.resolve(assets_dir, fallback.as_deref())?)
}

fn daily_content(common: &CommonArgs) -> (NaiveDate, ContentPayload) {
    let date = common.date.unwrap_or_else(|| Utc::now().date_naive());
    let provider = CatalogProvider::from_json_file(&common.catalog);
    (date, provider.daily_content(date))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.common.config, &args.common.assets)?;
    let (date, content) = daily_content(&args.common);

    let tts = args
        .tts_cmd
        .as_deref()
        .map(CommandSynthesizer::from_template)
        .transpose()?;
    if cfg.use_tts && tts.is_none() {
        info!("use_tts is set but no --tts-cmd given, rendering without narration");
    }

    let opts = RenderOpts {
        assets_dir: args.common.assets.clone(),
        out_dir: args.out_dir.clone(),
        parallel: !args.sequential,
        threads: args.threads,
        channel_capacity: 4,
    };

    let result = pipeline::render(
        &cfg,
        &content,
        date,
        &opts,
        tts.as_ref().map(|t| t as &dyn SpeechSynthesizer),
    )?;

    let subject = subject_line(&cfg.email_subject_prefix, &result);
    LogNotifier.deliver(&result, &subject)?;

    eprintln!("wrote {}", result.out_path.display());
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.common.config, &args.common.assets)?;
    let (_, content) = daily_content(&args.common);

    let scene = std::sync::Arc::new(Scene::build(&cfg, &content, &args.common.assets)?);
    anyhow::ensure!(
        args.frame < scene.frame_count(),
        "frame {} out of range (render has {} frames)",
        args.frame,
        scene.frame_count()
    );

    let frame = SceneRenderer::new(scene).render_frame(FrameIndex(args.frame))?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
