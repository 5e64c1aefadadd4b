use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use pagecraft_app::{AppConfig, ExportTimeline, FrameSummary, ReplayScript, Session, ShortcutRegistry};
use pagecraft_core::Document;
use pagecraft_render::RenderMode;

#[derive(Parser, Debug)]
#[command(name = "pagecraft", version)]
struct Cli {
    /// Host configuration JSON.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print how long each page is held during export.
    Timeline(DocArgs),
    /// Apply a script of input events to a document.
    Replay(ReplayArgs),
    /// Draw one page at a point in time and print what was drawn.
    Render(RenderArgs),
    /// Draw every export frame and print one summary line per frame.
    Export(DocArgs),
    /// List keyboard shortcuts.
    Shortcuts,
}

#[derive(Parser, Debug)]
struct DocArgs {
    /// Input document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Input document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Replay script JSON.
    #[arg(long)]
    script: PathBuf,

    /// Where to write the resulting document.
    #[arg(long)]
    out: PathBuf,

    /// Also write the replay report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Edit,
    Preview,
    Export,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Page index (0-based).
    #[arg(long, default_value_t = 0)]
    page: usize,

    /// Milliseconds since the page appeared.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    #[arg(long, value_enum, default_value_t = ModeArg::Edit)]
    mode: ModeArg,

    /// Force every animation to its final state (export mode only).
    #[arg(long, default_value_t = false)]
    settle: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    match cli.cmd {
        Command::Timeline(args) => cmd_timeline(args, &config),
        Command::Replay(args) => cmd_replay(args, &config),
        Command::Render(args) => cmd_render(args, &config),
        Command::Export(args) => cmd_export(args, &config),
        Command::Shortcuts => {
            ShortcutRegistry::print_all();
            Ok(())
        }
    }
}

fn load_document(path: &Path) -> anyhow::Result<Document> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read document '{}'", path.display()))?;
    Document::from_json(&json).with_context(|| format!("parse document '{}'", path.display()))
}

fn write_json(path: &Path, json: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
    }
    std::fs::write(path, json).with_context(|| format!("write '{}'", path.display()))
}

fn cmd_timeline(args: DocArgs, config: &AppConfig) -> anyhow::Result<()> {
    let document = load_document(&args.in_path)?;
    let timeline = ExportTimeline::new(&document, config.frame_interval_ms(), config.min_page_hold_ms);
    println!("{}", serde_json::to_string_pretty(&timeline)?);
    Ok(())
}

fn cmd_replay(args: ReplayArgs, config: &AppConfig) -> anyhow::Result<()> {
    let document = load_document(&args.in_path)?;
    let script = ReplayScript::from_path(&args.script)?;
    let mut session = Session::new(document, config).context("open editor session")?;
    let report = pagecraft_app::replay(&mut session, &script)?;

    write_json(&args.out, &session.state.document.to_json()?)?;
    if let Some(path) = &args.report {
        write_json(path, &serde_json::to_string_pretty(&report)?)?;
    }
    eprintln!(
        "replayed {} step(s), {} message(s) sent, wrote {}",
        report.steps,
        report.sent.len(),
        args.out.display()
    );
    Ok(())
}

fn cmd_render(args: RenderArgs, config: &AppConfig) -> anyhow::Result<()> {
    let document = load_document(&args.in_path)?;
    let mut session = Session::new(document, config).context("open editor session")?;
    let mode = match args.mode {
        ModeArg::Edit => RenderMode::Edit,
        ModeArg::Preview => RenderMode::Preview { now_ms: args.time },
        ModeArg::Export => RenderMode::Export {
            now_ms: args.time,
            settle: args.settle,
        },
    };
    session
        .render_page(args.page, args.time, mode)
        .with_context(|| format!("render page {}", args.page))?;
    println!("{}", serde_json::to_string_pretty(&session.summary())?);
    Ok(())
}

fn cmd_export(args: DocArgs, config: &AppConfig) -> anyhow::Result<()> {
    let document = load_document(&args.in_path)?;
    let timeline = ExportTimeline::new(&document, config.frame_interval_ms(), config.min_page_hold_ms);
    let mut session = Session::new(document, config).context("open editor session")?;

    let mut lines = Vec::with_capacity(timeline.frame_count());
    session.export(&timeline, |frame, list, stats| {
        lines.push(FrameSummary::new(frame.page_index, stats, list));
    })?;
    for line in &lines {
        println!("{}", serde_json::to_string(line)?);
    }
    eprintln!("exported {} frame(s) over {:.0} ms", lines.len(), timeline.total_ms);
    Ok(())
}
