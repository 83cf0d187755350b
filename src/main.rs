use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use edge_preview_lib::camera::synthetic::SyntheticLayout;
use edge_preview_lib::diagnostics::TelemetryReport;
use edge_preview_lib::pipeline::worker::PreviewMode;
use edge_preview_lib::settings::store::SettingsStore;
use edge_preview_lib::{run, RunOptions};

#[derive(Parser)]
#[command(name = "edge-preview")]
#[command(about = "Run a synthetic camera through the edge-detection preview pipeline")]
#[command(version)]
struct Cli {
    /// Number of frames to capture
    #[arg(short, long, default_value = "300")]
    frames: u64,

    /// What to show: processed or raw
    #[arg(short, long, default_value = "processed")]
    mode: PreviewMode,

    /// Render on a headless GPU adapter
    #[arg(long)]
    gpu: bool,

    /// Hand out semi-planar frames with chroma pixel stride 2
    #[arg(long)]
    interleaved: bool,

    /// Write the last frame as viewer JSON to this path
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Downscale the exported image to at most this many pixels wide
    #[arg(long)]
    export_width: Option<u32>,

    /// Settings file (default: $EDGE_PREVIEW_SETTINGS)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Write the settings in use back to the settings file
    #[arg(long)]
    save_settings: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG controls the log level, e.g. RUST_LOG=edge_preview_lib=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let store = cli
        .settings
        .or_else(SettingsStore::path_from_env)
        .map(SettingsStore::new);
    let settings = store.as_ref().map(SettingsStore::get).unwrap_or_default();
    if cli.save_settings {
        match &store {
            Some(store) => store.save()?,
            None => return Err("--save-settings needs --settings or EDGE_PREVIEW_SETTINGS".into()),
        }
    }

    let mut options = RunOptions::new(settings);
    options.frames = Some(cli.frames);
    options.mode = cli.mode;
    options.gpu = cli.gpu;
    options.layout = if cli.interleaved {
        SyntheticLayout::Interleaved
    } else {
        SyntheticLayout::Planar
    };
    options.export = cli.export;
    options.export_max_width = cli.export_width;
    options.on_telemetry = Some(Arc::new(|report: TelemetryReport| println!("{report}")));
    options.on_error = Some(Arc::new(|message: &str| eprintln!("capture error: {message}")));

    let summary = run(options)?;

    println!("{}", summary.report);
    println!(
        "frames: {} processed, {} skipped, {} rejected | renderer: {:?}, {} uploads",
        summary.telemetry.frames_processed,
        summary.telemetry.frames_skipped,
        summary.telemetry.frames_rejected,
        summary.render.state,
        summary.render.stats.uploads,
    );
    if let Some(path) = summary.exported {
        println!("exported {}", path.display());
    }
    Ok(())
}
