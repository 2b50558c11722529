//! Stereo Host entry point.
//!
//! ```text
//! stereo-host                      Resolve the live topology and render
//! stereo-host --fixture <path>     Resolve against a fixture TOML instead
//! stereo-host --report             Print the topology as JSON and exit
//! stereo-host --frames <n>         Stop after n frames
//! stereo-host --config <path>      Load a custom config TOML
//! stereo-host --gen-config         Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stereo_core::PresentationPlan;
use stereo_host::config::HostConfig;
use stereo_host::headless::{HeadlessStats, build_display};
use stereo_host::render::{ClearPainter, RenderLoop};
use stereo_host::startup::{resolve_topology, verify_topology};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "stereo-host", about = "Stereo display topology and presentation host")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "stereo-host.toml")]
    config: PathBuf,

    /// Resolve against a fixture TOML instead of the live system.
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    /// Print the resolved topology as JSON and exit.
    #[arg(long)]
    report: bool,

    /// Number of frames to render (overrides the config; 0 = until stopped).
    #[arg(long)]
    frames: Option<u64>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&HostConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let mut config = HostConfig::load(&cli.config);
    if let Some(frames) = cli.frames {
        config.presentation.frames = frames;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("stereo-host v{}", env!("CARGO_PKG_VERSION"));

    let fixture = cli.fixture.or_else(|| config.fixture_path());
    let topology = resolve_topology(&config, fixture.as_deref())?;

    // --report: dump the topology and exit.
    if cli.report {
        println!("{}", topology.report().to_json_pretty()?);
        return Ok(());
    }

    let plan = PresentationPlan::select(&topology, config.backend_override())?;
    let stats = Arc::new(HeadlessStats::default());
    let display = build_display(&plan, &config, &stats);

    let render = RenderLoop::new(
        display,
        ClearPainter,
        config.presentation.frames,
        config.frame_interval(),
    );
    let stop = render.stop_handle();

    // Ctrl-C handler.
    let stop_clone = Arc::clone(&stop);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop_clone.store(false, Ordering::SeqCst);
    });

    // The render loop blocks; keep it off the async workers.
    let totals = tokio::task::spawn_blocking(move || render.run()).await??;
    info!(
        "rendered {} frame(s), {} presented, {} failed submit(s), {} deadline miss(es)",
        totals.frames,
        stats.presented(),
        totals.failed_submits,
        totals.deadline_misses
    );

    if !verify_topology(&topology, fixture.as_deref()) {
        warn!("display topology changed while running; restart to pick it up");
    }

    Ok(())
}
