//! Binary entrypoint for the art display.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use art_display::config::Configuration;
use art_display::fault_log;
use art_display::platform::{buttons, panel};
use art_display::queue::ImageQueue;
use art_display::render::Renderer;
use art_display::render::fonts::Fonts;
use art_display::scan::Scanner;
use art_display::tasks::controller::{Controller, LocalClock, LoopSettings};

#[derive(Debug, Parser)]
#[command(
    name = "art-display",
    version,
    about = "Shuffled image queue for an e-paper frame"
)]
struct Args {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("art_display={level}")))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args { config, verbose } = Args::parse();
    init_tracing(verbose)?;

    let cfg = if config.exists() {
        Configuration::from_yaml_file(&config)
            .with_context(|| format!("failed to load configuration from {}", config.display()))?
    } else {
        warn!(path = %config.display(), "config file not found; using defaults");
        Configuration::default()
    };
    let cfg = cfg.validated().context("invalid configuration values")?;
    info!("Loaded configuration:\n{:#?}", cfg);

    let failure_log = cfg.failure_log.clone();
    let result = run(cfg).await;
    if let Err(err) = &result {
        error!("fault; stopping: {err:#}");
        if let Err(log_err) = fault_log::append(&failure_log, err) {
            error!(path = %failure_log.display(), "failed to write failure log: {log_err}");
        }
    }
    result
}

async fn run(cfg: Configuration) -> Result<()> {
    let panel = panel::open_panel(&cfg.panel)?;
    let fonts = Fonts::load(&cfg.font_path, cfg.caption_font_px, cfg.message_font_px)
        .with_context(|| format!("failed to load font {}", cfg.font_path.display()))?;
    let renderer = Renderer::new(panel, fonts, cfg.version.clone());
    let buttons = buttons::open_buttons(&cfg.buttons).context("failed to open buttons")?;
    let queue = ImageQueue::new(Scanner::new(&cfg.share_path, &cfg.extensions))
        .with_seed(cfg.shuffle_seed);
    let settings = LoopSettings {
        poll_interval: cfg.poll_interval,
        message_pause: cfg.message_pause,
        version: cfg.version.clone(),
    };
    let mut controller = Controller::new(renderer, buttons, LocalClock, queue, settings);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; shutting down");
            cancel.cancel();
        });
    }

    tokio::task::spawn_blocking(move || controller.run_and_release(&cancel))
        .await
        .map_err(|err| anyhow!("control loop task failed: {err}"))?
}
