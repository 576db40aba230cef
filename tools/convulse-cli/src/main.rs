//! Convulse CLI: live webcam + desktop composer and recorder.
//!
//! Usage:
//!   convulse run [OPTIONS]      Compose both sources and record on demand
//!   convulse check              Check system capabilities
//!   convulse layout [OPTIONS]   Print the nine placements for a source
//!   convulse prefs [--reset]    Show or reset stored layout preferences

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use convulse_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "convulse",
    about = "Compose webcam and desktop onto one canvas and record it",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the composer and read recording/layout commands from stdin
    Run {
        /// Directory recordings are saved into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Canvas width
        #[arg(long)]
        width: Option<u32>,

        /// Canvas height
        #[arg(long)]
        height: Option<u32>,

        /// Compositor refresh rate (Hz)
        #[arg(long)]
        refresh_hz: Option<u32>,

        /// Frame rate of the recorded stream
        #[arg(long)]
        capture_fps: Option<u32>,

        /// Interval between encoder data segments (ms)
        #[arg(long)]
        timeslice_ms: Option<u64>,

        /// Do not request the webcam
        #[arg(long)]
        no_webcam: bool,

        /// Do not request the desktop
        #[arg(long)]
        no_desktop: bool,

        /// Keep layout changes for this session only
        #[arg(long)]
        no_persist: bool,
    },

    /// Check system capabilities
    Check,

    /// Print where a source lands at each of the nine positions
    Layout {
        /// Source aspect ratio (width / height)
        #[arg(long, default_value = "1.7777777777777777")]
        aspect: f64,

        /// Size fraction of the canvas height
        #[arg(long, default_value = "0.3")]
        size: f64,

        /// Canvas width
        #[arg(long)]
        width: Option<u32>,

        /// Canvas height
        #[arg(long)]
        height: Option<u32>,
    },

    /// Show stored layout preferences
    Prefs {
        /// Delete every stored preference
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, config_error) = match AppConfig::try_load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    convulse_common::logging::init_logging(&logging);
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Using default configuration");
    }

    match cli.command {
        Commands::Run {
            output,
            width,
            height,
            refresh_hz,
            capture_fps,
            timeslice_ms,
            no_webcam,
            no_desktop,
            no_persist,
        } => {
            let options = commands::run::RunOptions {
                output,
                width,
                height,
                refresh_hz,
                capture_fps,
                timeslice_ms,
                webcam: !no_webcam,
                desktop: !no_desktop,
                persist: !no_persist,
            };
            commands::run::run(config, options).await
        }
        Commands::Check => commands::check::run(&config),
        Commands::Layout {
            aspect,
            size,
            width,
            height,
        } => commands::layout::run(
            aspect,
            size,
            width.unwrap_or(config.canvas.width),
            height.unwrap_or(config.canvas.height),
        ),
        Commands::Prefs { reset } => commands::prefs::run(&config, reset),
    }
}
