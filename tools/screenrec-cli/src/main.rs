//! screenrec CLI: record a display or window to a media file.
//!
//! Usage:
//!   screenrec record --output <PATH>   Record until Ctrl+C
//!   screenrec displays                 List capturable displays
//!   screenrec windows                  List capturable windows
//!   screenrec check                    Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use screenrec_common::config::AppConfig;
use screenrec_platform_core::NativeId;

mod commands;

#[derive(Parser)]
#[command(
    name = "screenrec",
    about = "Record a display or window to a media file",
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
    /// Record until Ctrl+C or until the duration elapses
    Record {
        /// Output file; the extension picks the container (mp4, mov, mkv, flv)
        #[arg(short, long)]
        output: PathBuf,

        /// Output width (default from config)
        #[arg(long)]
        width: Option<u32>,

        /// Output height (default from config)
        #[arg(long)]
        height: Option<u32>,

        /// Target FPS (default from config)
        #[arg(long)]
        fps: Option<u32>,

        /// Display to record: numeric id or display UUID
        #[arg(long)]
        display: Option<NativeId>,

        /// Window to record; overrides --display
        #[arg(long)]
        window: Option<NativeId>,

        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Run the pipeline against an in-memory engine
        #[arg(long)]
        dry_run: bool,
    },

    /// List capturable displays
    Displays {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List capturable windows
    Windows {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check engine, permission and platform capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    screenrec_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Record {
            output,
            width,
            height,
            fps,
            display,
            window,
            duration,
            dry_run,
        } => {
            commands::record::run(
                &config,
                commands::record::RecordArgs {
                    output,
                    width,
                    height,
                    fps,
                    display,
                    window,
                    duration,
                    dry_run,
                },
            )
            .await
        }
        Commands::Displays { json } => commands::displays::run(json),
        Commands::Windows { json } => commands::windows::run(json),
        Commands::Check => commands::check::run(),
    }
}
