//! Record a display or window.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use screenrec_capture_engine::backend::FakeBackend;
use screenrec_capture_engine::engine::FakeEngine;
use screenrec_capture_engine::permission::StaticPermissions;
use screenrec_capture_engine::{RecordOptions, Recorder};
use screenrec_common::config::AppConfig;
use screenrec_platform_core::NativeId;

pub struct RecordArgs {
    pub output: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub display: Option<NativeId>,
    pub window: Option<NativeId>,
    pub duration: Option<u64>,
    pub dry_run: bool,
}

pub async fn run(config: &AppConfig, args: RecordArgs) -> anyhow::Result<()> {
    let mut recorder = if args.dry_run {
        Recorder::new(
            Arc::new(FakeEngine::new()),
            Arc::new(FakeBackend::single_display()),
            Box::new(StaticPermissions(true)),
            config,
        )
    } else {
        Recorder::with_system_defaults(config)
    };

    if !recorder.check_permission() && !recorder.request_permission() {
        tracing::warn!("Screen recording permission is not granted");
    }

    let options = RecordOptions {
        width: args.width,
        height: args.height,
        fps: args.fps,
        display_id: args.display,
        window_id: args.window,
    };

    println!("Starting recording: {}", args.output.display());
    println!("  Engine: {}", recorder.engine_version());
    match (&options.window_id, &options.display_id) {
        (Some(window), _) => println!("  Window: {window}"),
        (None, Some(display)) => println!("  Display: {display}"),
        (None, None) => println!("  Display: primary"),
    }
    println!();

    recorder
        .engine_init()
        .context("Failed to initialize the capture engine")?;
    recorder
        .start_recording(&args.output, &options)
        .with_context(|| format!("Failed to start recording to {}", args.output.display()))?;

    match args.duration {
        Some(secs) => {
            println!("Recording for {secs}s (Ctrl+C to stop early)...");
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                result = tokio::signal::ctrl_c() => result?,
            }
        }
        None => {
            println!("Press Ctrl+C to stop recording...");
            tokio::signal::ctrl_c().await?;
        }
    }

    let elapsed = recorder.status().elapsed_secs.unwrap_or_default();
    recorder.stop_recording();
    recorder.engine_shutdown();

    println!();
    println!(
        "Recording saved to: {} ({elapsed:.1}s)",
        args.output.display()
    );
    Ok(())
}
