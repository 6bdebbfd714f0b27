//! winrec command-line interface
//!
//! `winrec targets` lists capturable windows; `winrec record` captures a
//! window or the primary screen into an MP4 until stopped.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use winrec::recorder::format_elapsed;
use winrec::{
    ffmpeg_available, platform_locator, platform_source, FfmpegSinkFactory, RecordingConfig,
    RecordingCoordinator, RecordingEvent, RecordingTarget, DEFAULT_FPS,
};

#[derive(Parser)]
#[command(name = "winrec")]
#[command(version)]
#[command(about = "Records a window or the primary screen to an MP4 file")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List windows available for capture
    Targets,

    /// Record a window or the primary screen
    Record {
        /// Title of the window to record; exact match first, then
        /// case-insensitive substring
        #[arg(long, conflicts_with = "screen")]
        window: Option<String>,

        /// Record the primary screen instead of a window
        #[arg(long)]
        screen: bool,

        /// Output directory; defaults to the user's videos directory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output file name; defaults to a timestamped name
        #[arg(long)]
        name: Option<String>,

        /// Capture rate in frames per second
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,

        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Status output goes to stdout, so logs stay on stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "winrec=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Targets => list_targets(),
        Command::Record {
            window,
            screen,
            dir,
            name,
            fps,
            duration,
        } => record(window, screen, dir, name, fps, duration).await,
    }
}

fn list_targets() -> anyhow::Result<()> {
    let locator =
        platform_locator().context("window capture is not supported on this platform")?;
    let titles = locator.list_targets();
    if titles.is_empty() {
        println!("No capturable windows found.");
        return Ok(());
    }
    for title in titles {
        println!("{}", title);
    }
    Ok(())
}

async fn record(
    window: Option<String>,
    screen: bool,
    dir: Option<PathBuf>,
    name: Option<String>,
    fps: u32,
    duration: Option<u64>,
) -> anyhow::Result<()> {
    let target = if screen {
        RecordingTarget::PrimaryScreen
    } else if let Some(title) = window {
        RecordingTarget::window(title)
    } else {
        bail!("either --window or --screen must be provided");
    };

    if !ffmpeg_available() {
        bail!("ffmpeg not found. Install ffmpeg and make sure it is on PATH.");
    }

    let locator =
        platform_locator().context("window capture is not supported on this platform")?;
    let source = platform_source().context("frame capture is not supported on this platform")?;
    let mut coordinator =
        RecordingCoordinator::new(locator, source, Arc::new(FfmpegSinkFactory::new()));

    let config = RecordingConfig {
        target,
        output_dir: dir.unwrap_or_else(winrec::output::default_output_dir),
        file_name: name,
        fps,
    };
    let session = coordinator.start(config).await?;

    println!(
        "Recording {} at {} @ {}fps",
        session.target, session.frame_size, session.fps
    );
    println!("Output: {}", session.output_path.display());
    println!("Press 'p' + Enter to pause/resume, 'q' + Enter or Ctrl-C to stop.");

    let mut events = coordinator.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RecordingEvent::Elapsed { seconds } => {
                    print!("\r{}", format_elapsed(seconds));
                    let _ = std::io::stdout().flush();
                }
                RecordingEvent::Paused => println!("\nPaused"),
                RecordingEvent::Resumed => println!("Recording..."),
                RecordingEvent::Error { message } => eprintln!("\nError: {}", message),
                _ => {}
            }
        }
    });

    let stop_at = duration.map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            _ = sleep_until_opt(stop_at) => {
                println!();
                break;
            }
        };

        // EOF on stdin stops the recording, same as 'q'.
        let Some(line) = line else {
            break;
        };
        match line.trim() {
            "p" => {
                if let Err(err) = coordinator.toggle_pause() {
                    eprintln!("{}", err);
                }
            }
            "q" => break,
            "" => {}
            other => println!("Unknown command {:?} (use 'p' or 'q')", other),
        }
    }

    let result = coordinator.stop().await;
    printer.abort();

    match result {
        Some(result) => {
            println!(
                "Saved {} ({} frames, {})",
                result.output_path.display(),
                result.frames_written,
                format_elapsed(result.elapsed_seconds)
            );
        }
        None => println!("Nothing was recorded."),
    }
    Ok(())
}

async fn sleep_until_opt(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
