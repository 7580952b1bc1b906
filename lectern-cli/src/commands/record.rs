//! Record command - run one recording session end to end

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use lectern_core::finalize::ArtifactInfo;
use lectern_core::session::Failure;
use lectern_core::shell::ShellExit;
use lectern_core::sim::SimulatedEnvironment;
use lectern_core::timer::format_elapsed;
use lectern_core::{
    CaptureMode, ConfigFile, Quality, SessionEvent, SessionShell, ShellCommand, ShellParams,
};
use serde::Serialize;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Arguments for the record command
#[derive(Args)]
pub struct RecordArgs {
    /// Capture mode (camera, screen, audio)
    #[arg(short, long, default_value = "camera")]
    mode: String,

    /// Content title, used for the download name
    #[arg(short, long, default_value = "Untitled")]
    title: String,

    /// Unit the recording belongs to
    #[arg(long, default_value = "unit-1")]
    unit_id: String,

    /// Course the unit belongs to
    #[arg(long, default_value = "course-1")]
    course_id: String,

    /// Capture quality (sd, hd, fullhd); defaults to the config file
    #[arg(short, long)]
    quality: Option<String>,

    /// Record camera/screen without audio
    #[arg(long)]
    no_audio: bool,

    /// Seconds to record before stopping (0 = until Ctrl+C)
    #[arg(short, long, default_value = "5")]
    duration: u64,

    /// Pause after this many recorded seconds
    #[arg(long)]
    pause_at: Option<u64>,

    /// How long to stay paused, in seconds
    #[arg(long, default_value = "2")]
    pause_for: u64,

    /// Bytes per simulated encoder chunk
    #[arg(long, default_value = "4096")]
    chunk_size: usize,

    /// Download the recording into this directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct RecordSummary {
    return_to: String,
    saved: bool,
    elapsed_seconds: u64,
    filename: Option<String>,
    download: Option<PathBuf>,
    artifact: Option<ArtifactInfo>,
    failure: Option<Failure>,
}

enum Wait {
    Elapsed,
    Interrupted,
    Failed(Failure),
    Finalized,
    Closed,
}

/// Watches session events while the script waits
struct Watcher {
    events: broadcast::Receiver<SessionEvent>,
    elapsed: u64,
    progress: bool,
}

impl Watcher {
    /// Wait for `limit` (None = no limit), Ctrl+C, or a terminal event
    async fn wait(&mut self, limit: Option<Duration>) -> Wait {
        let sleep = tokio::time::sleep(limit.unwrap_or_default());
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep, if limit.is_some() => return Wait::Elapsed,
                _ = signal::ctrl_c() => return Wait::Interrupted,
                event = self.events.recv() => match event {
                    Ok(SessionEvent::Tick(n)) => {
                        self.elapsed = n;
                        if self.progress {
                            print!("\r  Recording  {}  ", format_elapsed(n));
                            let _ = std::io::stdout().flush();
                        }
                    }
                    Ok(SessionEvent::Failed(failure)) => return Wait::Failed(failure),
                    Ok(SessionEvent::Finalized { .. }) => return Wait::Finalized,
                    Ok(SessionEvent::AudioUnavailable) => {
                        warn!("Audio is not available, recording video only");
                    }
                    Ok(event) => debug!("Session event: {:?}", event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!("Missed {} session events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => return Wait::Closed,
                },
            }
        }
    }
}

struct Script {
    duration: Option<Duration>,
    pause: Option<(Duration, Duration)>,
    output: Option<PathBuf>,
}

struct ScriptOutcome {
    elapsed: u64,
    failure: Option<Failure>,
}

/// Feed commands to the shell the way a user would
async fn drive(
    tx: mpsc::Sender<ShellCommand>,
    mut watcher: Watcher,
    script: Script,
) -> Result<ScriptOutcome> {
    let send = |command| {
        let tx = tx.clone();
        async move {
            tx.send(command)
                .await
                .context("Recording view closed unexpectedly")
        }
    };

    send(ShellCommand::Start).await?;

    let mut remaining = script.duration;
    let mut stop_now = false;
    // The session can finalize on its own when the source ends
    let mut finalized = false;
    if let Some((at, length)) = script.pause {
        if remaining.is_none_or(|total| at < total) {
            match watcher.wait(Some(at)).await {
                Wait::Elapsed => {
                    send(ShellCommand::Pause).await?;
                    match watcher.wait(Some(length)).await {
                        Wait::Elapsed => {}
                        Wait::Failed(failure) => {
                            return cancel(&send, watcher.elapsed, failure).await;
                        }
                        Wait::Finalized => finalized = true,
                        Wait::Interrupted | Wait::Closed => stop_now = true,
                    }
                    if !finalized {
                        send(ShellCommand::Resume).await?;
                    }
                    remaining = remaining.map(|total| total - at);
                }
                Wait::Failed(failure) => return cancel(&send, watcher.elapsed, failure).await,
                Wait::Finalized => finalized = true,
                Wait::Interrupted | Wait::Closed => stop_now = true,
            }
        }
    }

    if !stop_now && !finalized {
        match watcher.wait(remaining).await {
            Wait::Failed(failure) => return cancel(&send, watcher.elapsed, failure).await,
            Wait::Finalized => finalized = true,
            Wait::Elapsed | Wait::Interrupted | Wait::Closed => {}
        }
    }

    if !finalized {
        send(ShellCommand::Stop).await?;
        match watcher.wait(None).await {
            Wait::Finalized => {}
            Wait::Failed(failure) => return cancel(&send, watcher.elapsed, failure).await,
            Wait::Interrupted | Wait::Closed | Wait::Elapsed => {
                send(ShellCommand::Cancel).await?;
                anyhow::bail!("Recording interrupted before it was finalized");
            }
        }
    }

    if watcher.progress {
        println!();
    }

    if let Some(dir) = script.output {
        send(ShellCommand::Download(Some(dir))).await?;
    }
    send(ShellCommand::SaveAndReturn).await?;

    Ok(ScriptOutcome {
        elapsed: watcher.elapsed,
        failure: None,
    })
}

async fn cancel<F, Fut>(send: &F, elapsed: u64, failure: Failure) -> Result<ScriptOutcome>
where
    F: Fn(ShellCommand) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    send(ShellCommand::Cancel).await?;
    Ok(ScriptOutcome {
        elapsed,
        failure: Some(failure),
    })
}

/// Record one session
pub async fn record(args: RecordArgs) -> Result<()> {
    let mode: CaptureMode = args.mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let mut config = ConfigFile::load_or_default()
        .to_recorder_config()
        .context("Invalid configuration")?;
    if let Some(quality) = &args.quality {
        let quality: Quality = quality.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        config = config.with_quality(quality);
    }
    if args.no_audio {
        config = config.with_audio(false);
    }
    if args.chunk_size == 0 {
        anyhow::bail!("--chunk-size must be at least 1");
    }

    if !args.json {
        println!("Lectern - Recording\n");
        println!("Session:");
        println!("  Mode:     {}", mode);
        println!("  Title:    {}", args.title);
        if mode.has_video() {
            println!("  Quality:  {}", config.quality);
            println!("  Audio:    {}", if config.audio_enabled { "on" } else { "off" });
        }
        println!("  Flush:    every {}ms", config.flush_interval.as_millis());
        if args.duration > 0 {
            println!("  Duration: {}", format_elapsed(args.duration));
        } else {
            println!("  Duration: until Ctrl+C");
        }
        println!();
    }

    let env = SimulatedEnvironment::new().with_generated_chunks(args.chunk_size);
    let params = ShellParams::new(mode, args.title.clone(), args.unit_id, args.course_id);
    let mut shell = SessionShell::new(params, config, env).context("Invalid recorder settings")?;

    if !shell.is_supported() {
        anyhow::bail!("Recording {} is not supported here; upload a file instead", mode);
    }

    let watcher = Watcher {
        events: shell.session().subscribe(),
        elapsed: 0,
        progress: !args.json,
    };
    let script = Script {
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        pause: args
            .pause_at
            .map(|at| (Duration::from_secs(at), Duration::from_secs(args.pause_for))),
        output: args.output.clone(),
    };

    let (tx, rx) = mpsc::channel(8);
    let driver = tokio::spawn(drive(tx, watcher, script));
    let exit = shell.run(rx).await.context("Recording view failed")?;
    let outcome = driver.await.context("Recording script panicked")??;

    let download = match &args.output {
        Some(dir) if exit.target.saved => Some(downloaded(&shell, dir)?),
        _ => None,
    };
    report(&exit, &outcome, download, args.json)
}

/// The file the requested download produced
fn downloaded(shell: &SessionShell<SimulatedEnvironment>, dir: &Path) -> Result<PathBuf> {
    let failure = shell
        .failed_commands()
        .iter()
        .rev()
        .find(|(command, _)| matches!(command, ShellCommand::Download(_)));
    if let Some((_, e)) = failure {
        anyhow::bail!("Failed to download the recording to {}: {}", dir.display(), e);
    }

    shell
        .downloads()
        .last()
        .cloned()
        .with_context(|| format!("No recording was written to {}", dir.display()))
}

fn report(
    exit: &ShellExit,
    outcome: &ScriptOutcome,
    download: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let summary = RecordSummary {
        return_to: exit.target.to_string(),
        saved: exit.target.saved,
        elapsed_seconds: outcome.elapsed,
        filename: exit.filename.clone(),
        download,
        artifact: exit.artifact.as_ref().map(|a| a.info()),
        failure: outcome.failure.clone(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if let Some(failure) = &summary.failure {
        println!("Recording failed: {}", failure.message);
        println!("  Next step: {:?}", failure.action);
    } else if let Some(info) = &summary.artifact {
        println!("Recording saved!");
        println!("  Length:   {}", format_elapsed(summary.elapsed_seconds));
        println!("  Format:   {}", info.content_type);
        println!("  Size:     {} bytes", info.size_bytes);
        if let Some(filename) = &summary.filename {
            println!("  Filename: {}", filename);
        }
        if let Some(path) = &summary.download {
            println!("  Saved to: {}", path.display());
        }
    }

    println!();
    println!("Returning to {}", summary.return_to);
    Ok(())
}
