//! # Discovery Runtime
//!
//! Host side of the archive discovery engine.
//!
//! ## Control Modes
//!
//! | Mode | Input | Output |
//! |------|-------|--------|
//! | `auto` | none; INIT, CONFIG and START are sent at startup, Ctrl+C stops | events as log lines |
//! | `stdio` | one JSON command per stdin line | one JSON event per stdout line |

use anyhow::{Context, Result};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use archive_discovery::ipc::{ErrorEntry, LogEntry};
use archive_discovery::{
    decode_command, encode_event, ConfigPatch, DiscoveryConfig, DiscoveryController,
    DiscoveryHandle, Event, EventReceiver, LogLevel, SystemTimeSource, TimeSource,
};

/// How the runtime is driven.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControlMode {
    /// Start immediately and run until the budget is spent or Ctrl+C.
    #[default]
    Auto,
    /// Relay JSON lines between stdin/stdout and the engine.
    Stdio,
}

impl FromStr for ControlMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "stdio" => Ok(Self::Stdio),
            other => anyhow::bail!("unknown control mode {other:?} (expected auto or stdio)"),
        }
    }
}

/// Runtime configuration.
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// Engine configuration sent with INIT.
    pub discovery: DiscoveryConfig,
    /// Control mode.
    pub mode: ControlMode,
    /// Client module reference passed to INIT.
    pub module_ref: String,
}

/// Load configuration from the environment.
///
/// `AD_CONTROL_MODE` selects the mode, `AD_CLIENT_MODULE` the client module;
/// the engine tunables come from [`DiscoveryConfig::from_env`].
pub fn load_config() -> Result<RuntimeConfig> {
    let mode = match std::env::var("AD_CONTROL_MODE") {
        Ok(value) => value.parse().context("AD_CONTROL_MODE")?,
        Err(_) => ControlMode::default(),
    };

    Ok(RuntimeConfig {
        discovery: DiscoveryConfig::from_env(),
        mode,
        module_ref: std::env::var("AD_CLIENT_MODULE").unwrap_or_default(),
    })
}

/// Mirror an engine event into the host log.
pub fn log_event(event: &Event) {
    match event {
        Event::Log(LogEntry { message, level, .. }) => match level {
            LogLevel::Debug => debug!("{message}"),
            LogLevel::Warning => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
            LogLevel::Archive => info!(archive = true, "{message}"),
            LogLevel::Info | LogLevel::Success => info!("{message}"),
        },
        Event::ArchiveFound(result) => info!(
            identity = %result.identity,
            block_height = result.block_height,
            server = %result.server_label,
            "Archive node"
        ),
        Event::StateUpdate(snapshot) => info!(
            tested = snapshot.counters.tested,
            archive = snapshot.counters.archive,
            non_archive = snapshot.counters.non_archive,
            skipped = snapshot.counters.skipped,
            errors = snapshot.counters.errors,
            index = snapshot.index,
            "Discovery state"
        ),
        other => debug!(event = other.kind(), "Engine event"),
    }
}

enum Step {
    Event(Option<Event>),
    Interrupt,
}

/// Run without a controller: INIT + CONFIG, START, then follow events until
/// STOPPED.
pub async fn run_auto(mut controller: DiscoveryController, config: RuntimeConfig) -> Result<()> {
    controller
        .init(&config.module_ref, ConfigPatch::from(&config.discovery))
        .await
        .context("initializing client module")?;
    controller.start().await?;
    info!("Discovery is running. Press Ctrl+C to stop.");

    let mut interrupted = false;
    loop {
        let step = tokio::select! {
            event = controller.next_event() => Step::Event(event),
            _ = tokio::signal::ctrl_c(), if !interrupted => Step::Interrupt,
        };

        match step {
            Step::Interrupt => {
                info!("Ctrl+C received, stopping discovery");
                interrupted = true;
                controller.stop().await?;
            }
            Step::Event(None) => break,
            Step::Event(Some(event)) => {
                discovery_telemetry::observe(&event);
                log_event(&event);
                if matches!(event, Event::Stopped) {
                    break;
                }
            }
        }
    }

    if let Some(snapshot) = controller.snapshot() {
        info!(
            tested = snapshot.counters.tested,
            archive_nodes = controller.archive_nodes().len(),
            "Discovery finished"
        );
    }
    Ok(())
}

/// Relay JSON lines: commands from stdin, events to stdout.
///
/// Stdin EOF drops the command handle; the loop ends once the engine has
/// flushed its remaining events and exited.
pub async fn run_stdio(handle: DiscoveryHandle, mut events: EventReceiver) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut handle = Some(handle);
    let clock = SystemTimeSource;

    loop {
        tokio::select! {
            line = lines.next_line(), if handle.is_some() => {
                match line.context("reading stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        let reply = match decode_command(&line) {
                            Ok(command) => match handle.as_ref().map(|h| h.send(command)) {
                                Some(Err(e)) => Some(e),
                                _ => None,
                            },
                            Err(e) => Some(e),
                        };
                        if let Some(e) = reply {
                            let event = Event::Error(ErrorEntry {
                                message: "Command rejected".to_string(),
                                error: Some(e.to_string()),
                                timestamp: clock.now_millis(),
                            });
                            write_event(&mut stdout, &event).await?;
                        }
                    }
                    None => {
                        debug!("stdin closed, releasing engine");
                        handle = None;
                    }
                }
            }
            event = events.recv() => match event {
                Some(event) => {
                    discovery_telemetry::observe(&event);
                    write_event(&mut stdout, &event).await?;
                }
                None => break,
            },
        }
    }
    Ok(())
}

async fn write_event(stdout: &mut tokio::io::Stdout, event: &Event) -> Result<()> {
    let mut line = encode_event(event)?;
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
