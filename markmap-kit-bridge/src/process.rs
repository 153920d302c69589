//! Renderer running as a child process that speaks line-delimited JSON.
//!
//! Commands ([`RendererCommand`]) are written to the child's stdin, one JSON
//! object per line. Signals ([`RendererSignal`]) are read from its stdout the
//! same way and forwarded on a channel handed out once by
//! [`ProcessRenderer::take_signals`]. Anything the child prints on stderr is
//! logged.

use std::process::Stdio;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;

use crate::error::{BridgeError, Result};
use crate::renderer::{Renderer, RendererCommand, RendererSignal};

/// Handle to a renderer subprocess.
///
/// Must be created inside a tokio runtime. The child is killed when the
/// renderer is dropped.
pub struct ProcessRenderer {
    program: String,
    /// Taken by [`ProcessRenderer::shutdown`].
    commands: Mutex<Option<mpsc::UnboundedSender<RendererCommand>>>,
    signals: Option<mpsc::UnboundedReceiver<RendererSignal>>,
    child: Mutex<Option<Child>>,
}

impl ProcessRenderer {
    /// Spawn `program` with `args` and start the I/O tasks.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BridgeError::RendererUnavailable(format!("failed to spawn {program}: {e}"))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            BridgeError::RendererUnavailable("failed to capture renderer stdin".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            BridgeError::RendererUnavailable("failed to capture renderer stdout".to_string())
        })?;

        if let Some(stderr) = child.stderr.take() {
            let program = program.to_string();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            let trimmed = line.trim();
                            if !trimmed.is_empty() {
                                log::warn!("Renderer [{program}] stderr: {trimmed}");
                            }
                        }
                    }
                }
            });
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(write_commands(stdin, command_rx));

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        tokio::spawn(read_signals(stdout, signal_tx));

        log::info!("Spawned renderer process {program}");
        Ok(Self {
            program: program.to_string(),
            commands: Mutex::new(Some(command_tx)),
            signals: Some(signal_rx),
            child: Mutex::new(Some(child)),
        })
    }

    /// Take the receiver for renderer signals.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_signals(&mut self) -> Option<mpsc::UnboundedReceiver<RendererSignal>> {
        self.signals.take()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Stop accepting commands and kill the child process. Later commands
    /// fail with [`BridgeError::RendererUnavailable`].
    pub async fn shutdown(&self) {
        // Dropping the sender ends `write_commands`, which closes stdin.
        self.commands.lock().take();
        let child = self.child.lock().take();
        if let Some(mut child) = child {
            if let Err(e) = child.kill().await {
                log::warn!("Failed to kill renderer process {}: {e}", self.program);
            } else {
                log::debug!("Renderer process {} stopped", self.program);
            }
        }
    }

    fn send(&self, command: RendererCommand) -> Result<()> {
        let unavailable = || {
            BridgeError::RendererUnavailable(format!(
                "renderer process {} is no longer accepting commands",
                self.program
            ))
        };
        let commands = self.commands.lock();
        let sender = commands.as_ref().ok_or_else(unavailable)?;
        sender.send(command).map_err(|_| unavailable())
    }
}

impl Renderer for ProcessRenderer {
    fn load(&self, spec: &str) -> Result<()> {
        self.send(RendererCommand::Load {
            spec: spec.to_string(),
        })
    }

    fn export(&self) -> Result<()> {
        self.send(RendererCommand::Export)
    }
}

async fn write_commands(
    mut stdin: ChildStdin,
    mut commands: mpsc::UnboundedReceiver<RendererCommand>,
) {
    while let Some(command) = commands.recv().await {
        let json = match serde_json::to_string(&command) {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to serialize renderer command: {e}");
                continue;
            }
        };
        let written = async {
            stdin.write_all(format!("{json}\n").as_bytes()).await?;
            stdin.flush().await
        };
        if let Err(e) = written.await {
            log::error!("Error writing to renderer stdin: {e}");
            break;
        }
    }
}

async fn read_signals(stdout: ChildStdout, signals: mpsc::UnboundedSender<RendererSignal>) {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                log::debug!("Renderer closed stdout");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let signal = match RendererSignal::from_json(trimmed) {
                    Ok(signal) => signal,
                    Err(e) => {
                        log::error!("Failed to parse renderer signal: {e}");
                        continue;
                    }
                };
                if signals.send(signal).is_err() {
                    // Receiver dropped, stop reading.
                    break;
                }
            }
            Err(e) => {
                log::error!("Error reading from renderer stdout: {e}");
                break;
            }
        }
    }
}
