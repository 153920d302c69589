//! Export pipeline: message text in, PNG files out.
//!
//! For every diagram the extractor finds, a dedicated renderer process and
//! [`RenderBridge`] are started (a renderer holds one diagram at a time).
//! The bridge imposes no timeouts, so each step is bounded here with the
//! configured durations.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use markmap_kit_bridge::{
    ArtifactWriter, BridgeError, Completion, ProcessRenderer, RenderBridge,
};
use markmap_kit_config::Config;
use markmap_kit_extract::Message;
use thiserror::Error;

/// Step of a diagram's export lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submit,
    Export,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Submit => "submit",
            Stage::Export => "export",
            Stage::Persist => "persist",
        })
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no renderer command configured")]
    NoRenderer,

    #[error("{stage} failed: {source}")]
    Bridge {
        stage: Stage,
        #[source]
        source: BridgeError,
    },

    #[error("{stage} timed out after {timeout:?}")]
    Timeout { stage: Stage, timeout: Duration },
}

impl PipelineError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::NoRenderer => None,
            PipelineError::Bridge { stage, .. } | PipelineError::Timeout { stage, .. } => {
                Some(*stage)
            }
        }
    }

    /// Whether asking the same renderer for another export could succeed.
    ///
    /// `ConcurrentExport` counts as an export failure but means our own
    /// previous request is still in flight, so it is not retried.
    fn export_retryable(&self) -> bool {
        match self {
            PipelineError::Bridge { source, .. } => {
                source.is_export_failure() && !matches!(source, BridgeError::ConcurrentExport)
            }
            PipelineError::NoRenderer | PipelineError::Timeout { .. } => false,
        }
    }
}

/// Everything needed to export diagrams.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub command: String,
    pub args: Vec<String>,
    pub render_timeout: Duration,
    pub export_timeout: Duration,
    /// Extra export attempts after a renderer-side export failure.
    pub retries: u32,
    pub writer: ArtifactWriter,
}

impl ExportSettings {
    /// Build settings from config. Fails if no renderer command is set.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let command = config
            .renderer
            .command
            .clone()
            .ok_or(PipelineError::NoRenderer)?;
        Ok(Self {
            command,
            args: config.renderer.args.clone(),
            render_timeout: config.renderer.render_timeout(),
            export_timeout: config.renderer.export_timeout(),
            retries: 0,
            writer: ArtifactWriter::new(config.output_dir())
                .with_prefix(config.export.file_prefix.clone()),
        })
    }
}

/// Outcome for one diagram of a message.
#[derive(Debug)]
pub struct DiagramExport {
    /// Position of the diagram among the message's diagrams.
    pub index: usize,
    pub result: Result<PathBuf, PipelineError>,
}

/// Render and persist a single diagram specification.
pub async fn export_diagram(spec: &str, settings: &ExportSettings) -> Result<PathBuf, PipelineError> {
    let mut renderer =
        ProcessRenderer::spawn(&settings.command, &settings.args).map_err(|source| {
            PipelineError::Bridge {
                stage: Stage::Submit,
                source,
            }
        })?;
    let signals = renderer.take_signals();
    let mut bridge = RenderBridge::new(renderer);
    if let Some(signals) = signals {
        bridge.attach_signals(signals);
    }

    let result = run_lifecycle(&bridge, spec, settings).await;
    bridge.renderer().shutdown().await;
    result
}

async fn run_lifecycle(
    bridge: &RenderBridge<ProcessRenderer>,
    spec: &str,
    settings: &ExportSettings,
) -> Result<PathBuf, PipelineError> {
    bounded(Stage::Submit, settings.render_timeout, bridge.submit_content(spec)).await?;

    let mut attempt = 0;
    loop {
        let outcome = async {
            let data =
                bounded(Stage::Export, settings.export_timeout, bridge.export_artifact()).await?;
            settings
                .writer
                .persist(&data)
                .map_err(|source| PipelineError::Bridge {
                    stage: Stage::Persist,
                    source,
                })
        }
        .await;

        match outcome {
            Err(e) if e.export_retryable() && attempt < settings.retries => {
                attempt += 1;
                log::warn!("Retrying export ({attempt}/{}): {e}", settings.retries);
            }
            other => return other,
        }
    }
}

async fn bounded<T>(
    stage: Stage,
    timeout: Duration,
    completion: Completion<T>,
) -> Result<T, PipelineError> {
    match tokio::time::timeout(timeout, completion).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(PipelineError::Bridge { stage, source }),
        Err(_) => Err(PipelineError::Timeout { stage, timeout }),
    }
}

/// Extract the diagrams of `message` and export each one in turn.
pub async fn export_message(message: &Message, settings: &ExportSettings) -> Vec<DiagramExport> {
    let extracted = message.extracted();
    let mut exports = Vec::new();
    for (index, spec) in extracted.diagrams().enumerate() {
        log::info!("Exporting diagram {index} ({} bytes)", spec.len());
        let result = export_diagram(spec, settings).await;
        if let Err(e) = &result {
            log::error!("Diagram {index} failed: {e}");
        }
        exports.push(DiagramExport { index, result });
    }
    exports
}
