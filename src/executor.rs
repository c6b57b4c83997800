//! # Pipeline Executor Module
//!
//! Questo modulo esegue un [`Plan`] sull'input della richiesta e consegna
//! esattamente un file sul path di output.
//!
//! ## Macchina a stati:
//! ```text
//! Start → Resized? → Compressing → Delivered
//! ```
//! I fallimenti dei tool non terminano mai l'esecuzione: un resize fallito
//! mantiene le dimensioni originali e un tier di compressione fallito passa al
//! successivo, fino alla copia semplice. Solo gli errori di I/O (input
//! illeggibile, directory di output non scrivibile) interrompono con errore.
//!
//! ## File:
//! - L'intermedio del resize vive nella temp dir di sistema come `TempPath`
//!   posseduto dal [`WorkingFile`]; viene cancellato su ogni percorso di
//!   uscita, anche quando il future viene droppato per un'interruzione.
//! - Ogni tier scrive un file di staging accanto all'output, e solo un tier
//!   riuscito lo rinomina sul path finale.

use crate::error::{PipelineError, ToolError};
use crate::file_manager::{FileManager, WorkingFile};
use crate::planner::{PipelineStep, Plan};
use crate::detect::Toolbox;
use crate::progress::ProgressManager;
use crate::request::{PipelineRequest, QualityRange};
use crate::resize::read_dimensions;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// What happened to one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    SkippedUnavailable,
    FailedFellBack,
}

/// One line of the execution log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    #[serde(flatten)]
    pub step: PipelineStep,
    pub outcome: StepOutcome,
    pub detail: Option<String>,
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub plan: Plan,
    pub records: Vec<StepRecord>,
    /// The compression tier whose output was delivered
    pub delivered_by: PipelineStep,
    pub output: PathBuf,
    pub input_size: u64,
    pub output_size: u64,
    /// Warnings raised while executing, in addition to `plan.warnings`
    pub warnings: Vec<String>,
}

impl ExecutionResult {
    /// Outcome recorded for `step`, if it was reached
    pub fn outcome_of(&self, step: &PipelineStep) -> Option<StepOutcome> {
        self.records
            .iter()
            .find(|record| &record.step == step)
            .map(|record| record.outcome)
    }

    /// Whether any tier failed and handed over to the next one
    pub fn fell_back(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.outcome == StepOutcome::FailedFellBack)
    }
}

/// Result of trying one compression tier
enum Attempt {
    Staged(TempPath, Option<String>),
    Unavailable,
    Failed(ToolError),
}

#[derive(Default)]
struct StepLog {
    records: Vec<StepRecord>,
    warnings: Vec<String>,
}

impl StepLog {
    fn record(&mut self, step: PipelineStep, outcome: StepOutcome, detail: Option<String>) {
        debug!("{}: {:?}{}", step, outcome, detail.as_deref().map(|d| format!(" ({})", d)).unwrap_or_default());
        self.records.push(StepRecord { step, outcome, detail });
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Runs plans using the tools in a [`Toolbox`]
pub struct PipelineExecutor<'a> {
    toolbox: &'a Toolbox,
    progress: ProgressManager,
}

impl<'a> PipelineExecutor<'a> {
    pub fn new(toolbox: &'a Toolbox) -> Self {
        Self {
            toolbox,
            progress: ProgressManager::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = progress;
        self
    }

    /// Execute `plan` for `request`, delivering the output file
    pub async fn execute(&self, plan: &Plan, request: &PipelineRequest) -> Result<ExecutionResult, PipelineError> {
        let input_size = FileManager::input_size(&request.input).await?;
        let output = request.output_path();
        let output_dir = FileManager::prepare_output_dir(&output).await?;
        let label = request
            .input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut log = StepLog::default();
        for step in &plan.unavailable {
            let detail = step.capability().map(|capability| format!("no {} tool available", capability));
            log.record(*step, StepOutcome::SkippedUnavailable, detail);
        }

        let mut working = WorkingFile::Source(request.input.clone());
        if let Some(PipelineStep::Resize { max_dim }) = plan.resize {
            self.progress.set_message(&format!("{}: resizing to {} px", label, max_dim));
            working = self.resize(working, max_dim, &mut log).await?;
        }

        let delivered_by = self
            .compress(plan, &working, &output_dir, &output, &label, &mut log)
            .await?;
        self.progress.finish();

        let output_size = FileManager::file_size(&output).await?;
        if working.is_resized() {
            debug!("Removing resized intermediate {}", working.path().display());
        }
        drop(working);

        info!("Delivered {} via {}", output.display(), delivered_by);
        Ok(ExecutionResult {
            plan: plan.clone(),
            records: log.records,
            delivered_by,
            output,
            input_size,
            output_size,
            warnings: log.warnings,
        })
    }

    async fn resize(
        &self,
        working: WorkingFile,
        max_dim: u32,
        log: &mut StepLog,
    ) -> Result<WorkingFile, PipelineError> {
        let step = PipelineStep::Resize { max_dim };
        let Some(resizer) = self.toolbox.resizer.as_deref() else {
            log.warn(format!("No resize tool available; keeping original dimensions instead of {} px", max_dim));
            log.record(step, StepOutcome::SkippedUnavailable, None);
            return Ok(working);
        };

        if let Some((width, height)) = read_dimensions(working.path()) {
            if width.max(height) <= max_dim {
                log.record(
                    step,
                    StepOutcome::Succeeded,
                    Some(format!("already {}x{}, within {} px", width, height, max_dim)),
                );
                return Ok(working);
            }
        }

        let resized = FileManager::temp_png()?;
        match resizer.resize(working.path(), max_dim, &resized).await {
            Ok(()) => {
                let detail = read_dimensions(&resized).map(|(w, h)| format!("resized to {}x{}", w, h));
                log.record(step, StepOutcome::Succeeded, detail);
                Ok(WorkingFile::Resized(resized))
            }
            Err(e) => {
                log.warn(format!("Resize failed ({}); continuing at original size", e));
                log.record(step, StepOutcome::FailedFellBack, Some(e.to_string()));
                Ok(working)
            }
        }
    }

    async fn compress(
        &self,
        plan: &Plan,
        working: &WorkingFile,
        output_dir: &Path,
        output: &Path,
        label: &str,
        log: &mut StepLog,
    ) -> Result<PipelineStep, PipelineError> {
        let working_size = FileManager::file_size(working.path()).await?;

        let tiers: Vec<PipelineStep> = plan
            .ladder
            .iter()
            .copied()
            .filter(|step| {
                matches!(step, PipelineStep::LossyCompress { .. } | PipelineStep::LosslessCompress)
            })
            .collect();

        for (index, step) in tiers.iter().enumerate() {
            self.progress.set_message(&format!("{}: {}", label, step));

            let attempt = match *step {
                PipelineStep::LossyCompress { range } => {
                    self.try_lossy(range, working, working_size, output_dir).await?
                }
                _ => self.try_lossless(working, working_size, output_dir).await?,
            };

            let next = tiers.get(index + 1).unwrap_or(&PipelineStep::CopyThrough);
            match attempt {
                Attempt::Staged(staging, detail) => {
                    FileManager::deliver(staging, output)?;
                    log.record(*step, StepOutcome::Succeeded, detail);
                    return Ok(*step);
                }
                Attempt::Unavailable => {
                    log.warn(self.fallback_message(step, "is unavailable", next));
                    log.record(*step, StepOutcome::SkippedUnavailable, None);
                }
                Attempt::Failed(e) => {
                    log.warn(self.fallback_message(step, &format!("failed: {}", e), next));
                    log.record(*step, StepOutcome::FailedFellBack, Some(e.to_string()));
                }
            }
        }

        // Last rung: deliver the working file unchanged
        self.progress.set_message(&format!("{}: {}", label, PipelineStep::CopyThrough));
        let staging = FileManager::staging_png(output_dir)?;
        FileManager::copy_into(working.path(), &staging).await?;
        FileManager::deliver(staging, output)?;
        log.record(PipelineStep::CopyThrough, StepOutcome::Succeeded, None);
        Ok(PipelineStep::CopyThrough)
    }

    async fn try_lossy(
        &self,
        range: QualityRange,
        working: &WorkingFile,
        working_size: u64,
        output_dir: &Path,
    ) -> Result<Attempt, PipelineError> {
        let Some(lossy) = self.toolbox.lossy.as_deref() else {
            return Ok(Attempt::Unavailable);
        };

        let staging = FileManager::staging_png(output_dir)?;
        if let Err(e) = lossy.compress(working.path(), range, true, &staging).await {
            return Ok(Attempt::Failed(e));
        }

        Ok(check_not_larger("lossy compressor", staging, working_size).await)
    }

    async fn try_lossless(
        &self,
        working: &WorkingFile,
        working_size: u64,
        output_dir: &Path,
    ) -> Result<Attempt, PipelineError> {
        let Some(lossless) = self.toolbox.lossless.as_deref() else {
            return Ok(Attempt::Unavailable);
        };

        let staging = FileManager::staging_png(output_dir)?;
        FileManager::copy_into(working.path(), &staging).await?;
        if let Err(e) = lossless.optimize(&staging).await {
            return Ok(Attempt::Failed(e));
        }

        Ok(check_not_larger("lossless optimizer", staging, working_size).await)
    }

    fn fallback_message(&self, step: &PipelineStep, what: &str, next: &PipelineStep) -> String {
        let mut message = format!("{} {}; falling back to {}", capitalize(&step.to_string()), what, next);
        if *next == PipelineStep::CopyThrough
            && matches!(step, PipelineStep::LossyCompress { .. })
            && self.toolbox.lossless.is_none()
        {
            message.push_str(" (no lossless optimizer available)");
        }
        message
    }
}

/// Reject empty or grown output; anything else is ready to deliver
async fn check_not_larger(tool: &str, staging: TempPath, working_size: u64) -> Attempt {
    let size = match tokio::fs::metadata(&staging).await {
        Ok(metadata) => metadata.len(),
        Err(source) => {
            return Attempt::Failed(ToolError::MissingOutput {
                tool: tool.to_string(),
                source,
            })
        }
    };

    if size == 0 {
        return Attempt::Failed(ToolError::MissingOutput {
            tool: tool.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "empty output file"),
        });
    }
    if size > working_size {
        return Attempt::Failed(ToolError::WouldEnlarge { tool: tool.to_string() });
    }

    Attempt::Staged(staging, Some(format!("{} -> {} bytes", working_size, size)))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
