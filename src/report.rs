//! # Report Module
//!
//! Questo modulo riassume una esecuzione terminata.
//!
//! ## Responsabilità:
//! - [`report`]: il frammento `"<pct>% of original"` della riga `Done:`
//! - [`ReportGenerator`]: la riga finale su stdout e il riepilogo nei log
//! - [`RunSummary`]: gli stessi dati come singola riga JSON per `--json`

use crate::executor::{ExecutionResult, StepRecord};
use crate::planner::PipelineStep;
use crate::utils::format_size;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Output size as a percentage of input size, one decimal place
pub fn percent_of_original(input_size: u64, output_size: u64) -> f64 {
    if input_size == 0 {
        return 0.0;
    }
    output_size as f64 / input_size as f64 * 100.0
}

/// `"65.0% of original"`; an empty input reports `0.0%`
pub fn report(input_size: u64, output_size: u64) -> String {
    format!("{:.1}% of original", percent_of_original(input_size, output_size))
}

/// Structured summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_size: u64,
    pub output_size: u64,
    pub percent_of_original: f64,
    pub delivered_by: PipelineStep,
    pub steps: Vec<StepRecord>,
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn new(input: &Path, result: &ExecutionResult) -> Self {
        let warnings = result
            .plan
            .warnings
            .iter()
            .chain(&result.warnings)
            .cloned()
            .collect();

        Self {
            input: input.to_path_buf(),
            output: result.output.clone(),
            input_size: result.input_size,
            output_size: result.output_size,
            // Rounded like the text report so both agree
            percent_of_original: (percent_of_original(result.input_size, result.output_size) * 10.0).round() / 10.0,
            delivered_by: result.delivered_by,
            steps: result.records.clone(),
            warnings,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Emits the results of a run
pub struct ReportGenerator;

impl ReportGenerator {
    /// `Done: <in> -> <out> (<pct>% of original)`
    pub fn done_line(input: &Path, result: &ExecutionResult) -> String {
        format!(
            "Done: {} -> {} ({})",
            input.display(),
            result.output.display(),
            report(result.input_size, result.output_size)
        )
    }

    /// Log the size change at info level
    pub fn log_summary(result: &ExecutionResult) {
        let saved = result.input_size.saturating_sub(result.output_size);
        info!(
            "{} -> {} via {} (saved {})",
            format_size(result.input_size),
            format_size(result.output_size),
            result.delivered_by,
            format_size(saved)
        );
    }
}
