//! # PNG Optimizer Orchestrator
//!
//! Orchestratore che collega detect, planner, executor e report.
//!
//! ## Flusso di esecuzione:
//! 1. **Inizializzazione**: Valida la config e rileva i tool disponibili (una volta)
//! 2. **Planning**: Costruisce il piano per la richiesta, loggando i warning
//! 3. **Execution**: Esegue il piano e consegna il file di output
//! 4. **Reporting**: Logga il riepilogo e restituisce l'`ExecutionResult`
//!
//! ## Esempio:
//! ```rust,ignore
//! let optimizer = PngOptimizer::new(Config::default())?;
//! let result = optimizer.run(&PipelineRequest::new("banner.png").with_max_dim(1600)).await?;
//! println!("{}", ReportGenerator::done_line(Path::new("banner.png"), &result));
//! ```

use crate::{
    config::Config,
    error::PipelineError,
    executor::{ExecutionResult, PipelineExecutor},
    planner::{self, Plan},
    detect::{Toolbox, ToolDetector},
    progress::ProgressManager,
    report::ReportGenerator,
    request::PipelineRequest,
};
use anyhow::Result;
use tracing::{debug, info, warn};

/// Runs one request end to end
pub struct PngOptimizer {
    toolbox: Toolbox,
    progress: ProgressManager,
}

impl PngOptimizer {
    /// Validate `config` and detect the available tools
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let toolbox = ToolDetector::new(&config).detect();
        debug!("Detected capabilities: {:?}", toolbox.capabilities());

        Ok(Self {
            toolbox,
            progress: ProgressManager::hidden(),
        })
    }

    /// Use a specific set of tools instead of probing
    pub fn with_toolbox(mut self, toolbox: Toolbox) -> Self {
        self.toolbox = toolbox;
        self
    }

    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = progress;
        self
    }

    /// The plan `request` would run with the detected tools
    pub fn plan(&self, request: &PipelineRequest) -> Plan {
        planner::plan(request, &self.toolbox.capabilities())
    }

    /// Plan, execute and summarize one request
    pub async fn run(&self, request: &PipelineRequest) -> Result<ExecutionResult, PipelineError> {
        info!("Optimizing {}", request.input.display());

        let plan = self.plan(request);
        for warning in &plan.warnings {
            warn!("{}", warning);
        }
        debug!(
            "Plan: {}",
            plan.steps().iter().map(ToString::to_string).collect::<Vec<_>>().join(" → ")
        );

        let result = PipelineExecutor::new(&self.toolbox)
            .with_progress(self.progress.clone())
            .execute(&plan, request)
            .await?;

        ReportGenerator::log_summary(&result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StepOutcome;
    use crate::planner::PipelineStep;
    use crate::report::{report, RunSummary};
    use crate::request::{Mode, QualityRange};
    use crate::resize::read_dimensions;
    use crate::test_support::*;
    use tempfile::TempDir;

    fn optimizer(toolbox: Toolbox) -> PngOptimizer {
        PngOptimizer {
            toolbox,
            progress: ProgressManager::hidden(),
        }
    }

    #[tokio::test]
    async fn test_icon_with_only_lossless_optimizer() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_padded_png(temp_dir.path(), "icon.png", 32, 32, 256);
        let optimizer = optimizer(Toolbox::empty().with_lossless(FakeLossless::strip_padding()));
        let request = PipelineRequest::new(&input).with_mode(Mode::Lossless);

        let result = optimizer.run(&request).await.unwrap();

        assert_eq!(result.output, temp_dir.path().join("icon-min.png"));
        assert_eq!(result.delivered_by, PipelineStep::LosslessCompress);
        assert!(result.output_size < result.input_size);
        assert!(RunSummary::new(&input, &result).warnings.is_empty());
    }

    #[tokio::test]
    async fn test_banner_with_all_tools() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_png(temp_dir.path(), "banner.png", 400, 200);
        let lossy = FakeLossy::shrinking(0.4);
        let ranges = lossy.ranges();
        let optimizer = optimizer(
            Toolbox::empty()
                .with_resizer(FakeResizer::new())
                .with_lossy(lossy)
                .with_lossless(FakeLossless::strip_padding()),
        );
        let range = QualityRange { min: 60, max: 80 };
        let request = PipelineRequest::new(&input)
            .with_max_dim(160)
            .with_range(range)
            .with_output(temp_dir.path().join("out").join("banner.png"));

        let result = optimizer.run(&request).await.unwrap();

        assert_eq!(result.outcome_of(&PipelineStep::Resize { max_dim: 160 }), Some(StepOutcome::Succeeded));
        assert_eq!(result.delivered_by, PipelineStep::LossyCompress { range });
        assert_eq!(*ranges.lock().unwrap(), vec![range]);
        assert!(result.output.exists());
        assert!(result.output_size < result.input_size);
    }

    #[tokio::test]
    async fn test_resize_bounds_largest_dimension() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_png(temp_dir.path(), "tall.png", 90, 300);
        let optimizer = optimizer(Toolbox::empty().with_resizer(FakeResizer::new()));
        let request = PipelineRequest::new(&input).with_max_dim(120);

        let result = optimizer.run(&request).await.unwrap();

        let (width, height) = read_dimensions(&result.output).unwrap();
        assert!(width.max(height) <= 120);
        assert_eq!((width, height), (36, 120));
        // The input is never touched
        assert_eq!(read_dimensions(&input), Some((90, 300)));
    }

    #[tokio::test]
    async fn test_no_tools_delivers_copy_with_warning() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_png(temp_dir.path(), "plain.png", 24, 24);
        let optimizer = optimizer(Toolbox::empty());
        let request = PipelineRequest::new(&input).with_max_dim(8);

        let result = optimizer.run(&request).await.unwrap();

        assert_eq!(std::fs::read(&result.output).unwrap(), std::fs::read(&input).unwrap());
        assert_eq!(report(result.input_size, result.output_size), "100.0% of original");
        let summary = RunSummary::new(&input, &result);
        assert_eq!(summary.warnings.len(), 2);
        assert_eq!(
            result.outcome_of(&PipelineStep::Resize { max_dim: 8 }),
            Some(StepOutcome::SkippedUnavailable)
        );
    }

    #[tokio::test]
    async fn test_lossless_twice_is_stable() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_padded_png(temp_dir.path(), "twice.png", 16, 16, 64);
        let optimizer = optimizer(Toolbox::empty().with_lossless(FakeLossless::strip_padding()));

        let first = optimizer
            .run(&PipelineRequest::new(&input).with_mode(Mode::Lossless))
            .await
            .unwrap();
        let second = optimizer
            .run(
                &PipelineRequest::new(&first.output)
                    .with_mode(Mode::Lossless)
                    .with_output(temp_dir.path().join("again.png")),
            )
            .await
            .unwrap();

        assert_eq!(second.output_size, first.output_size);
        assert_eq!(second.delivered_by, PipelineStep::LosslessCompress);
    }

    #[tokio::test]
    async fn test_lossy_failure_then_lossless() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_padded_png(temp_dir.path(), "fallback.png", 16, 16, 32);
        let optimizer = optimizer(
            Toolbox::empty()
                .with_lossy(FakeLossy::failing())
                .with_lossless(FakeLossless::strip_padding()),
        );

        let result = optimizer.run(&PipelineRequest::new(&input)).await.unwrap();

        assert!(result.fell_back());
        assert_eq!(result.delivered_by, PipelineStep::LosslessCompress);
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_summary_json_line() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_png(temp_dir.path(), "json.png", 8, 8);
        let optimizer = optimizer(Toolbox::empty().with_lossy(FakeLossy::shrinking(0.5)));

        let result = optimizer.run(&PipelineRequest::new(&input)).await.unwrap();
        let json = RunSummary::new(&input, &result).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(!json.contains('\n'));
        assert_eq!(value["delivered_by"]["step"], "lossy_compress");
        assert_eq!(value["steps"][0]["outcome"], "succeeded");
        assert_eq!(value["input_size"], result.input_size);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = Config {
            lossy_speed: 0,
            ..Default::default()
        };
        assert!(PngOptimizer::new(config).is_err());
    }
}
