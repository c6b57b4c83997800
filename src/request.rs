//! # Pipeline Request Module
//!
//! Questo modulo descrive una singola esecuzione di ottimizzazione.
//!
//! ## Responsabilità:
//! - Rappresentare input, output, resize, modalità e range di qualità
//! - Derivare il path di output di default (`<stem>-min.png`)
//!
//! Una `PipelineRequest` viene costruita una volta dalla riga di comando
//! (più i default della config) e poi solo letta da planner ed executor.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Suffix appended to the input stem when no output path is given
pub const DEFAULT_OUTPUT_SUFFIX: &str = "-min";

/// Which compression path the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Lossy,
    Lossless,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Lossy
    }
}

/// Quality bounds for the lossy compressor, written `MIN-MAX` on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityRange {
    pub min: u8,
    pub max: u8,
}

impl Default for QualityRange {
    fn default() -> Self {
        Self { min: 65, max: 80 }
    }
}

impl QualityRange {
    pub fn new(min: u8, max: u8) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max > 100 {
            return Err(anyhow::anyhow!("Quality must be between 0 and 100, got {}", self.max));
        }
        if self.min > self.max {
            return Err(anyhow::anyhow!(
                "Quality range minimum ({}) is greater than maximum ({})",
                self.min,
                self.max
            ));
        }
        Ok(())
    }
}

impl fmt::Display for QualityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for QualityRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| format!("expected MIN-MAX, got '{}'", s))?;
        let min: u8 = min
            .trim()
            .parse()
            .map_err(|_| format!("invalid minimum quality '{}'", min))?;
        let max: u8 = max
            .trim()
            .parse()
            .map_err(|_| format!("invalid maximum quality '{}'", max))?;
        Self::new(min, max).map_err(|e| e.to_string())
    }
}

/// One optimization run, fixed before anything is executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    pub input: PathBuf,
    pub max_dim: Option<u32>,
    pub output: Option<PathBuf>,
    pub mode: Mode,
    pub range: QualityRange,
}

impl PipelineRequest {
    /// Request with defaults: lossy, no resize, `<stem>-min.png` output
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            max_dim: None,
            output: None,
            mode: Mode::default(),
            range: QualityRange::default(),
        }
    }

    pub fn with_max_dim(mut self, max_dim: u32) -> Self {
        self.max_dim = Some(max_dim);
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_range(mut self, range: QualityRange) -> Self {
        self.range = range;
        self
    }

    /// Where the delivered file goes
    pub fn output_path(&self) -> PathBuf {
        match self.output {
            Some(ref output) => output.clone(),
            None => default_output_path(&self.input),
        }
    }
}

/// `<dir>/<stem>-min.png` next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let filename = format!("{}{}.png", stem, DEFAULT_OUTPUT_SUFFIX);
    input.with_file_name(filename)
}
