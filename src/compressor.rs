//! # PNG Compression Module
//!
//! Questo modulo incapsula i compressori esterni usati dalla pipeline.
//!
//! ## Responsabilità:
//!
//! | Capability | Tool             | Comportamento                           |
//! |------------|------------------|-----------------------------------------|
//! | Lossy      | pngquant         | Quantizzazione a palette entro un range di qualità, non ingrandisce mai il file |
//! | Lossless   | optipng, oxipng  | Ricompressione in-place, pixel identici |
//!
//! Entrambi sono raggiunti tramite un trait a metodo singolo, così l'executor
//! non deve sapere quale binario c'è dietro.

use crate::args;
use crate::error::ToolError;
use crate::request::QualityRange;
use crate::tool_resolver::ResolvedTool;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

/// pngquant exit status when `--skip-if-larger` rejected the result
const PNGQUANT_SKIPPED_IF_LARGER: i32 = 98;
/// pngquant exit status when the minimum quality could not be met
const PNGQUANT_QUALITY_TOO_LOW: i32 = 99;

/// External lossy capability: writes a quantized copy of `input` to `output`
#[async_trait]
pub trait LossyCompressor: Send + Sync {
    async fn compress(
        &self,
        input: &Path,
        range: QualityRange,
        skip_if_larger: bool,
        output: &Path,
    ) -> Result<(), ToolError>;
}

/// External lossless capability: recompresses `path` in place
#[async_trait]
pub trait LosslessOptimizer: Send + Sync {
    async fn optimize(&self, path: &Path) -> Result<(), ToolError>;
}

/// pngquant
#[derive(Debug, Clone)]
pub struct Pngquant {
    tool: ResolvedTool,
    speed: u8,
}

impl Pngquant {
    pub fn new(tool: ResolvedTool, speed: u8) -> Self {
        Self { tool, speed }
    }

    pub fn build_args(&self, input: &Path, range: QualityRange, skip_if_larger: bool, output: &Path) -> Vec<OsString> {
        let mut args = args![
            format!("--quality={}", range),
            "--speed", self.speed.to_string(),
            "--force",
        ];
        if skip_if_larger {
            args.push("--skip-if-larger".into());
        }
        args.extend(args!["--output", output, "--", input]);
        args
    }
}

#[async_trait]
impl LossyCompressor for Pngquant {
    async fn compress(
        &self,
        input: &Path,
        range: QualityRange,
        skip_if_larger: bool,
        output: &Path,
    ) -> Result<(), ToolError> {
        let args = self.build_args(input, range, skip_if_larger, output);
        let result = self.tool.run(&args).await?;

        match result.status.code() {
            Some(0) => {
                debug!("pngquant compressed {} at quality {}", input.display(), range);
                Ok(())
            }
            Some(PNGQUANT_SKIPPED_IF_LARGER) => Err(ToolError::WouldEnlarge {
                tool: self.tool.name.clone(),
            }),
            Some(PNGQUANT_QUALITY_TOO_LOW) => Err(ToolError::QualityTooLow {
                tool: self.tool.name.clone(),
            }),
            code => Err(ToolError::Failed {
                tool: self.tool.name.clone(),
                code,
            }),
        }
    }
}

/// Command line dialect of a lossless optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LosslessBackend {
    Optipng,
    Oxipng,
}

impl LosslessBackend {
    pub fn for_tool(tool_name: &str) -> Option<Self> {
        match tool_name {
            "optipng" => Some(Self::Optipng),
            "oxipng" => Some(Self::Oxipng),
            _ => None,
        }
    }

    pub fn build_args(&self, path: &Path, level: u8) -> Vec<OsString> {
        match self {
            LosslessBackend::Optipng => args!["-quiet", format!("-o{}", level), "--", path],
            // oxipng stops at level 6
            LosslessBackend::Oxipng => args!["-q", "-o", level.min(6).to_string(), "--", path],
        }
    }
}

/// optipng or oxipng
#[derive(Debug, Clone)]
pub struct ExternalLosslessOptimizer {
    tool: ResolvedTool,
    backend: LosslessBackend,
    level: u8,
}

impl ExternalLosslessOptimizer {
    pub fn new(tool: ResolvedTool, backend: LosslessBackend, level: u8) -> Self {
        Self { tool, backend, level }
    }
}

#[async_trait]
impl LosslessOptimizer for ExternalLosslessOptimizer {
    async fn optimize(&self, path: &Path) -> Result<(), ToolError> {
        let args = self.backend.build_args(path, self.level);
        self.tool.run_checked(&args).await?;
        debug!("{} optimized {} at level {}", self.tool.name, path.display(), self.level);
        Ok(())
    }
}
