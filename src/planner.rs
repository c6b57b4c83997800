//! # Pipeline Planner Module
//!
//! Questo modulo decide, prima di eseguire qualsiasi tool, quali step tentare
//! e in quale ordine.
//!
//! ## Responsabilità:
//! - Inserire il resize solo se richiesto e disponibile
//! - Costruire la scala di degradazione della compressione
//! - Raccogliere i warning per le capability mancanti
//!
//! ## Scala di degradazione:
//! ```text
//! LossyCompress(range) → LosslessCompress → CopyThrough
//! ```
//! I tier senza capability vengono omessi (con un warning) e la scala termina
//! sempre con `CopyThrough`, quindi l'esecuzione consegna sempre un file.
//! Un tier che fallisce scende di un solo gradino.

use crate::detect::{Capabilities, Capability};
use crate::request::{Mode, PipelineRequest, QualityRange};
use serde::Serialize;
use std::fmt;

/// One unit of work in a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PipelineStep {
    Resize { max_dim: u32 },
    LossyCompress { range: QualityRange },
    LosslessCompress,
    CopyThrough,
}

impl PipelineStep {
    /// Capability needed to run this step, `None` for a plain copy
    pub fn capability(&self) -> Option<Capability> {
        match self {
            PipelineStep::Resize { .. } => Some(Capability::Resize),
            PipelineStep::LossyCompress { .. } => Some(Capability::LossyCompress),
            PipelineStep::LosslessCompress => Some(Capability::LosslessCompress),
            PipelineStep::CopyThrough => None,
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStep::Resize { max_dim } => write!(f, "resize to {} px", max_dim),
            PipelineStep::LossyCompress { range } => write!(f, "lossy compression ({})", range),
            PipelineStep::LosslessCompress => f.write_str("lossless compression"),
            PipelineStep::CopyThrough => f.write_str("uncompressed copy"),
        }
    }
}

/// Ordered steps for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Optional resize, always first
    pub resize: Option<PipelineStep>,
    /// Compression tiers, primary first, always ending in `CopyThrough`
    pub ladder: Vec<PipelineStep>,
    /// Steps the request called for whose capability is missing
    pub unavailable: Vec<PipelineStep>,
    /// Warnings raised while planning
    pub warnings: Vec<String>,
}

impl Plan {
    /// The primary sequence: resize (if any) and the first compression tier
    pub fn steps(&self) -> Vec<PipelineStep> {
        self.resize
            .iter()
            .chain(self.ladder.first())
            .copied()
            .collect()
    }

    /// Tiers tried only after the primary one fails
    pub fn fallbacks(&self) -> &[PipelineStep] {
        self.ladder.get(1..).unwrap_or(&[])
    }

    /// The tier following `step` in the ladder
    pub fn next_tier(&self, step: &PipelineStep) -> Option<PipelineStep> {
        let index = self.ladder.iter().position(|s| s == step)?;
        self.ladder.get(index + 1).copied()
    }
}

/// Build the plan for `request` given what this machine can do
pub fn plan(request: &PipelineRequest, capabilities: &Capabilities) -> Plan {
    let mut unavailable = Vec::new();
    let mut warnings = Vec::new();

    let resize = request.max_dim.and_then(|max_dim| {
        let step = PipelineStep::Resize { max_dim };
        if capabilities.contains(Capability::Resize) {
            Some(step)
        } else {
            warnings.push(format!(
                "No resize tool available; keeping original dimensions instead of {} px",
                max_dim
            ));
            unavailable.push(step);
            None
        }
    });

    let has_lossy = capabilities.contains(Capability::LossyCompress);
    let has_lossless = capabilities.contains(Capability::LosslessCompress);
    let mut ladder = Vec::with_capacity(3);

    if request.mode == Mode::Lossy {
        let lossy = PipelineStep::LossyCompress { range: request.range };
        if has_lossy {
            ladder.push(lossy);
        } else {
            unavailable.push(lossy);
            if has_lossless {
                warnings.push("No lossy compressor available; falling back to lossless compression".to_string());
            } else {
                warnings.push(
                    "Neither a lossy compressor nor a lossless optimizer is available; output will be an uncompressed copy"
                        .to_string(),
                );
            }
        }
    }

    if has_lossless {
        ladder.push(PipelineStep::LosslessCompress);
    } else if request.mode == Mode::Lossless {
        warnings.push("No lossless optimizer available; output will be an uncompressed copy".to_string());
        unavailable.push(PipelineStep::LosslessCompress);
    } else if !has_lossy {
        unavailable.push(PipelineStep::LosslessCompress);
    }
    // With lossy present but lossless missing, the executor warns only if lossy fails

    ladder.push(PipelineStep::CopyThrough);

    Plan {
        resize,
        ladder,
        unavailable,
        warnings,
    }
}
