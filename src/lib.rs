//! # PNG Minify Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per i test
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione persistente dei tool esterni
//! - `error`: Errori della pipeline, errori dei tool ed exit code
//! - `request`: Richiesta dell'utente (input, resize, modalità, range qualità)
//! - `tool_resolver`: Ricerca dei tool nel PATH ed esecuzione con timeout
//! - `resize` / `compressor`: Capability di resize e compressione lossy/lossless
//! - `detect`: Rilevamento delle capability disponibili
//! - `planner`: Piano degli step con la scala di degradazione
//! - `executor`: Esecuzione del piano e consegna del file
//! - `file_manager`: File temporanei, staging e consegna atomica
//! - `report`: Riga finale `Done:` e riepilogo JSON
//! - `optimizer`: Orchestratore che collega tutto
//! - `progress`: Spinner su stderr
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use png_minify::{Config, PipelineRequest, PngOptimizer};
//!
//! let optimizer = PngOptimizer::new(Config::default())?;
//! let result = optimizer.run(&PipelineRequest::new("icon.png")).await?;
//! ```

pub mod compressor;
pub mod config;
pub mod detect;
pub mod error;
pub mod executor;
pub mod file_manager;
pub mod optimizer;
pub mod planner;
pub mod progress;
pub mod report;
pub mod request;
pub mod resize;
pub mod tool_resolver;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{PipelineError, ToolError};
pub use executor::{ExecutionResult, PipelineExecutor, StepOutcome, StepRecord};
pub use optimizer::PngOptimizer;
pub use planner::{plan, PipelineStep, Plan};
pub use detect::{Capabilities, Capability, ToolDetector, Toolbox};
pub use report::{report, ReportGenerator, RunSummary};
pub use request::{Mode, PipelineRequest, QualityRange};
