//! # Tool Detection Module
//!
//! Questo modulo rileva, una sola volta all'avvio, le capability opzionali
//! disponibili sulla macchina.
//!
//! ## Responsabilità:
//! - Associare ogni capability al primo tool disponibile nella lista di preferenza
//! - Esporre il `Toolbox` usato dall'executor
//!
//! Un tool mancante è uno stato normale, mai un errore.

use crate::compressor::{
    ExternalLosslessOptimizer, LosslessBackend, LosslessOptimizer, LossyCompressor, Pngquant,
};
use crate::config::Config;
use crate::resize::{ExternalResizer, ResizeBackend, Resizer};
use crate::tool_resolver::{ResolvedTool, ToolPathResolver};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

/// An optional external capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Capability {
    Resize,
    LossyCompress,
    LosslessCompress,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Resize,
        Capability::LossyCompress,
        Capability::LosslessCompress,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Resize => "resize",
            Capability::LossyCompress => "lossy compression",
            Capability::LosslessCompress => "lossless compression",
        };
        f.write_str(name)
    }
}

/// Set of available capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(BTreeSet<Capability>);

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The bound implementation of each available capability
#[derive(Default)]
pub struct Toolbox {
    pub resizer: Option<Box<dyn Resizer>>,
    pub lossy: Option<Box<dyn LossyCompressor>>,
    pub lossless: Option<Box<dyn LosslessOptimizer>>,
}

impl Toolbox {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_resizer(mut self, resizer: impl Resizer + 'static) -> Self {
        self.resizer = Some(Box::new(resizer));
        self
    }

    pub fn with_lossy(mut self, lossy: impl LossyCompressor + 'static) -> Self {
        self.lossy = Some(Box::new(lossy));
        self
    }

    pub fn with_lossless(mut self, lossless: impl LosslessOptimizer + 'static) -> Self {
        self.lossless = Some(Box::new(lossless));
        self
    }

    /// Which capabilities have an implementation
    pub fn capabilities(&self) -> Capabilities {
        let mut capabilities = BTreeSet::new();
        if self.resizer.is_some() {
            capabilities.insert(Capability::Resize);
        }
        if self.lossy.is_some() {
            capabilities.insert(Capability::LossyCompress);
        }
        if self.lossless.is_some() {
            capabilities.insert(Capability::LosslessCompress);
        }
        Capabilities(capabilities)
    }
}

/// Availability of one candidate tool, for the `--check-tools` report
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub capability: Capability,
    pub tool: String,
    pub path: Option<std::path::PathBuf>,
    pub selected: bool,
}

/// Looks up the configured tools
pub struct ToolDetector<'a> {
    config: &'a Config,
    resolver: ToolPathResolver,
}

impl<'a> ToolDetector<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self::with_resolver(config, ToolPathResolver::new())
    }

    pub fn with_resolver(config: &'a Config, resolver: ToolPathResolver) -> Self {
        Self { config, resolver }
    }

    /// Capabilities present in the environment
    pub fn capabilities(&self) -> Capabilities {
        self.detect().capabilities()
    }

    /// Bind each capability to its preferred available tool
    pub fn detect(&self) -> Toolbox {
        let mut toolbox = Toolbox::empty();

        if let Some((tool, backend)) = self.first_available(&self.config.resize_tools, ResizeBackend::for_tool) {
            debug!("Resize capability: {}", tool.name);
            toolbox.resizer = Some(Box::new(ExternalResizer::new(tool, backend)));
        }

        // pngquant is the only lossy dialect we speak
        let lossy_dialect = |name: &str| (name == "pngquant").then_some(());
        if let Some((tool, ())) = self.first_available(&self.config.lossy_tools, lossy_dialect) {
            debug!("Lossy capability: {}", tool.name);
            toolbox.lossy = Some(Box::new(Pngquant::new(tool, self.config.lossy_speed)));
        }

        if let Some((tool, backend)) = self.first_available(&self.config.lossless_tools, LosslessBackend::for_tool) {
            debug!("Lossless capability: {}", tool.name);
            toolbox.lossless = Some(Box::new(ExternalLosslessOptimizer::new(
                tool,
                backend,
                self.config.lossless_level,
            )));
        }

        toolbox
    }

    /// Status of every configured tool, in preference order per capability
    pub fn report(&self) -> Vec<ToolStatus> {
        let groups = [
            (Capability::Resize, &self.config.resize_tools),
            (Capability::LossyCompress, &self.config.lossy_tools),
            (Capability::LosslessCompress, &self.config.lossless_tools),
        ];

        let mut statuses = Vec::new();
        for (capability, tools) in groups {
            let mut selected_one = false;
            for tool in tools {
                let path = self.resolver.resolve_tool(tool);
                let selected = !selected_one && path.is_some() && is_known_tool(capability, tool);
                selected_one |= selected;
                statuses.push(ToolStatus {
                    capability,
                    tool: tool.clone(),
                    path,
                    selected,
                });
            }
        }
        statuses
    }

    fn first_available<B>(
        &self,
        tools: &[String],
        dialect: impl Fn(&str) -> Option<B>,
    ) -> Option<(ResolvedTool, B)> {
        tools.iter().find_map(|name| {
            let Some(backend) = dialect(name) else {
                warn!("Unknown tool '{}' in configuration, ignoring", name);
                return None;
            };
            self.resolver
                .resolve(name, self.config.tool_timeout())
                .map(|tool| (tool, backend))
        })
    }
}

fn is_known_tool(capability: Capability, tool: &str) -> bool {
    match capability {
        Capability::Resize => ResizeBackend::for_tool(tool).is_some(),
        Capability::LossyCompress => tool == "pngquant",
        Capability::LosslessCompress => LosslessBackend::for_tool(tool).is_some(),
    }
}

/// Human-readable availability report
pub fn format_report(statuses: &[ToolStatus]) -> String {
    let mut report = String::from("Tool availability:\n");
    let mut current: Option<Capability> = None;

    for status in statuses {
        if current != Some(status.capability) {
            report.push_str(&format!("\n{}:\n", status.capability));
            current = Some(status.capability);
        }
        match status.path {
            Some(ref path) => {
                let marker = if status.selected { " (selected)" } else { "" };
                report.push_str(&format!("  ✅ {} -> {}{}\n", status.tool, path.display(), marker));
            }
            None => {
                report.push_str(&format!(
                    "  ❌ {} (install with: {})\n",
                    status.tool,
                    ToolPathResolver::install_hint(&status.tool)
                ));
            }
        }
    }
    report
}
