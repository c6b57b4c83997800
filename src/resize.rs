//! # Image Resize Module
//!
//! Ridimensionamento tramite **tool esterni**, limitando il lato più lungo
//! ad una dimensione massima e preservando l'aspect ratio.
//!
//! ## Tool Strategy
//! **Priorità Tool (decrescente, configurabile):**
//! 1. **sips** (macOS) - `sips -Z N`
//! 2. **magick** (ImageMagick 7.x) - `-resize NxN>`
//! 3. **convert** (ImageMagick 6.x/legacy) - `-resize NxN>`
//! 4. **vips** (libvips) - `thumbnail --size down`
//!
//! La geometria attesa è calcolata da [`fit_within`]; il crate `image` legge
//! solo l'header PNG per conoscere le dimensioni, nessuna decodifica dei pixel.

use crate::args;
use crate::error::ToolError;
use crate::tool_resolver::ResolvedTool;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

/// External resize capability: writes `input` scaled so its longest side is
/// `max_dim` to `output`.
#[async_trait]
pub trait Resizer: Send + Sync {
    async fn resize(&self, input: &Path, max_dim: u32, output: &Path) -> Result<(), ToolError>;
}

/// Command line dialect of a resize tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeBackend {
    Sips,
    ImageMagick,
    Vips,
}

impl ResizeBackend {
    /// Backend for a known tool name
    pub fn for_tool(tool_name: &str) -> Option<Self> {
        match tool_name {
            "sips" => Some(Self::Sips),
            "magick" | "convert" => Some(Self::ImageMagick),
            "vips" => Some(Self::Vips),
            _ => None,
        }
    }

    /// Arguments for shrinking `input` into `output` with the longest side at `max_dim`
    pub fn build_args(&self, input: &Path, max_dim: u32, output: &Path) -> Vec<OsString> {
        match self {
            ResizeBackend::Sips => args![
                "-s", "format", "png",
                "-Z", max_dim.to_string(),
                input,
                "--out", output,
            ],
            // `>` only shrinks, never enlarges
            ResizeBackend::ImageMagick => {
                let mut target = OsString::from("PNG:");
                target.push(output.as_os_str());
                args![
                    input,
                    "-resize", format!("{}x{}>", max_dim, max_dim),
                    target,
                ]
            }
            ResizeBackend::Vips => args![
                "thumbnail",
                input,
                output,
                max_dim.to_string(),
                "--height", max_dim.to_string(),
                "--size", "down",
            ],
        }
    }
}

/// Resizer backed by an external binary
#[derive(Debug, Clone)]
pub struct ExternalResizer {
    tool: ResolvedTool,
    backend: ResizeBackend,
}

impl ExternalResizer {
    pub fn new(tool: ResolvedTool, backend: ResizeBackend) -> Self {
        Self { tool, backend }
    }
}

#[async_trait]
impl Resizer for ExternalResizer {
    async fn resize(&self, input: &Path, max_dim: u32, output: &Path) -> Result<(), ToolError> {
        let args = self.backend.build_args(input, max_dim, output);
        self.tool.run_checked(&args).await?;

        // Some tools exit 0 without writing anything on unreadable input
        let written = tokio::fs::metadata(output)
            .await
            .map_err(|source| ToolError::MissingOutput {
                tool: self.tool.name.clone(),
                source,
            })?;
        if written.len() == 0 {
            return Err(ToolError::MissingOutput {
                tool: self.tool.name.clone(),
                source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "empty output file"),
            });
        }

        debug!("Resized {} to max {} px with {}", input.display(), max_dim, self.tool.name);
        Ok(())
    }
}

/// Dimensions after clamping the longest side to `max_dim`, preserving aspect ratio.
///
/// Images already within bounds are returned unchanged. The shorter side is
/// rounded to the nearest pixel and never drops below 1.
pub fn fit_within(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dim || longest == 0 {
        return (width, height);
    }

    let scale = |side: u32| -> u32 {
        let scaled = (side as u64 * max_dim as u64 + longest as u64 / 2) / longest as u64;
        (scaled as u32).max(1)
    };

    if width >= height {
        (max_dim, scale(height))
    } else {
        (scale(width), max_dim)
    }
}

/// Width and height from the image header, `None` if it cannot be read
pub fn read_dimensions(path: &Path) -> Option<(u32, u32)> {
    match image::image_dimensions(path) {
        Ok(dims) => Some(dims),
        Err(e) => {
            debug!("Could not read dimensions of {}: {}", path.display(), e);
            None
        }
    }
}
