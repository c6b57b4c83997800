//! In-process stand-ins for the external tools, plus PNG fixtures.

use crate::compressor::{LosslessOptimizer, LossyCompressor};
use crate::error::ToolError;
use crate::request::QualityRange;
use crate::resize::{fit_within, Resizer};
use async_trait::async_trait;
use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Noisy RGBA image so the encoded file is not trivially small
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(31) ^ y.wrapping_mul(17);
        Rgba([v as u8, (v >> 3) as u8, (x + y) as u8, 255])
    });
    img.save_with_format(&path, ImageFormat::Png).unwrap();
    path
}

/// Valid PNG followed by `padding` zero bytes, which [`FakeLossless::strip_padding`] removes
pub fn write_padded_png(dir: &Path, name: &str, width: u32, height: u32, padding: usize) -> PathBuf {
    let path = write_png(dir, name, width, height);
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&vec![0u8; padding]).unwrap();
    path
}

fn fake_failure(tool: &str) -> ToolError {
    ToolError::Failed {
        tool: tool.to_string(),
        code: Some(1),
    }
}

/// Resizes with the `image` crate, recording every output path it was given
pub struct FakeResizer {
    fail: bool,
    outputs: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeResizer {
    pub fn new() -> Self {
        Self {
            fail: false,
            outputs: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            outputs: Arc::default(),
        }
    }

    pub fn outputs(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        Arc::clone(&self.outputs)
    }
}

#[async_trait]
impl Resizer for FakeResizer {
    async fn resize(&self, input: &Path, max_dim: u32, output: &Path) -> Result<(), ToolError> {
        self.outputs.lock().unwrap().push(output.to_path_buf());
        if self.fail {
            return Err(fake_failure("fake-resize"));
        }

        let img = image::open(input).map_err(|_| fake_failure("fake-resize"))?;
        let (w, h) = img.dimensions();
        let (width, height) = fit_within(w, h, max_dim);
        img.resize_exact(width, height, image::imageops::FilterType::Triangle)
            .save_with_format(output, ImageFormat::Png)
            .map_err(|_| fake_failure("fake-resize"))
    }
}

#[derive(Clone, Copy)]
enum LossyBehavior {
    Shrink(f64),
    Enlarge { honor_skip: bool },
    Fail,
    Hang,
}

/// Lossy compressor that truncates or pads the input bytes
pub struct FakeLossy {
    behavior: LossyBehavior,
    ranges: Arc<Mutex<Vec<QualityRange>>>,
}

impl FakeLossy {
    fn with(behavior: LossyBehavior) -> Self {
        Self {
            behavior,
            ranges: Arc::default(),
        }
    }

    /// Keeps `ratio` of the input bytes
    pub fn shrinking(ratio: f64) -> Self {
        Self::with(LossyBehavior::Shrink(ratio))
    }

    /// Would grow the file; reports it like pngquant's skip-if-larger
    pub fn enlarging() -> Self {
        Self::with(LossyBehavior::Enlarge { honor_skip: true })
    }

    /// Grows the file and reports success anyway
    pub fn enlarging_ignoring_flag() -> Self {
        Self::with(LossyBehavior::Enlarge { honor_skip: false })
    }

    pub fn failing() -> Self {
        Self::with(LossyBehavior::Fail)
    }

    /// Writes part of its output, then never finishes
    pub fn hanging() -> Self {
        Self::with(LossyBehavior::Hang)
    }

    pub fn ranges(&self) -> Arc<Mutex<Vec<QualityRange>>> {
        Arc::clone(&self.ranges)
    }
}

#[async_trait]
impl LossyCompressor for FakeLossy {
    async fn compress(
        &self,
        input: &Path,
        range: QualityRange,
        skip_if_larger: bool,
        output: &Path,
    ) -> Result<(), ToolError> {
        self.ranges.lock().unwrap().push(range);
        let mut bytes = std::fs::read(input).map_err(|_| fake_failure("fake-lossy"))?;

        match self.behavior {
            LossyBehavior::Shrink(ratio) => {
                let keep = ((bytes.len() as f64 * ratio) as usize).max(1);
                bytes.truncate(keep);
            }
            LossyBehavior::Enlarge { honor_skip } => {
                if honor_skip && skip_if_larger {
                    return Err(ToolError::WouldEnlarge {
                        tool: "fake-lossy".to_string(),
                    });
                }
                bytes.extend_from_slice(&[1u8; 64]);
            }
            LossyBehavior::Fail => return Err(fake_failure("fake-lossy")),
            LossyBehavior::Hang => {
                bytes.truncate(bytes.len() / 2);
                std::fs::write(output, bytes).map_err(|_| fake_failure("fake-lossy"))?;
                return std::future::pending().await;
            }
        }

        std::fs::write(output, bytes).map_err(|_| fake_failure("fake-lossy"))
    }
}

/// In-place optimizer that strips trailing zero bytes, so it is idempotent
pub struct FakeLossless {
    fail: bool,
}

impl FakeLossless {
    pub fn strip_padding() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl LosslessOptimizer for FakeLossless {
    async fn optimize(&self, path: &Path) -> Result<(), ToolError> {
        if self.fail {
            // Leave a partial file behind, as a crashing optimizer might
            let _ = std::fs::write(path, b"garbage");
            return Err(fake_failure("fake-lossless"));
        }

        let mut bytes = std::fs::read(path).map_err(|_| fake_failure("fake-lossless"))?;
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        std::fs::write(path, bytes).map_err(|_| fake_failure("fake-lossless"))
    }
}
