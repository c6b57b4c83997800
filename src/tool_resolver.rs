//! # Tool Path Resolver
//!
//! Finds the external binaries the pipeline drives:
//! - A directory named by `PNG_MINIFY_TOOLS_DIR` (checked first, for bundled tools)
//! - The system `PATH`
//!
//! A resolved binary is wrapped in [`ResolvedTool`], which knows how to run
//! itself with a timeout and turn process failures into [`ToolError`]s.

use crate::error::ToolError;
use crate::utils::display_command;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variable pointing at a directory of bundled tools
pub const TOOLS_DIR_ENV: &str = "PNG_MINIFY_TOOLS_DIR";

/// Tool path resolver for bundled and system tools
#[derive(Debug, Clone, Default)]
pub struct ToolPathResolver {
    /// Directory searched before `PATH`
    tools_dir: Option<PathBuf>,
    /// Search path, `None` means the process `PATH`
    search_path: Option<OsString>,
}

impl ToolPathResolver {
    /// Resolver using `PNG_MINIFY_TOOLS_DIR` and the process `PATH`
    pub fn new() -> Self {
        let tools_dir = env::var_os(TOOLS_DIR_ENV)
            .map(PathBuf::from)
            .filter(|dir| {
                let exists = dir.is_dir();
                if !exists {
                    warn!("{} points to a missing directory: {}", TOOLS_DIR_ENV, dir.display());
                }
                exists
            });

        Self {
            tools_dir,
            search_path: None,
        }
    }

    /// Resolver restricted to the given directories, ignoring the environment
    pub fn with_search_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let search_path = env::join_paths(dirs.into_iter().map(|d| d.as_ref().to_path_buf())).ok();
        Self {
            tools_dir: None,
            search_path: Some(search_path.unwrap_or_default()),
        }
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        let executable = executable_name(tool_name);

        if let Some(ref tools_dir) = self.tools_dir {
            let bundled = tools_dir.join(&executable);
            if is_executable(&bundled) {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled);
                return Some(bundled);
            }
        }

        let search_path = match self.search_path {
            Some(ref path) => path.clone(),
            None => env::var_os("PATH")?,
        };
        if search_path.is_empty() {
            return None;
        }

        let found = env::split_paths(&search_path)
            .map(|dir| dir.join(&executable))
            .find(|path| is_executable(path));

        match found {
            Some(ref path) => debug!("Resolved tool: {} -> {:?}", tool_name, path),
            None => debug!("Tool not found: {}", tool_name),
        }
        found
    }

    /// Resolve a tool into something runnable
    pub fn resolve(&self, tool_name: &str, timeout: Duration) -> Option<ResolvedTool> {
        self.resolve_tool(tool_name).map(|path| ResolvedTool {
            name: tool_name.to_string(),
            path,
            timeout,
        })
    }

    /// Check if a specific tool is available
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        self.resolve_tool(tool_name).is_some()
    }

    /// Installation hint for a missing tool
    pub fn install_hint(tool_name: &str) -> String {
        if cfg!(target_os = "macos") {
            match tool_name {
                "sips" => "ships with macOS".to_string(),
                "magick" | "convert" => "brew install imagemagick".to_string(),
                _ => format!("brew install {}", tool_name),
            }
        } else {
            match tool_name {
                "sips" => "macOS only".to_string(),
                "magick" | "convert" => "sudo apt-get install imagemagick".to_string(),
                "vips" => "sudo apt-get install libvips-tools".to_string(),
                "oxipng" => "cargo install oxipng".to_string(),
                _ => format!("sudo apt-get install {}", tool_name),
            }
        }
    }
}

fn executable_name(tool_name: &str) -> String {
    if cfg!(windows) && !tool_name.ends_with(".exe") {
        format!("{}.exe", tool_name)
    } else {
        tool_name.to_string()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// An external binary found on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub name: String,
    pub path: PathBuf,
    pub timeout: Duration,
}

impl ResolvedTool {
    /// Run the tool to completion, capturing its output.
    ///
    /// A non-zero exit is not an error here; callers interpret exit codes.
    /// The child is killed if the timeout fires or the future is dropped.
    pub async fn run(&self, args: &[OsString]) -> Result<Output, ToolError> {
        debug!("Running: {}", display_command(self.path.as_os_str(), args));

        let start_time = Instant::now();
        let output = Command::new(&self.path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| ToolError::Timeout {
                tool: self.name.clone(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|source| ToolError::Spawn {
                tool: self.name.clone(),
                source,
            })?;

        let elapsed = start_time.elapsed();
        if output.status.success() {
            debug!("{} completed successfully in {:?}", self.name, elapsed);
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("{} failed after {:?} ({}): {}", self.name, elapsed, output.status, stderr.trim());
        }

        Ok(output)
    }

    /// Run the tool and require a zero exit status
    pub async fn run_checked(&self, args: &[OsString]) -> Result<Output, ToolError> {
        let output = self.run(args).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(ToolError::Failed {
                tool: self.name.clone(),
                code: output.status.code(),
            })
        }
    }
}
