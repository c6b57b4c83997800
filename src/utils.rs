//! # Utility Functions Module
//!
//! Small helpers shared by the tool wrappers and the report: building
//! argument lists for external commands and formatting byte sizes.

use std::ffi::{OsStr, OsString};

/// Builds a `Vec<OsString>` argument list for an external command.
///
/// Every item goes through `OsString::from`, so string literals, `String`s
/// and paths can be mixed without lossy conversions:
///
/// ```rust,ignore
/// let args = args!["--quality", format!("{}-{}", 65, 80), "--output", &output, "--", &input];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$(::std::ffi::OsString::from($item)),*]
    };
}

/// Renders a command line for logging; not meant to be fed back to a shell.
pub fn display_command(program: &OsStr, args: &[OsString]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(|arg| arg.as_os_str()))
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Get human-readable file size
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut unit_index = 0;

    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit_index])
    }
}
