//! # Progress Module
//!
//! Spinner on stderr showing which pipeline step is running, so long tool
//! runs (pngquant on a large banner, optipng at high levels) give feedback.
//!
//! ```text
//! ⠋ [00:00:03] banner.png: lossy compression (65-80)
//! ```
//!
//! The spinner is hidden when stderr is not a terminal, and can be disabled
//! entirely with [`ProgressManager::hidden`] (used by `--quiet` and tests).

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Manages the step spinner
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Visible spinner on stderr
    pub fn visible() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Spinner that never draws
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Show the step currently running
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Remove the spinner from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }
}
