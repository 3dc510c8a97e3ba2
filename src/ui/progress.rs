//! Transfer progress with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress indicator for a single upload or download.
///
/// Cheap to clone and `Send`, so it can be handed to the blocking thread
/// that performs the transfer and updated from there.
#[derive(Clone)]
pub struct TransferProgress {
    bar: Option<ProgressBar>,
    label: String,
}

impl TransferProgress {
    /// Start a progress indicator labelled e.g. `Downloading Alamofire 5.8.1`
    pub fn start(ctx: &UiContext, label: impl Into<String>) -> Self {
        let label = label.into();
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(0);
            if let Ok(bar_style) = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} {prefix}  {bar:24.cyan/dim} {bytes}/{total_bytes} {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(
                    bar_style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .progress_chars("━╸─"),
                );
            }
            bar.set_prefix(label.clone());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("{} {}...", style("...").dim(), label);
            None
        };
        Self { bar, label }
    }

    /// Report `done` bytes transferred out of `total` (if known)
    pub fn update(&self, done: u64, total: Option<u64>) {
        if let Some(ref bar) = self.bar {
            if let Some(total) = total {
                bar.set_length(total);
            }
            bar.set_position(done);
        }
    }

    /// Finish with the number of bytes moved
    pub fn finish(&self, bytes: u64) {
        match self.bar {
            Some(ref bar) => {
                bar.disable_steady_tick();
                bar.finish_and_clear();
            }
            None => {
                println!("{} {} ({})", style("[OK]").green(), self.label, HumanBytes(bytes));
            }
        }
    }

    /// Clear the indicator after a failed transfer
    pub fn abandon(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
