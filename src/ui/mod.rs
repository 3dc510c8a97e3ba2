//! UI module for consistent CLI output
//!
//! Uses `cliclack` for step logging and `indicatif` for transfer progress,
//! with automatic fallback to plain lines in CI/non-interactive runs.
//! Diagnostics go through `tracing`; this module is only for the
//! user-facing narrative of a run.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, outro_success, section, step_info, step_ok, step_ok_detail, step_skip, step_warn,
};
pub use progress::TransferProgress;
