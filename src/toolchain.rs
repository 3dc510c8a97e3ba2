//! Compiler toolchain detection

use crate::error::{CartwheelError, CartwheelResult};
use crate::shell::{CommandSpec, OutputLevel, ShellRunner};
use regex::Regex;
use tracing::info;

/// Run `<command> --version` and extract the first dotted version number
pub async fn detect_version(shell: &dyn ShellRunner, command: &str) -> CartwheelResult<String> {
    let spec = CommandSpec::new(command).arg("--version").output(OutputLevel::Debug);
    let output = shell.run(&spec).await?;
    let version = extract_version(&output.text()).ok_or_else(|| CartwheelError::ToolchainUndetected {
        command: spec.to_string(),
    })?;
    info!("Toolchain version: {}", version);
    Ok(version)
}

fn extract_version(text: &str) -> Option<String> {
    let pattern = Regex::new(r"\d+(\.\d+)+").ok()?;
    pattern.find(text).map(|m| m.as_str().to_string())
}
