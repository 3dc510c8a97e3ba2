//! Bootstrap command - install every dependency, from cache where possible

use crate::config::{Config, ProjectLayout};
use crate::error::CartwheelResult;
use crate::factory::{create_pipeline, Toolbox};
use crate::manifest::Manifest;
use crate::pipeline::PipelineReport;
use crate::registry::Fetcher;
use crate::toolchain;
use crate::ui::{self, UiContext};
use tracing::debug;

/// Execute the bootstrap command
pub async fn execute(config: &Config, layout: &ProjectLayout, ctx: UiContext) -> CartwheelResult<()> {
    ui::intro(&ctx, "cartwheel bootstrap");

    let tools = Toolbox::system(config, layout);
    let report = run(config, layout, &tools, ctx).await?;

    let mut summary = format!(
        "{} up to date, {} installed, {} built",
        report.satisfied(),
        report.installed(),
        report.built()
    );
    if !report.pruned.is_empty() {
        summary.push_str(&format!(", {} stale stamp(s) removed", report.pruned.len()));
    }
    ui::outro_success(&ctx, &summary);
    Ok(())
}

/// Load the manifests, key buildable versions to the toolchain and run
/// the pipeline with `tools`
pub async fn run(
    config: &Config,
    layout: &ProjectLayout,
    tools: &Toolbox,
    ctx: UiContext,
) -> CartwheelResult<PipelineReport> {
    let fetcher: Option<&dyn Fetcher> = if config.network.mode.downloads_allowed() {
        Some(tools.fetcher.as_ref())
    } else {
        debug!("Offline, binary specs are not fetched");
        None
    };
    let mut manifest = Manifest::load(&layout.cartfile_resolved, &layout.binary_manifest, fetcher).await?;

    if !manifest.buildable.is_empty() {
        let version = toolchain::detect_version(tools.shell.as_ref(), &config.build.toolchain_command).await?;
        manifest.buildable = manifest
            .buildable
            .iter()
            .map(|dep| dep.enriched(&version, &config.build.builder_revision))
            .collect();
    }

    create_pipeline(config, layout, tools, ctx).run(&manifest).await
}
