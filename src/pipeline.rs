//! End-to-end resolution of a project's dependencies
//!
//! Order of work for one run:
//!
//! 1. prune stamps of dependencies that left the manifests
//! 2. buildable dependencies, in manifest order: resolve through the cache
//!    tiers, otherwise build and publish
//! 3. binary-only dependencies, in manifest order: resolve through the
//!    cache tiers, otherwise abort the run
//! 4. convert leftover fat frameworks into `.xcframework` bundles
//!
//! Everything runs sequentially. The first fatal error ends the run.

use crate::build::DependencyBuilder;
use crate::dependency::{Dependency, NetworkMode};
use crate::error::{CartwheelError, CartwheelResult};
use crate::ledger::VersionLedger;
use crate::manifest::Manifest;
use crate::publish::{PublishOutcome, Publisher};
use crate::repackage::{RepackageOutcome, Repackager};
use crate::resolver::{ArtifactSource, CacheResolver, Resolution};
use crate::ui::{self, UiContext};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// What happened to one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyOutcome {
    Satisfied,
    Installed(ArtifactSource),
    Built(PublishOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    pub dependency: Dependency,
    pub outcome: DependencyOutcome,
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Names whose stamps were removed
    pub pruned: Vec<String>,
    /// Buildable dependencies followed by binary-only ones
    pub dependencies: Vec<DependencyReport>,
    pub repackaged: Vec<RepackageOutcome>,
}

impl PipelineReport {
    pub fn outcome_of(&self, name: &str) -> Option<&DependencyOutcome> {
        self.dependencies
            .iter()
            .find(|report| report.dependency.name == name)
            .map(|report| &report.outcome)
    }

    pub fn built(&self) -> usize {
        self.count(|outcome| matches!(outcome, DependencyOutcome::Built(_)))
    }

    pub fn installed(&self) -> usize {
        self.count(|outcome| matches!(outcome, DependencyOutcome::Installed(_)))
    }

    pub fn satisfied(&self) -> usize {
        self.count(|outcome| matches!(outcome, DependencyOutcome::Satisfied))
    }

    fn count(&self, predicate: impl Fn(&DependencyOutcome) -> bool) -> usize {
        self.dependencies
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }
}

pub struct Pipeline {
    ledger: VersionLedger,
    resolver: CacheResolver,
    publisher: Publisher,
    builder: Arc<dyn DependencyBuilder>,
    repackager: Repackager,
    mode: NetworkMode,
    ui: UiContext,
    prepared: OnceCell<()>,
}

impl Pipeline {
    pub fn new(
        ledger: VersionLedger,
        resolver: CacheResolver,
        publisher: Publisher,
        builder: Arc<dyn DependencyBuilder>,
        repackager: Repackager,
        mode: NetworkMode,
        ui: UiContext,
    ) -> Self {
        Self {
            ledger,
            resolver,
            publisher,
            builder,
            repackager,
            mode,
            ui,
            prepared: OnceCell::new(),
        }
    }

    /// Resolve every dependency of `manifest`. Buildable versions must
    /// already carry the toolchain suffix.
    pub async fn run(&self, manifest: &Manifest) -> CartwheelResult<PipelineReport> {
        let mut report = PipelineReport {
            pruned: self.ledger.prune_unreferenced(&manifest.all()).await?,
            ..PipelineReport::default()
        };

        if !manifest.buildable.is_empty() {
            ui::section(&self.ui, "Buildable dependencies");
        }
        let total = manifest.buildable.len();
        for (index, dep) in manifest.buildable.iter().enumerate() {
            info!("[buildable {}/{}] {}", index + 1, total, dep);
            let outcome = self.buildable(dep).await?;
            self.show(dep, &outcome);
            report.dependencies.push(DependencyReport {
                dependency: dep.clone(),
                outcome,
            });
        }

        if !manifest.binary_only.is_empty() {
            ui::section(&self.ui, "Binary-only dependencies");
        }
        let total = manifest.binary_only.len();
        for (index, dep) in manifest.binary_only.iter().enumerate() {
            info!("[binary-only {}/{}] {}", index + 1, total, dep);
            let outcome = self.binary_only(dep).await?;
            self.show(dep, &outcome);
            report.dependencies.push(DependencyReport {
                dependency: dep.clone(),
                outcome,
            });
        }

        report.repackaged = self.repackager.run().await?;
        for outcome in &report.repackaged {
            match outcome {
                RepackageOutcome::Converted(path) => {
                    ui::step_ok(&self.ui, &format!("Created {}", path.display()))
                }
                RepackageOutcome::Skipped(name) => ui::step_skip(&self.ui, &format!("Skipped {}", name)),
            }
        }

        Ok(report)
    }

    async fn buildable(&self, dep: &Dependency) -> CartwheelResult<DependencyOutcome> {
        match self.resolver.resolve(dep, self.mode.downloads_allowed()).await? {
            Resolution::Satisfied => Ok(DependencyOutcome::Satisfied),
            Resolution::Installed(source) => Ok(DependencyOutcome::Installed(source)),
            Resolution::NeedsBuild => {
                self.prepare_once().await?;
                ui::step_info(&self.ui, &format!("Building {}", dep));
                let outcome = self
                    .publisher
                    .build_and_publish(dep, self.mode.uploads_allowed())
                    .await?;
                Ok(DependencyOutcome::Built(outcome))
            }
        }
    }

    async fn binary_only(&self, dep: &Dependency) -> CartwheelResult<DependencyOutcome> {
        match self.resolver.resolve(dep, self.mode.downloads_allowed()).await? {
            Resolution::Satisfied => Ok(DependencyOutcome::Satisfied),
            Resolution::Installed(source) => Ok(DependencyOutcome::Installed(source)),
            Resolution::NeedsBuild => {
                error!(
                    "Unable to obtain binary-only dependency {} from {}",
                    dep,
                    dep.source_description()
                );
                Err(CartwheelError::BinaryUnavailable {
                    name: dep.name.clone(),
                    version: dep.version.clone(),
                    source_url: dep.source_description().to_string(),
                })
            }
        }
    }

    /// Check out sources the first time something has to be built
    async fn prepare_once(&self) -> CartwheelResult<()> {
        self.prepared
            .get_or_try_init(|| async {
                ui::step_info(&self.ui, "Checking out sources");
                self.builder.prepare().await
            })
            .await?;
        Ok(())
    }

    fn show(&self, dep: &Dependency, outcome: &DependencyOutcome) {
        let label = dep.to_string();
        match outcome {
            DependencyOutcome::Satisfied => ui::step_skip(&self.ui, &format!("{} is up to date", label)),
            DependencyOutcome::Installed(source) => {
                ui::step_ok_detail(&self.ui, &format!("Installed {}", label), &source.to_string())
            }
            DependencyOutcome::Built(PublishOutcome::Uploaded(_)) => {
                ui::step_ok_detail(&self.ui, &format!("Built {}", label), "uploaded")
            }
            DependencyOutcome::Built(PublishOutcome::AlreadyPublished) => {
                ui::step_ok_detail(&self.ui, &format!("Built {}", label), "already published")
            }
            DependencyOutcome::Built(PublishOutcome::UploadsDisabled) => {
                ui::step_ok_detail(&self.ui, &format!("Built {}", label), "cached locally")
            }
            DependencyOutcome::Built(PublishOutcome::RegistryUnconfigured) => {
                ui::step_warn(&self.ui, &format!("Built {}, no registry configured for upload", label))
            }
            DependencyOutcome::Built(PublishOutcome::NothingChanged) => {
                ui::step_warn(&self.ui, &format!("Built {}, no bundle changed", label))
            }
        }
    }
}
