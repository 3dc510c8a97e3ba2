//! Building dependencies from source with Carthage

use crate::dependency::Dependency;
use crate::error::{CartwheelError, CartwheelResult};
use crate::fsutil;
use crate::shell::{CommandSpec, OutputLevel, ShellRunner};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const XCCONFIG_FILE: &str = "carthage.xcconfig";
const XCCONFIG_ENV: &str = "XCODE_XCCONFIG_FILE";

/// Build settings that keep module debug info free of absolute paths, so
/// frameworks built on one machine can be debugged on another
const XCCONFIG_CONTENTS: &str = "SWIFT_SERIALIZE_DEBUGGING_OPTIONS = NO\n\
OTHER_SWIFT_FLAGS = $(inherited) -Xfrontend -no-serialize-debugging-options\n";

/// Produces bundles for one dependency at a time
#[async_trait]
pub trait DependencyBuilder: Send + Sync {
    /// Check out sources of all dependencies without building
    async fn prepare(&self) -> CartwheelResult<()>;

    /// Build `dep` into the build output root
    async fn build(&self, dep: &Dependency) -> CartwheelResult<()>;
}

/// Drives the `carthage` CLI
pub struct CarthageBuilder {
    shell: Arc<dyn ShellRunner>,
    command: String,
    project_dir: PathBuf,
    build_root: PathBuf,
    platform: String,
}

impl CarthageBuilder {
    pub fn new(
        shell: Arc<dyn ShellRunner>,
        command: impl Into<String>,
        project_dir: impl Into<PathBuf>,
        build_root: impl Into<PathBuf>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            shell,
            command: command.into(),
            project_dir: project_dir.into(),
            build_root: build_root.into(),
            platform: platform.into(),
        }
    }

    fn xcconfig_path(&self) -> PathBuf {
        self.build_root.join(XCCONFIG_FILE)
    }

    fn bootstrap_command(&self) -> CommandSpec {
        CommandSpec::new(&self.command)
            .args(["bootstrap", "--no-build", "--no-use-binaries", "--use-ssh"])
            .current_dir(&self.project_dir)
            .output(OutputLevel::Info)
    }

    fn build_command(&self, dep: &Dependency) -> CommandSpec {
        CommandSpec::new(&self.command)
            .arg("build")
            .arg(&dep.name)
            .args(["--use-xcframeworks", "--no-use-binaries", "--platform"])
            .arg(&self.platform)
            .env(XCCONFIG_ENV, self.xcconfig_path().to_string_lossy().into_owned())
            .current_dir(&self.project_dir)
            .output(OutputLevel::Info)
    }
}

#[async_trait]
impl DependencyBuilder for CarthageBuilder {
    async fn prepare(&self) -> CartwheelResult<()> {
        info!("Checking out dependencies");
        self.shell.run(&self.bootstrap_command()).await?;
        Ok(())
    }

    async fn build(&self, dep: &Dependency) -> CartwheelResult<()> {
        fsutil::ensure_dir(&self.build_root).await?;
        let xcconfig = self.xcconfig_path();
        tokio::fs::write(&xcconfig, XCCONFIG_CONTENTS)
            .await
            .map_err(|e| CartwheelError::io(format!("writing {}", xcconfig.display()), e))?;

        info!("Building {}", dep);
        self.shell
            .run(&self.build_command(dep))
            .await
            .map_err(|e| CartwheelError::DependencyBuild {
                name: dep.name.clone(),
                source: Box::new(e),
            })?;
        Ok(())
    }
}
