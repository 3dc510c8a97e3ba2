//! Converting fat `.framework` bundles into `.xcframework` bundles
//!
//! A fat framework carries one binary with both a simulator and a device
//! architecture. Xcode wants one slice per platform instead, so every fat
//! bundle in `<build>/<platform>/` is copied once per architecture, thinned
//! to that architecture and assembled into `<build>/<Name>.xcframework`.
//!
//! Layout while a bundle is being converted:
//!
//! ```text
//! Carthage/Build/
//!   iOS/
//!     Lottie.framework            consumed, removed at the end
//!     sliced/Lottie/x86_64/Lottie.framework
//!     sliced/Lottie/arm64/Lottie.framework
//!   tmp_Lottie.xcframework        assembled here, then renamed
//!   Lottie.xcframework
//! ```

use crate::error::{CartwheelError, CartwheelResult};
use crate::fsutil::{self, ScratchPath};
use crate::shell::{CommandSpec, OutputLevel, ShellRunner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const FRAMEWORK_SUFFIX: &str = ".framework";
const XCFRAMEWORK_EXTENSION: &str = "xcframework";
const SLICED_DIR: &str = "sliced";
const TMP_PREFIX: &str = "tmp_";

/// External tooling for binary slices
#[async_trait]
pub trait SliceTool: Send + Sync {
    /// Human-readable list of the architectures in `binary`
    async fn describe(&self, binary: &Path) -> CartwheelResult<String>;

    /// Reduce `binary` to the single architecture `arch`, in place
    async fn thin(&self, binary: &Path, arch: &str) -> CartwheelResult<()>;

    /// Combine single-architecture frameworks into one `.xcframework`
    async fn assemble(&self, frameworks: &[PathBuf], output: &Path) -> CartwheelResult<()>;
}

/// `xcrun lipo` and `xcodebuild -create-xcframework`
pub struct XcodeTools {
    shell: Arc<dyn ShellRunner>,
}

impl XcodeTools {
    pub fn new(shell: Arc<dyn ShellRunner>) -> Self {
        Self { shell }
    }
}

#[async_trait]
impl SliceTool for XcodeTools {
    async fn describe(&self, binary: &Path) -> CartwheelResult<String> {
        let spec = CommandSpec::new("xcrun")
            .args(["lipo", "-info"])
            .path_arg(binary)
            .output(OutputLevel::Debug);
        Ok(self.shell.run(&spec).await?.text())
    }

    async fn thin(&self, binary: &Path, arch: &str) -> CartwheelResult<()> {
        let spec = CommandSpec::new("xcrun")
            .args(["lipo", "-thin", arch])
            .path_arg(binary)
            .arg("-o")
            .path_arg(binary)
            .output(OutputLevel::Debug);
        self.shell.run(&spec).await?;
        Ok(())
    }

    async fn assemble(&self, frameworks: &[PathBuf], output: &Path) -> CartwheelResult<()> {
        let mut spec = CommandSpec::new("xcodebuild").arg("-create-xcframework");
        for framework in frameworks {
            spec = spec.arg("-framework").path_arg(framework);
        }
        let spec = spec.arg("-output").path_arg(output).output(OutputLevel::Info);
        self.shell.run(&spec).await?;
        Ok(())
    }
}

/// Which bundles to convert and into which slices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepackagePolicy {
    /// Directory under the build root holding fat bundles (`iOS`)
    pub platform_dir: String,
    /// Architecture of the simulator slice
    pub simulator_arch: String,
    /// Architecture of the device slice
    pub device_arch: String,
    /// Bundle directory names left untouched
    pub skip: Vec<String>,
}

impl Default for RepackagePolicy {
    fn default() -> Self {
        Self {
            platform_dir: "iOS".to_string(),
            simulator_arch: "x86_64".to_string(),
            device_arch: "arm64".to_string(),
            skip: vec!["Firebase.framework".to_string()],
        }
    }
}

/// What happened to one fat bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepackageOutcome {
    Converted(PathBuf),
    Skipped(String),
}

pub struct Repackager {
    tool: Arc<dyn SliceTool>,
    build_root: PathBuf,
    policy: RepackagePolicy,
}

impl Repackager {
    pub fn new(tool: Arc<dyn SliceTool>, build_root: impl Into<PathBuf>, policy: RepackagePolicy) -> Self {
        Self {
            tool,
            build_root: build_root.into(),
            policy,
        }
    }

    /// Convert every fat bundle of the platform directory. The first
    /// failure aborts the run.
    pub async fn run(&self) -> CartwheelResult<Vec<RepackageOutcome>> {
        let platform_dir = self.build_root.join(&self.policy.platform_dir);
        let frameworks = match list_frameworks(&platform_dir).await? {
            Some(frameworks) => frameworks,
            None => {
                debug!("{} does not exist, nothing to repackage", platform_dir.display());
                return Ok(Vec::new());
            }
        };

        let mut outcomes = Vec::with_capacity(frameworks.len());
        for framework in frameworks {
            let name = file_name(&framework);
            if self.policy.skip.contains(&name) {
                info!("Skipped {}", name);
                outcomes.push(RepackageOutcome::Skipped(name));
                continue;
            }

            let output = self
                .convert_in_place(&framework)
                .await
                .map_err(|e| CartwheelError::Repackage {
                    bundle: name,
                    source: Box::new(e),
                })?;
            outcomes.push(RepackageOutcome::Converted(output));
        }
        Ok(outcomes)
    }

    /// `<platform>/X.framework` to `<build>/X.xcframework`, removing the fat
    /// bundle once the result is in place
    async fn convert_in_place(&self, framework: &Path) -> CartwheelResult<PathBuf> {
        let base = fsutil::stem(framework);
        let tmp_output = self
            .build_root
            .join(format!("{}{}.{}", TMP_PREFIX, base, XCFRAMEWORK_EXTENSION));
        let output = self.build_root.join(format!("{}.{}", base, XCFRAMEWORK_EXTENSION));

        fsutil::remove_path(&tmp_output).await?;
        fsutil::remove_path(&output).await?;

        let tmp_guard = ScratchPath::new(tmp_output);
        self.convert(framework, tmp_guard.path()).await?;
        fsutil::move_path(tmp_guard.path(), &output).await?;
        drop(tmp_guard);

        fsutil::remove_path(framework).await?;
        info!("Created {}", output.display());
        Ok(output)
    }

    /// Slice `framework` and assemble the slices at `output`
    pub async fn convert(&self, framework: &Path, output: &Path) -> CartwheelResult<()> {
        if !fsutil::has_suffix(framework, FRAMEWORK_SUFFIX) {
            return Err(CartwheelError::NotAFramework(framework.to_path_buf()));
        }
        if output.extension().and_then(|e| e.to_str()) != Some(XCFRAMEWORK_EXTENSION) {
            return Err(CartwheelError::NotAMultiPlatformBundle(output.to_path_buf()));
        }

        let base = fsutil::stem(framework);
        let bundle_name = file_name(framework);
        let binary = framework.join(&base);
        debug!("{}", self.tool.describe(&binary).await?.trim());

        let parent = framework.parent().unwrap_or_else(|| Path::new("."));
        let sliced_dir = parent.join(SLICED_DIR);
        fsutil::remove_path(&sliced_dir).await?;
        let sliced = ScratchPath::new(sliced_dir);

        let mut slices = Vec::with_capacity(2);
        for arch in [&self.policy.simulator_arch, &self.policy.device_arch] {
            let slice = sliced.path().join(&base).join(arch).join(&bundle_name);
            fsutil::copy_dir_all(framework, &slice).await?;

            let slice_binary = slice.join(&base);
            self.tool.thin(&slice_binary, arch).await?;
            debug!("{}", self.tool.describe(&slice_binary).await?.trim());
            slices.push(slice);
        }

        self.tool.assemble(&slices, output).await?;
        Ok(())
    }
}

/// `*.framework` directories directly in `dir`, sorted; `None` if `dir`
/// does not exist
async fn list_frameworks(dir: &Path) -> CartwheelResult<Option<Vec<PathBuf>>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CartwheelError::io(format!("listing {}", dir.display()), e)),
    };

    let mut found = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CartwheelError::io(format!("listing {}", dir.display()), e))?
    {
        let path = entry.path();
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        if is_dir && fsutil::has_suffix(&path, FRAMEWORK_SUFFIX) {
            found.push(path);
        }
    }
    found.sort();
    Ok(Some(found))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
