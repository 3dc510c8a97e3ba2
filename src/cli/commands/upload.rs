//! Upload command - publish prebuilt xcframeworks to the registry

use crate::archive::{Archiver, ZipTool};
use crate::cache::RemoteCache;
use crate::cli::args::UploadArgs;
use crate::config::Config;
use crate::dependency::{Dependency, ARCHIVE_EXTENSION};
use crate::error::{CartwheelError, CartwheelResult};
use crate::factory::create_registry;
use crate::fsutil::{self, ScratchPath};
use crate::registry::{HttpClient, UploadReceipt};
use crate::shell::SystemShell;
use crate::ui::{self, UiContext};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{error, info};

const XCFRAMEWORK_SUFFIX: &str = ".xcframework";

/// Execute the upload command
pub async fn execute(args: UploadArgs, config: &Config, ctx: UiContext) -> CartwheelResult<()> {
    if let Some(missing) = config.registry.missing_setting() {
        return Err(CartwheelError::RegistryNotConfigured(missing));
    }

    let http = HttpClient::new(Duration::from_secs(config.network.timeout_secs));
    let remote = RemoteCache::new(create_registry(&config.registry, http.clone()), Arc::new(http), ctx);
    let archiver = ZipTool::new(Arc::new(SystemShell));

    ui::intro(&ctx, "cartwheel upload");
    for bundle in &args.bundles {
        let dep = upload_bundle(bundle, args.bundle_version.as_deref(), &remote, &archiver).await?;
        ui::step_ok(&ctx, &format!("Uploaded {}", dep));
    }
    ui::outro_success(&ctx, &format!("{} bundle(s) uploaded", args.bundles.len()));
    Ok(())
}

/// Zip one `.xcframework` next to itself and upload it as
/// `(<bundle stem>, version)`. The zip is removed on every path.
pub async fn upload_bundle(
    bundle: &Path,
    version: Option<&str>,
    remote: &RemoteCache,
    archiver: &dyn Archiver,
) -> CartwheelResult<Dependency> {
    info!("Processing {}", bundle.display());
    if !bundle.is_dir() || !fsutil::has_suffix(bundle, XCFRAMEWORK_SUFFIX) {
        error!("{} is not an xcframework directory", bundle.display());
        return Err(CartwheelError::NotAMultiPlatformBundle(bundle.to_path_buf()));
    }
    let bundle = fsutil::absolute(bundle)?;

    let version = match version {
        Some(version) => version.to_string(),
        None => bundle_version(&bundle).await?,
    };
    let dep = Dependency::new(fsutil::stem(&bundle), version);

    if remote.is_published(&dep).await? {
        error!("Package {} already exists in the registry", dep);
        return Err(CartwheelError::PackageExists {
            name: dep.name,
            version: dep.version,
        });
    }

    let archive = zip_path(&bundle);
    let _scratch = ScratchPath::new(archive.clone());
    archiver.pack(&[bundle.clone()], &archive).await?;
    let receipt: UploadReceipt = remote.upload(&dep, &archive).await?;
    info!("Uploaded {} (HTTP {})", dep, receipt.status);
    Ok(dep)
}

fn zip_path(bundle: &Path) -> PathBuf {
    let mut name = bundle.as_os_str().to_os_string();
    name.push(".");
    name.push(ARCHIVE_EXTENSION);
    PathBuf::from(name)
}

/// `CFBundleShortVersionString` of the first nested framework's Info.plist.
///
/// The plist at the root of an xcframework has no version, so only the
/// ones inside `.framework` directories are considered. XML and binary
/// property lists are both accepted.
pub async fn bundle_version(bundle: &Path) -> CartwheelResult<String> {
    let plist = find_info_plist(bundle)
        .await?
        .ok_or_else(|| CartwheelError::InfoPlistNotFound(bundle.to_path_buf()))?;
    let data = fs::read(&plist)
        .await
        .map_err(|e| CartwheelError::io(format!("reading {}", plist.display()), e))?;
    short_version(&data)?.ok_or(CartwheelError::InfoPlistVersionMissing(plist))
}

async fn find_info_plist(bundle: &Path) -> CartwheelResult<Option<PathBuf>> {
    for framework in fsutil::find_bundles(bundle, ".framework").await? {
        // macOS frameworks keep it under Resources/
        for candidate in [framework.join("Info.plist"), framework.join("Resources/Info.plist")] {
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }
    }
    Ok(None)
}

fn short_version(data: &[u8]) -> CartwheelResult<Option<String>> {
    let plist = plist::Value::from_reader(Cursor::new(data))?;
    Ok(plist
        .as_dictionary()
        .and_then(|dict| dict.get("CFBundleShortVersionString"))
        .and_then(|value| value.as_string())
        .map(|version| version.trim().to_string())
        .filter(|version| !version.is_empty()))
}
