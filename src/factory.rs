//! Construction of the pipeline from configuration
//!
//! Every external effect goes through one of the trait objects collected
//! in [`Toolbox`]. Commands build the system toolbox; tests swap in fakes
//! and reuse [`create_pipeline`] unchanged.

use crate::archive::{Archiver, ZipTool};
use crate::build::{CarthageBuilder, DependencyBuilder};
use crate::cache::{LocalCache, RemoteCache};
use crate::config::schema::RegistryConfig;
use crate::config::{Config, ProjectLayout};
use crate::install::Installer;
use crate::ledger::VersionLedger;
use crate::pipeline::Pipeline;
use crate::publish::Publisher;
use crate::registry::{Fetcher, GitLabRegistry, HttpClient, PackageRegistry, UnconfiguredRegistry};
use crate::repackage::{RepackagePolicy, Repackager, SliceTool, XcodeTools};
use crate::resolver::CacheResolver;
use crate::shell::{ShellRunner, SystemShell};
use crate::ui::UiContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The external tools a run talks to
#[derive(Clone)]
pub struct Toolbox {
    pub shell: Arc<dyn ShellRunner>,
    pub archiver: Arc<dyn Archiver>,
    pub registry: Arc<dyn PackageRegistry>,
    pub fetcher: Arc<dyn Fetcher>,
    pub builder: Arc<dyn DependencyBuilder>,
    pub slicer: Arc<dyn SliceTool>,
}

impl Toolbox {
    /// Real processes and HTTP
    pub fn system(config: &Config, layout: &ProjectLayout) -> Self {
        let shell: Arc<dyn ShellRunner> = Arc::new(SystemShell);
        let http = HttpClient::new(Duration::from_secs(config.network.timeout_secs));

        Self {
            archiver: Arc::new(ZipTool::new(Arc::clone(&shell))),
            registry: create_registry(&config.registry, http.clone()),
            fetcher: Arc::new(http),
            builder: Arc::new(CarthageBuilder::new(
                Arc::clone(&shell),
                config.build.carthage_command.clone(),
                layout.project_dir.clone(),
                layout.build_dir.clone(),
                config.build.platform.clone(),
            )),
            slicer: Arc::new(XcodeTools::new(Arc::clone(&shell))),
            shell,
        }
    }
}

/// GitLab registry, or a stand-in naming the first missing setting
pub fn create_registry(config: &RegistryConfig, http: HttpClient) -> Arc<dyn PackageRegistry> {
    match (config.missing_setting(), &config.api_url, &config.project_id) {
        (None, Some(api_url), Some(project_id)) => Arc::new(GitLabRegistry::new(
            http,
            api_url.clone(),
            project_id.clone(),
            config.token.clone(),
        )),
        (missing, _, _) => {
            let missing = missing.unwrap_or("registry");
            debug!("No package registry: {} is not set", missing);
            Arc::new(UnconfiguredRegistry::new(missing))
        }
    }
}

/// Wire resolver, publisher and repackager around one shared ledger
pub fn create_pipeline(config: &Config, layout: &ProjectLayout, tools: &Toolbox, ui: UiContext) -> Pipeline {
    let ledger = VersionLedger::new(layout.build_dir.clone(), config.build.stamp_extension.clone());
    let local = LocalCache::new(layout.cache_dir.clone());
    let remote = Arc::new(RemoteCache::new(
        Arc::clone(&tools.registry),
        Arc::clone(&tools.fetcher),
        ui,
    ));
    let installer = Installer::new(
        Arc::clone(&tools.archiver),
        layout.build_dir.clone(),
        config.build.platform.clone(),
    );

    let resolver = CacheResolver::new(
        ledger.clone(),
        local.clone(),
        Arc::clone(&remote),
        installer,
        layout.temp_dir.clone(),
    );
    let publisher = Publisher::new(
        ledger.clone(),
        Arc::clone(&tools.builder),
        Arc::clone(&tools.archiver),
        local,
        remote,
        layout.build_dir.clone(),
        layout.temp_dir.clone(),
    );
    let repackager = Repackager::new(
        Arc::clone(&tools.slicer),
        layout.build_dir.clone(),
        repackage_policy(config),
    );

    Pipeline::new(
        ledger,
        resolver,
        publisher,
        Arc::clone(&tools.builder),
        repackager,
        config.network.mode,
        ui,
    )
}

fn repackage_policy(config: &Config) -> RepackagePolicy {
    RepackagePolicy {
        platform_dir: config.build.platform.clone(),
        simulator_arch: config.repackage.simulator_arch.clone(),
        device_arch: config.repackage.device_arch.clone(),
        skip: config.repackage.skip.clone(),
    }
}
