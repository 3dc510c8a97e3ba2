//! Cache resolution for a single dependency
//!
//! The resolver walks an ordered list of tiers and stops at the first one
//! that yields an installable archive:
//!
//! 1. the version stamp (nothing to do)
//! 2. the local archive cache
//! 3. the remote source (`source_url` or the package registry), only when
//!    the network mode allows downloads
//!
//! Every miss or transfer failure moves on to the next tier. When all tiers
//! miss the caller gets [`Resolution::NeedsBuild`].

use crate::cache::{LocalCache, RemoteCache};
use crate::dependency::Dependency;
use crate::error::CartwheelResult;
use crate::fsutil::{self, ScratchPath};
use crate::install::Installer;
use crate::ledger::VersionLedger;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where an installed archive came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    LocalCache(PathBuf),
    Remote(String),
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalCache(path) => write!(f, "local cache ({})", path.display()),
            Self::Remote(origin) => write!(f, "{}", origin),
        }
    }
}

/// Outcome of resolving one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The stamp already records this exact version
    Satisfied,
    /// An archive was found and installed
    Installed(ArtifactSource),
    /// No tier had it
    NeedsBuild,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Local,
    Remote,
}

const TIERS: [Tier; 2] = [Tier::Local, Tier::Remote];

/// An archive found by a tier, with its scratch guard if it is temporary
struct Candidate {
    archive: PathBuf,
    source: ArtifactSource,
    _scratch: Option<ScratchPath>,
}

pub struct CacheResolver {
    ledger: VersionLedger,
    local: LocalCache,
    remote: Arc<RemoteCache>,
    installer: Installer,
    temp_dir: PathBuf,
}

impl CacheResolver {
    pub fn new(
        ledger: VersionLedger,
        local: LocalCache,
        remote: Arc<RemoteCache>,
        installer: Installer,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ledger,
            local,
            remote,
            installer,
            temp_dir: temp_dir.into(),
        }
    }

    /// Resolve `dep` through the stamp and the cache tiers
    pub async fn resolve(&self, dep: &Dependency, downloads_allowed: bool) -> CartwheelResult<Resolution> {
        if self.ledger.is_satisfied(dep).await? {
            debug!("{} is up to date", dep);
            return Ok(Resolution::Satisfied);
        }

        // A stale stamp must not survive an interrupted install
        self.ledger.clear(&dep.name).await?;

        for tier in TIERS {
            let Some(candidate) = self.probe(tier, dep, downloads_allowed).await? else {
                continue;
            };

            if let Err(e) = self.installer.install(&candidate.archive).await {
                warn!("Could not install {} from {}: {}", dep, candidate.source, e);
                if tier == Tier::Local {
                    fsutil::remove_path(&candidate.archive).await.ok();
                }
                continue;
            }

            self.ledger.record(dep).await?;
            if tier == Tier::Remote {
                self.local.promote_best_effort(&candidate.archive, dep).await;
            }
            info!("Installed {} from {}", dep, candidate.source);
            return Ok(Resolution::Installed(candidate.source));
        }

        Ok(Resolution::NeedsBuild)
    }

    async fn probe(
        &self,
        tier: Tier,
        dep: &Dependency,
        downloads_allowed: bool,
    ) -> CartwheelResult<Option<Candidate>> {
        match tier {
            Tier::Local => Ok(self.local.lookup(dep).await.map(|archive| Candidate {
                source: ArtifactSource::LocalCache(archive.clone()),
                archive,
                _scratch: None,
            })),
            Tier::Remote => {
                if !downloads_allowed {
                    debug!("Downloads disabled, skipping remote lookup for {}", dep);
                    return Ok(None);
                }
                fsutil::ensure_dir(&self.temp_dir).await?;
                let archive = self.download_path(dep);
                let scratch = ScratchPath::new(archive.clone());
                if !self.remote.download(dep, &archive).await {
                    return Ok(None);
                }
                Ok(Some(Candidate {
                    archive,
                    source: ArtifactSource::Remote(dep.source_description().to_string()),
                    _scratch: Some(scratch),
                }))
            }
        }
    }

    fn download_path(&self, dep: &Dependency) -> PathBuf {
        self.temp_dir.join(format!(
            "{}@{}.{}",
            dep.name,
            dep.version,
            crate::dependency::ARCHIVE_EXTENSION
        ))
    }

    pub fn ledger(&self) -> &VersionLedger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Archiver;
    use crate::error::{CartwheelError, CartwheelResult};
    use crate::registry::{Fetcher, PackageRef, PackageRegistry, UploadReceipt};
    use crate::ui::{TransferProgress, UiContext};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Archives are text files listing bundle directories
    struct ListArchiver;

    #[async_trait]
    impl Archiver for ListArchiver {
        async fn pack(&self, _items: &[PathBuf], _destination: &Path) -> CartwheelResult<()> {
            Ok(())
        }

        async fn unpack(&self, archive: &Path, destination: &Path) -> CartwheelResult<()> {
            let listing = std::fs::read_to_string(archive).unwrap();
            if listing.is_empty() {
                return Err(CartwheelError::User("corrupt archive".to_string()));
            }
            for line in listing.lines() {
                std::fs::create_dir_all(destination.join(line)).unwrap();
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingRegistry {
        downloads: AtomicUsize,
        available: bool,
    }

    #[async_trait]
    impl PackageRegistry for CountingRegistry {
        async fn list_versions(&self, _name: &str) -> CartwheelResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn download(
            &self,
            package: &PackageRef,
            destination: &Path,
            _progress: TransferProgress,
        ) -> CartwheelResult<u64> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            if !self.available {
                return Err(CartwheelError::http("GET", ureq::Error::StatusCode(404)));
            }
            std::fs::write(destination, format!("{}.xcframework", package.name)).unwrap();
            Ok(1)
        }

        async fn upload(
            &self,
            _package: &PackageRef,
            _file: &Path,
            _progress: TransferProgress,
        ) -> CartwheelResult<UploadReceipt> {
            unreachable!()
        }
    }

    struct NoFetcher;

    #[async_trait]
    impl Fetcher for NoFetcher {
        async fn fetch_to(&self, url: &str, _d: &Path, _p: TransferProgress) -> CartwheelResult<u64> {
            Err(CartwheelError::User(format!("unexpected fetch of {}", url)))
        }

        async fn fetch_text(&self, url: &str) -> CartwheelResult<String> {
            Err(CartwheelError::User(format!("unexpected fetch of {}", url)))
        }
    }

    struct Fixture {
        temp: TempDir,
        registry: Arc<CountingRegistry>,
        resolver: CacheResolver,
    }

    impl Fixture {
        fn new(available: bool) -> Self {
            let temp = TempDir::new().unwrap();
            let build = temp.path().join("Build");
            let registry = Arc::new(CountingRegistry {
                available,
                ..CountingRegistry::default()
            });
            let remote = Arc::new(RemoteCache::new(
                registry.clone(),
                Arc::new(NoFetcher),
                UiContext::non_interactive(),
            ));
            let resolver = CacheResolver::new(
                VersionLedger::new(&build, "version"),
                LocalCache::new(temp.path().join("cache")),
                remote,
                Installer::new(Arc::new(ListArchiver), &build, "iOS"),
                temp.path().join("tmp"),
            );
            Self {
                temp,
                registry,
                resolver,
            }
        }

        fn build(&self) -> PathBuf {
            self.temp.path().join("Build")
        }
    }

    #[tokio::test]
    async fn remote_hit_installs_records_and_promotes() {
        let fx = Fixture::new(true);
        let dep = Dependency::new("Alamofire", "5.8.1");

        let resolution = fx.resolver.resolve(&dep, true).await.unwrap();
        assert_eq!(
            resolution,
            Resolution::Installed(ArtifactSource::Remote("<package registry>".to_string()))
        );
        assert!(fx.build().join("Alamofire.xcframework").is_dir());
        assert!(fx.resolver.ledger().is_satisfied(&dep).await.unwrap());
        assert!(fx.temp.path().join("cache/Alamofire@5.8.1.zip").is_file());
        assert!(!fx.temp.path().join("tmp/Alamofire@5.8.1.zip").exists());

        // Second run is a no-op
        assert_eq!(fx.resolver.resolve(&dep, true).await.unwrap(), Resolution::Satisfied);
        assert_eq!(fx.registry.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn local_cache_wins_over_remote() {
        let fx = Fixture::new(true);
        let dep = Dependency::new("Alamofire", "5.8.1");
        std::fs::create_dir_all(fx.temp.path().join("cache")).unwrap();
        std::fs::write(fx.temp.path().join("cache/Alamofire@5.8.1.zip"), "Alamofire.xcframework").unwrap();

        let resolution = fx.resolver.resolve(&dep, true).await.unwrap();
        assert!(matches!(resolution, Resolution::Installed(ArtifactSource::LocalCache(_))));
        assert_eq!(fx.registry.downloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn offline_miss_needs_build_without_network() {
        let fx = Fixture::new(true);
        let dep = Dependency::new("Alamofire", "5.8.1");
        assert_eq!(fx.resolver.resolve(&dep, false).await.unwrap(), Resolution::NeedsBuild);
        assert_eq!(fx.registry.downloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_failure_needs_build() {
        let fx = Fixture::new(false);
        let dep = Dependency::new("Alamofire", "5.8.1");
        assert_eq!(fx.resolver.resolve(&dep, true).await.unwrap(), Resolution::NeedsBuild);
        assert_eq!(fx.registry.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_stamp_is_cleared_before_lookup() {
        let fx = Fixture::new(false);
        let old = Dependency::new("Alamofire", "5.8.0");
        fx.resolver.ledger().record(&old).await.unwrap();

        let new = Dependency::new("Alamofire", "5.8.1");
        assert_eq!(fx.resolver.resolve(&new, true).await.unwrap(), Resolution::NeedsBuild);
        assert_eq!(fx.resolver.ledger().installed_version("Alamofire").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_local_entry_falls_through() {
        let fx = Fixture::new(true);
        let dep = Dependency::new("Alamofire", "5.8.1");
        let entry = fx.temp.path().join("cache/Alamofire@5.8.1.zip");
        std::fs::create_dir_all(entry.parent().unwrap()).unwrap();
        std::fs::write(&entry, "").unwrap();

        let resolution = fx.resolver.resolve(&dep, true).await.unwrap();
        assert!(matches!(resolution, Resolution::Installed(ArtifactSource::Remote(_))));
        assert_eq!(std::fs::read_to_string(&entry).unwrap(), "Alamofire.xcframework");
    }
}
