//! In-memory stand-ins for every external tool a run talks to

use async_trait::async_trait;
use cartwheel::archive::Archiver;
use cartwheel::build::DependencyBuilder;
use cartwheel::config::{Config, ProjectLayout};
use cartwheel::dependency::Dependency;
use cartwheel::error::{CartwheelError, CartwheelResult};
use cartwheel::factory::Toolbox;
use cartwheel::registry::{Fetcher, PackageRef, PackageRegistry, UploadReceipt};
use cartwheel::repackage::SliceTool;
use cartwheel::shell::{CommandOutput, CommandSpec, ShellRunner};
use cartwheel::ui::TransferProgress;
use filetime::FileTime;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const SWIFT_VERSION: &str = "5.9.2";

/// Answers `swift --version`
pub struct SwiftShell;

#[async_trait]
impl ShellRunner for SwiftShell {
    async fn run(&self, spec: &CommandSpec) -> CartwheelResult<CommandOutput> {
        Ok(CommandOutput {
            lines: vec![
                format!("Apple Swift version {} (swiftlang-5.9.2.2.56)", SWIFT_VERSION),
                format!("# {}", spec),
            ],
        })
    }
}

/// "Archives" are text files listing bundle names, one per line
pub struct ListArchiver;

#[async_trait]
impl Archiver for ListArchiver {
    async fn pack(&self, items: &[PathBuf], destination: &Path) -> CartwheelResult<()> {
        let names: Vec<String> = items
            .iter()
            .map(|item| item.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        std::fs::write(destination, names.join("\n")).unwrap();
        Ok(())
    }

    async fn unpack(&self, archive: &Path, destination: &Path) -> CartwheelResult<()> {
        let text = std::fs::read_to_string(archive)
            .map_err(|e| CartwheelError::io("reading fake archive", e))?;
        if text.trim().is_empty() {
            return Err(CartwheelError::User(format!("corrupt archive {}", archive.display())));
        }
        for name in text.lines() {
            create_bundle(&destination.join(name));
        }
        Ok(())
    }
}

/// A bundle directory holding a binary named after its stem
pub fn create_bundle(path: &Path) {
    std::fs::create_dir_all(path).unwrap();
    let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
    std::fs::write(path.join(stem), "fat binary").unwrap();
}

/// Package storage keyed by `(name, version)`
#[derive(Default)]
pub struct MemoryRegistry {
    packages: Mutex<BTreeMap<(String, String), String>>,
    unavailable: Mutex<Vec<(String, String)>>,
    uploads: Mutex<Vec<String>>,
    downloads: AtomicUsize,
}

impl MemoryRegistry {
    pub fn publish(&self, name: &str, version: &str, bundles: &str) {
        self.packages
            .lock()
            .unwrap()
            .insert((name.to_string(), version.to_string()), bundles.to_string());
    }

    /// Listed as published, but downloads fail
    pub fn publish_unavailable(&self, name: &str, version: &str) {
        self.unavailable
            .lock()
            .unwrap()
            .push((name.to_string(), version.to_string()));
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageRegistry for MemoryRegistry {
    async fn list_versions(&self, name: &str) -> CartwheelResult<Vec<String>> {
        let mut versions: Vec<String> = self
            .packages
            .lock()
            .unwrap()
            .keys()
            .chain(self.unavailable.lock().unwrap().iter())
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .collect();
        versions.sort();
        Ok(versions)
    }

    async fn download(
        &self,
        package: &PackageRef,
        destination: &Path,
        _progress: TransferProgress,
    ) -> CartwheelResult<u64> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let key = (package.name.clone(), package.version.clone());
        let content = self
            .packages
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| CartwheelError::User(format!("404 {}", package.file_name)))?;
        std::fs::write(destination, &content).unwrap();
        Ok(content.len() as u64)
    }

    async fn upload(
        &self,
        package: &PackageRef,
        file: &Path,
        _progress: TransferProgress,
    ) -> CartwheelResult<UploadReceipt> {
        let content = std::fs::read_to_string(file).unwrap();
        self.publish(&package.name, &package.version, &content);
        self.uploads
            .lock()
            .unwrap()
            .push(format!("{} {} {}", package.name, package.version, package.file_name));
        Ok(UploadReceipt {
            status: 201,
            message: Some("201 Created".to_string()),
        })
    }
}

/// Static URL table
#[derive(Default)]
pub struct MemoryFetcher {
    files: HashMap<String, String>,
    fetched: AtomicUsize,
}

impl MemoryFetcher {
    pub fn with(mut self, url: &str, content: &str) -> Self {
        self.files.insert(url.to_string(), content.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }

    fn lookup(&self, url: &str) -> CartwheelResult<String> {
        self.fetched.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| CartwheelError::User(format!("404 {}", url)))
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch_to(&self, url: &str, destination: &Path, _progress: TransferProgress) -> CartwheelResult<u64> {
        let content = self.lookup(url)?;
        std::fs::write(destination, &content).unwrap();
        Ok(content.len() as u64)
    }

    async fn fetch_text(&self, url: &str) -> CartwheelResult<String> {
        self.lookup(url)
    }
}

/// Produces `<name>.xcframework` (or the configured bundles) with a fresh
/// modification time for every build
pub struct FakeCarthage {
    build_dir: PathBuf,
    produces: Mutex<HashMap<String, Vec<String>>>,
    builds: Mutex<Vec<String>>,
    prepares: AtomicUsize,
    clock: AtomicI64,
}

impl FakeCarthage {
    pub fn new(build_dir: &Path) -> Self {
        Self {
            build_dir: build_dir.to_path_buf(),
            produces: Mutex::new(HashMap::new()),
            builds: Mutex::new(Vec::new()),
            prepares: AtomicUsize::new(0),
            clock: AtomicI64::new(2_000_000_000),
        }
    }

    pub fn set_produces(&self, name: &str, bundles: &[&str]) {
        self.produces
            .lock()
            .unwrap()
            .insert(name.to_string(), bundles.iter().map(|b| b.to_string()).collect());
    }

    pub fn builds(&self) -> Vec<String> {
        self.builds.lock().unwrap().clone()
    }

    pub fn prepare_count(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DependencyBuilder for FakeCarthage {
    async fn prepare(&self) -> CartwheelResult<()> {
        self.prepares.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn build(&self, dep: &Dependency) -> CartwheelResult<()> {
        self.builds.lock().unwrap().push(dep.name.clone());
        let bundles = self
            .produces
            .lock()
            .unwrap()
            .get(&dep.name)
            .cloned()
            .unwrap_or_else(|| vec![format!("{}.xcframework", dep.name)]);
        for bundle in bundles {
            let path = self.build_dir.join(bundle);
            create_bundle(&path);
            let secs = self.clock.fetch_add(10, Ordering::SeqCst);
            filetime::set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).unwrap();
        }
        Ok(())
    }
}

/// Thins by rewriting the binary, assembles by creating the output
#[derive(Default)]
pub struct FakeSlicer {
    assembled: Mutex<Vec<PathBuf>>,
}

impl FakeSlicer {
    pub fn assembled(&self) -> Vec<PathBuf> {
        self.assembled.lock().unwrap().clone()
    }
}

#[async_trait]
impl SliceTool for FakeSlicer {
    async fn describe(&self, _binary: &Path) -> CartwheelResult<String> {
        Ok("Architectures in the fat file: x86_64 arm64".to_string())
    }

    async fn thin(&self, binary: &Path, arch: &str) -> CartwheelResult<()> {
        std::fs::write(binary, arch).unwrap();
        Ok(())
    }

    async fn assemble(&self, frameworks: &[PathBuf], output: &Path) -> CartwheelResult<()> {
        std::fs::create_dir_all(output).unwrap();
        for framework in frameworks {
            let arch = framework.parent().unwrap().file_name().unwrap();
            std::fs::create_dir_all(output.join(arch)).unwrap();
        }
        self.assembled.lock().unwrap().push(output.to_path_buf());
        Ok(())
    }
}

/// A project directory plus the fakes wired into a [`Toolbox`]
pub struct Project {
    pub dir: TempDir,
    pub layout: ProjectLayout,
    pub config: Config,
    pub registry: Arc<MemoryRegistry>,
    pub fetcher: Arc<MemoryFetcher>,
    pub carthage: Arc<FakeCarthage>,
    pub slicer: Arc<FakeSlicer>,
}

impl Project {
    pub fn new(cartfile_resolved: &str, binary_manifest: &str, fetcher: MemoryFetcher) -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let layout = ProjectLayout::resolve(dir.path(), &config.paths).unwrap();
        std::fs::write(&layout.cartfile_resolved, cartfile_resolved).unwrap();
        if !binary_manifest.is_empty() {
            std::fs::write(&layout.binary_manifest, binary_manifest).unwrap();
        }
        let carthage = Arc::new(FakeCarthage::new(&layout.build_dir));

        Self {
            dir,
            layout,
            config,
            registry: Arc::new(MemoryRegistry::default()),
            fetcher: Arc::new(fetcher),
            carthage,
            slicer: Arc::new(FakeSlicer::default()),
        }
    }

    pub fn toolbox(&self) -> Toolbox {
        Toolbox {
            shell: Arc::new(SwiftShell),
            archiver: Arc::new(ListArchiver),
            registry: self.registry.clone(),
            fetcher: self.fetcher.clone(),
            builder: self.carthage.clone(),
            slicer: self.slicer.clone(),
        }
    }

    pub fn build_path(&self, relative: &str) -> PathBuf {
        self.layout.build_dir.join(relative)
    }

    pub fn stamp(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.build_path(&format!("{}.version", name)))
            .ok()
            .map(|text| text.trim_end().to_string())
    }

    pub fn cache_entry(&self, name: &str, version: &str) -> PathBuf {
        self.layout.cache_dir.join(format!("{}@{}.zip", name, version))
    }

    /// Version a buildable dependency is cached under with default settings
    pub fn keyed(version: &str) -> String {
        format!("{}_swift-{}_builder-2", version, SWIFT_VERSION)
    }

    /// Files left in the scratch directory
    pub fn temp_leftovers(&self) -> Vec<String> {
        match std::fs::read_dir(&self.layout.temp_dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}
