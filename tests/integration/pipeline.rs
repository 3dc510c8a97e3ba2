//! End-to-end runs of `bootstrap` against in-memory tools

use crate::support::{MemoryFetcher, Project};
use cartwheel::cli::commands::bootstrap as bootstrap_cmd;
use cartwheel::dependency::NetworkMode;
use cartwheel::error::CartwheelError;
use cartwheel::pipeline::{DependencyOutcome, PipelineReport};
use cartwheel::publish::PublishOutcome;
use cartwheel::repackage::RepackageOutcome;
use cartwheel::resolver::ArtifactSource;
use cartwheel::ui::UiContext;

const RESOLVED: &str = r#"github "airbnb/Lottie" "4.4.0"
git "https://github.com/danielgindi/Charts.git" "v5.0.0"
binary "https://example.com/Ignored.json" "1.0.0"
"#;

const BINARIES: &str = r#"
public:
  - name: Crashlytics
    version: "10.1.0"
    url: https://example.com/Crashlytics-10.1.0.zip
private:
  - name: Analytics
    version: "2.0.0"
"#;

const CRASHLYTICS_URL: &str = "https://example.com/Crashlytics-10.1.0.zip";

fn project() -> Project {
    let fetcher = MemoryFetcher::default().with(CRASHLYTICS_URL, "Crashlytics.framework");
    let project = Project::new(RESOLVED, BINARIES, fetcher);
    project.registry.publish("Analytics", "2.0.0", "Analytics.xcframework");
    project
}

async fn bootstrap(project: &Project) -> Result<PipelineReport, CartwheelError> {
    bootstrap_cmd::run(
        &project.config,
        &project.layout,
        &project.toolbox(),
        UiContext::non_interactive(),
    )
    .await
}

#[tokio::test]
async fn first_run_builds_uploads_and_installs_everything() {
    let project = project();
    let report = bootstrap(&project).await.unwrap();

    let lottie = Project::keyed("4.4.0");
    let charts = Project::keyed("v5.0.0");

    assert!(matches!(
        report.outcome_of("Lottie"),
        Some(DependencyOutcome::Built(PublishOutcome::Uploaded(_)))
    ));
    assert!(matches!(
        report.outcome_of("Charts"),
        Some(DependencyOutcome::Built(PublishOutcome::Uploaded(_)))
    ));
    assert_eq!(
        report.outcome_of("Crashlytics"),
        Some(&DependencyOutcome::Installed(ArtifactSource::Remote(
            CRASHLYTICS_URL.to_string()
        )))
    );
    assert!(matches!(
        report.outcome_of("Analytics"),
        Some(DependencyOutcome::Installed(ArtifactSource::Remote(_)))
    ));

    // Sources are checked out once, before the first build
    assert_eq!(project.carthage.prepare_count(), 1);
    assert_eq!(project.carthage.builds(), vec!["Lottie", "Charts"]);

    assert_eq!(
        project.registry.uploads(),
        vec![
            format!("Lottie {} Lottie.zip", lottie),
            format!("Charts {} Charts.zip", charts),
        ]
    );

    assert_eq!(project.stamp("Lottie").as_deref(), Some(lottie.as_str()));
    assert_eq!(project.stamp("Crashlytics").as_deref(), Some("10.1.0"));
    assert_eq!(project.stamp("Analytics").as_deref(), Some("2.0.0"));

    assert!(project.cache_entry("Lottie", &lottie).is_file());
    assert!(project.cache_entry("Charts", &charts).is_file());
    assert!(project.cache_entry("Crashlytics", "10.1.0").is_file());
    assert!(project.cache_entry("Analytics", "2.0.0").is_file());

    assert!(project.build_path("Analytics.xcframework").is_dir());
    assert!(project.temp_leftovers().iter().all(|name| !name.ends_with(".zip")));
}

#[tokio::test]
async fn fat_frameworks_become_xcframeworks() {
    let project = project();
    let report = bootstrap(&project).await.unwrap();

    let converted = project.build_path("Crashlytics.xcframework");
    assert_eq!(report.repackaged, vec![RepackageOutcome::Converted(converted.clone())]);
    assert!(converted.join("x86_64").is_dir());
    assert!(converted.join("arm64").is_dir());
    assert!(!project.build_path("iOS/Crashlytics.framework").exists());
    assert!(!project.build_path("tmp_Crashlytics.xcframework").exists());
    assert!(!project.build_path("iOS/sliced").exists());
}

#[tokio::test]
async fn skipped_frameworks_stay_fat() {
    let project = project();
    std::fs::create_dir_all(project.build_path("iOS/Firebase.framework")).unwrap();

    let report = bootstrap(&project).await.unwrap();
    assert!(report
        .repackaged
        .contains(&RepackageOutcome::Skipped("Firebase.framework".to_string())));
    assert!(project.build_path("iOS/Firebase.framework").is_dir());
    assert!(!project.build_path("Firebase.xcframework").exists());
}

#[tokio::test]
async fn second_run_does_nothing() {
    let project = project();
    bootstrap(&project).await.unwrap();
    let downloads = project.registry.download_count();
    let fetches = project.fetcher.fetch_count();

    let report = bootstrap(&project).await.unwrap();
    assert_eq!(report.satisfied(), 4);
    assert_eq!(report.built(), 0);
    assert_eq!(report.installed(), 0);
    assert!(report.repackaged.is_empty());

    assert_eq!(project.carthage.builds().len(), 2);
    assert_eq!(project.registry.download_count(), downloads);
    assert_eq!(project.fetcher.fetch_count(), fetches);
    assert_eq!(project.registry.uploads().len(), 2);
}

#[tokio::test]
async fn local_cache_is_preferred_over_registry() {
    let project = project();
    let lottie = Project::keyed("4.4.0");
    project.registry.publish("Lottie", &lottie, "Lottie.xcframework");
    std::fs::create_dir_all(&project.layout.cache_dir).unwrap();
    std::fs::write(project.cache_entry("Lottie", &lottie), "Lottie.xcframework").unwrap();

    let report = bootstrap(&project).await.unwrap();
    assert_eq!(
        report.outcome_of("Lottie"),
        Some(&DependencyOutcome::Installed(ArtifactSource::LocalCache(
            project.cache_entry("Lottie", &lottie)
        )))
    );
    assert!(project.build_path("Lottie.xcframework").is_dir());
    assert!(!project.carthage.builds().contains(&"Lottie".to_string()));
    // The local hit never reaches the registry; Charts and Analytics do
    assert_eq!(project.registry.download_count(), 2);
}

#[tokio::test]
async fn registry_hit_is_installed_and_cached_locally() {
    let project = project();
    let charts = Project::keyed("v5.0.0");
    project.registry.publish("Charts", &charts, "Charts.xcframework");

    let report = bootstrap(&project).await.unwrap();
    assert!(matches!(
        report.outcome_of("Charts"),
        Some(DependencyOutcome::Installed(ArtifactSource::Remote(_)))
    ));
    assert!(project.cache_entry("Charts", &charts).is_file());
    assert_eq!(project.carthage.builds(), vec!["Lottie"]);
}

#[tokio::test]
async fn corrupt_local_entry_falls_through_to_next_tier() {
    let project = project();
    let charts = Project::keyed("v5.0.0");
    project.registry.publish("Charts", &charts, "Charts.xcframework");
    std::fs::create_dir_all(&project.layout.cache_dir).unwrap();
    std::fs::write(project.cache_entry("Charts", &charts), "").unwrap();

    let report = bootstrap(&project).await.unwrap();
    assert!(matches!(
        report.outcome_of("Charts"),
        Some(DependencyOutcome::Installed(ArtifactSource::Remote(_)))
    ));
    let cached = std::fs::read_to_string(project.cache_entry("Charts", &charts)).unwrap();
    assert_eq!(cached, "Charts.xcframework");
}

#[tokio::test]
async fn restricted_mode_downloads_but_never_uploads() {
    let mut project = project();
    project.config.network.mode = NetworkMode::Restricted;

    let report = bootstrap(&project).await.unwrap();
    assert_eq!(
        report.outcome_of("Lottie"),
        Some(&DependencyOutcome::Built(PublishOutcome::UploadsDisabled))
    );
    assert!(matches!(
        report.outcome_of("Analytics"),
        Some(DependencyOutcome::Installed(ArtifactSource::Remote(_)))
    ));
    assert!(project.registry.uploads().is_empty());
    assert!(project.cache_entry("Lottie", &Project::keyed("4.4.0")).is_file());
}

#[tokio::test]
async fn offline_mode_uses_local_cache_only() {
    let mut project = project();
    project.config.network.mode = NetworkMode::Offline;
    std::fs::create_dir_all(&project.layout.cache_dir).unwrap();
    std::fs::write(project.cache_entry("Crashlytics", "10.1.0"), "Crashlytics.framework").unwrap();
    std::fs::write(project.cache_entry("Analytics", "2.0.0"), "Analytics.xcframework").unwrap();

    let report = bootstrap(&project).await.unwrap();
    assert_eq!(report.built(), 2);
    assert_eq!(report.installed(), 2);
    assert_eq!(project.registry.download_count(), 0);
    assert_eq!(project.fetcher.fetch_count(), 0);
    assert!(project.registry.uploads().is_empty());
}

#[tokio::test]
async fn missing_binary_only_dependency_aborts() {
    let mut project = project();
    project.config.network.mode = NetworkMode::Offline;

    let err = bootstrap(&project).await.unwrap_err();
    match err {
        CartwheelError::BinaryUnavailable { name, source_url, .. } => {
            assert_eq!(name, "Crashlytics");
            assert_eq!(source_url, CRASHLYTICS_URL);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(project.stamp("Crashlytics"), None);
}

#[tokio::test]
async fn published_version_is_not_uploaded_again() {
    let project = project();
    let lottie = Project::keyed("4.4.0");
    project.registry.publish_unavailable("Lottie", &lottie);

    let report = bootstrap(&project).await.unwrap();
    assert_eq!(
        report.outcome_of("Lottie"),
        Some(&DependencyOutcome::Built(PublishOutcome::AlreadyPublished))
    );
    assert_eq!(
        project.registry.uploads(),
        vec![format!("Charts {} Charts.zip", Project::keyed("v5.0.0"))]
    );
    assert!(project.cache_entry("Lottie", &lottie).is_file());
}

#[tokio::test]
async fn build_without_changes_is_not_published() {
    let project = project();
    project.carthage.set_produces("Lottie", &[]);

    let report = bootstrap(&project).await.unwrap();
    assert_eq!(
        report.outcome_of("Lottie"),
        Some(&DependencyOutcome::Built(PublishOutcome::NothingChanged))
    );
    assert!(project.registry.uploads().iter().all(|upload| !upload.starts_with("Lottie")));
    assert!(!project.cache_entry("Lottie", &Project::keyed("4.4.0")).exists());
    // The build itself succeeded, so the stamp is written
    assert_eq!(project.stamp("Lottie"), Some(Project::keyed("4.4.0")));
}

#[tokio::test]
async fn only_changed_bundles_are_packaged() {
    let project = project();
    project
        .carthage
        .set_produces("Charts", &["Charts.xcframework", "ChartsSwiftUI.xcframework"]);

    bootstrap(&project).await.unwrap();
    let archive = std::fs::read_to_string(project.cache_entry("Charts", &Project::keyed("v5.0.0"))).unwrap();
    let mut bundles: Vec<&str> = archive.lines().collect();
    bundles.sort();
    assert_eq!(bundles, vec!["Charts.xcframework", "ChartsSwiftUI.xcframework"]);
}

#[tokio::test]
async fn builder_revision_change_rebuilds() {
    let mut project = project();
    bootstrap(&project).await.unwrap();

    project.config.build.builder_revision = "3".to_string();
    let report = bootstrap(&project).await.unwrap();

    assert_eq!(report.built(), 2);
    assert_eq!(report.satisfied(), 2);
    assert_eq!(
        project.stamp("Lottie"),
        Some(format!("4.4.0_swift-{}_builder-3", crate::support::SWIFT_VERSION))
    );
}

#[tokio::test]
async fn stamps_of_removed_dependencies_are_pruned() {
    let project = project();
    std::fs::create_dir_all(&project.layout.build_dir).unwrap();
    std::fs::write(project.build_path("Alamofire.version"), "5.8.0").unwrap();

    let report = bootstrap(&project).await.unwrap();
    assert_eq!(report.pruned, vec!["Alamofire".to_string()]);
    assert!(!project.build_path("Alamofire.version").exists());
}

#[tokio::test]
async fn missing_cartfile_resolved_is_fatal() {
    let project = project();
    std::fs::remove_file(&project.layout.cartfile_resolved).unwrap();

    let err = bootstrap(&project).await.unwrap_err();
    assert!(matches!(err, CartwheelError::ManifestNotFound(_)));
    assert!(project.carthage.builds().is_empty());
}
