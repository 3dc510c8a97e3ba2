//! Integration tests for cartwheel

mod pipeline;
mod support;

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn cartwheel() -> Command {
        let mut cmd = cargo_bin_cmd!("cartwheel");
        cmd.env_remove("CARTWHEEL_CONFIG")
            .env_remove("CARTWHEEL_REGISTRY_TOKEN");
        cmd
    }

    #[test]
    fn help_displays() {
        cartwheel()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Carthage dependency bootstrapper"));
    }

    #[test]
    fn version_displays() {
        cartwheel()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cartwheel"));
    }

    #[test]
    fn config_path() {
        let project = TempDir::new().unwrap();
        cartwheel()
            .args(["config", "path", "--project-dir"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml").and(predicate::str::contains("cartwheel.toml")));
    }

    #[test]
    fn config_show_merges_local_file_and_hides_token() {
        let project = TempDir::new().unwrap();
        std::fs::write(
            project.path().join("cartwheel.toml"),
            "[registry]\napi_url = \"https://gitlab.example.com/api/v4\"\ntoken = \"secret-token\"\n",
        )
        .unwrap();

        cartwheel()
            .args(["--no-global", "config", "show", "--project-dir"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(
                predicate::str::contains("https://gitlab.example.com/api/v4")
                    .and(predicate::str::contains("[network]"))
                    .and(predicate::str::contains("secret-token").not()),
            );
    }

    #[test]
    fn config_flag_must_point_at_a_file() {
        let project = TempDir::new().unwrap();
        cartwheel()
            .arg("--config")
            .arg(project.path().join("missing.toml"))
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }

    #[test]
    fn bootstrap_without_cartfile_resolved_fails() {
        let project = TempDir::new().unwrap();
        cartwheel()
            .args(["--no-global", "--plain", "bootstrap", "--project-dir"])
            .arg(project.path())
            .assert()
            .failure()
            .stderr(
                predicate::str::contains("Manifest not found")
                    .and(predicate::str::contains("carthage update --no-build")),
            );
    }

    #[test]
    fn upload_requires_registry_settings() {
        let project = TempDir::new().unwrap();
        let bundle = project.path().join("Lottie.xcframework");
        std::fs::create_dir_all(&bundle).unwrap();

        cartwheel()
            .args(["--no-global", "--plain", "upload", "--project-dir"])
            .arg(project.path())
            .arg(&bundle)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Registry is not configured"));
    }

    #[test]
    fn upload_requires_a_bundle() {
        cartwheel().arg("upload").assert().failure();
    }
}
