//! Integration tests for slotcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// A throwaway project with its own config, store and run state
    struct Project {
        dir: TempDir,
    }

    impl Project {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            fs::write(
                root.join("config.toml"),
                format!(
                    r#"
                    [general]
                    run_state = "{run_state}"

                    [store]
                    path = "{store}"

                    [[slot]]
                    name = "dependencies"
                    path = "pip-cache"
                    key_inputs = [{{ file = "requirements.txt" }}]
                    restore_prefixes = ["{{os}}-dependencies-"]

                    [[slot]]
                    name = "model-weights"
                    path = "models"
                    key_inputs = [{{ file = "config.yaml" }}]
                "#,
                    run_state = toml_path(&root.join("state/run.json")),
                    store = toml_path(&root.join("store")),
                ),
            )
            .unwrap();
            fs::write(root.join("requirements.txt"), "pkg==1.0").unwrap();
            Self { dir }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("slotcache");
            cmd.env_remove("SLOTCACHE_CONFIG")
                .env_remove("GITHUB_OUTPUT")
                .arg("--config")
                .arg(self.path().join("config.toml"))
                .arg("--project")
                .arg(self.path())
                .args(["--os", "linux", "--no-local"]);
            cmd
        }

        fn fill_cache(&self, file: &str, content: &str) {
            let cache = self.path().join("pip-cache");
            fs::create_dir_all(&cache).unwrap();
            fs::write(cache.join(file), content).unwrap();
        }
    }

    fn toml_path(path: &Path) -> String {
        path.display().to_string().replace('\\', "\\\\")
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("slotcache")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Content-keyed build artifact cache"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("slotcache")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("slotcache"));
    }

    #[test]
    fn key_prints_slot_keys() {
        let project = Project::new();
        project
            .cmd()
            .args(["key", "--slot", "dependencies"])
            .assert()
            .success()
            .stdout(predicate::str::is_match(r"^dependencies: linux-dependencies-[0-9a-f]{64}\n$").unwrap());
    }

    #[test]
    fn key_reports_missing_input() {
        let project = Project::new();
        project
            .cmd()
            .args(["key", "--slot", "model-weights"])
            .assert()
            .success()
            .stdout(predicate::str::contains("disabled").and(predicate::str::contains("config.yaml")));
    }

    #[test]
    fn key_changes_with_lockfile() {
        let project = Project::new();
        let before = project.cmd().args(["key", "-s", "dependencies"]).output().unwrap();
        fs::write(project.path().join("requirements.txt"), "pkg==1.1").unwrap();
        let after = project.cmd().args(["key", "-s", "dependencies"]).output().unwrap();

        assert!(before.status.success() && after.status.success());
        assert_ne!(before.stdout, after.stdout);
    }

    #[test]
    fn unknown_slot_fails() {
        let project = Project::new();
        project
            .cmd()
            .args(["key", "--slot", "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Slot not configured: nope"));
    }

    #[test]
    fn save_without_restore_fails() {
        let project = Project::new();
        project
            .cmd()
            .arg("save")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No cache run recorded"));
    }

    #[test]
    fn restore_save_restore_roundtrip() {
        let project = Project::new();

        project
            .cmd()
            .arg("restore")
            .assert()
            .success()
            .stdout(predicate::str::contains("dependencies").and(predicate::str::contains("[miss]")));

        project.fill_cache("pkg.whl", "wheel-1.0");
        project
            .cmd()
            .arg("save")
            .assert()
            .success()
            .stdout(predicate::str::contains("dependencies saved"));

        fs::remove_dir_all(project.path().join("pip-cache")).unwrap();

        let output = project.path().join("github_output");
        project
            .cmd()
            .env("GITHUB_OUTPUT", &output)
            .arg("restore")
            .assert()
            .success()
            .stdout(predicate::str::contains("[hit]"));

        assert_eq!(
            fs::read_to_string(project.path().join("pip-cache/pkg.whl")).unwrap(),
            "wheel-1.0"
        );
        let outputs = fs::read_to_string(&output).unwrap();
        assert!(outputs.contains("dependencies-cache-hit=true"));
        assert!(outputs.contains("model-weights-cache-hit=false"));
    }

    #[test]
    fn lockfile_change_gives_partial_hit() {
        let project = Project::new();

        project.cmd().arg("restore").assert().success();
        project.fill_cache("old.whl", "old");
        project.cmd().arg("save").assert().success();

        fs::write(project.path().join("requirements.txt"), "pkg==1.1").unwrap();
        fs::remove_dir_all(project.path().join("pip-cache")).unwrap();

        project
            .cmd()
            .arg("restore")
            .assert()
            .success()
            .stdout(predicate::str::contains("partial hit from linux-dependencies-"));
        assert!(project.path().join("pip-cache/old.whl").exists());

        project.cmd().arg("save").assert().success();
        project
            .cmd()
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::function(|out: &str| out.lines().count() == 2));
    }

    #[test]
    fn list_empty() {
        let project = Project::new();
        project
            .cmd()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries found."));
    }

    #[test]
    fn gc_dry_run_on_empty_store() {
        let project = Project::new();
        project
            .cmd()
            .args(["gc", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No entries idle for more than 7 days."));
    }

    #[test]
    fn config_path() {
        let project = Project::new();
        project
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let project = Project::new();
        project
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[store]").and(predicate::str::contains("pip-cache")));
    }

    #[test]
    fn local_config_discovered() {
        let project = Project::new();
        fs::write(
            project.path().join(".slotcache.toml"),
            "[store]\nretention_days = 2\n",
        )
        .unwrap();

        let mut cmd = cargo_bin_cmd!("slotcache");
        cmd.arg("--config")
            .arg(project.path().join("config.toml"))
            .arg("--project")
            .arg(project.path())
            .args(["--os", "linux", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("retention_days = 2"));
    }

    #[test]
    fn directory_key_input_disables_slot() {
        let project = Project::new();
        fs::create_dir(project.path().join("config.yaml")).unwrap();

        project
            .cmd()
            .arg("key")
            .assert()
            .success()
            .stdout(
                predicate::str::is_match(r"dependencies: linux-dependencies-[0-9a-f]{64}")
                    .unwrap()
                    .and(predicate::str::contains("model-weights: disabled")),
            );

        project
            .cmd()
            .arg("restore")
            .assert()
            .success()
            .stdout(predicate::str::contains("model-weights").and(predicate::str::contains("disabled")));
    }

    #[test]
    fn local_slot_added_to_defaults() {
        let project = Project::new();
        fs::write(
            project.path().join(".slotcache.toml"),
            "[[slot]]\nname = \"tools\"\npath = \"tools\"\n",
        )
        .unwrap();

        let mut cmd = cargo_bin_cmd!("slotcache");
        cmd.env_remove("SLOTCACHE_CONFIG")
            .arg("--config")
            .arg(project.path().join("absent.toml"))
            .arg("--project")
            .arg(project.path())
            .args(["--os", "linux", "config", "show"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("name = \"dependencies\"")
                    .and(predicate::str::contains("name = \"model-weights\""))
                    .and(predicate::str::contains("name = \"tools\"")),
            );
    }
}
