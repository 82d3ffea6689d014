//! Integration tests for shellcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// A site directory, state directory and config file under one temp dir
    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let site = dir.path().join("site");
            std::fs::create_dir_all(site.join("i18n")).unwrap();
            std::fs::write(site.join("index.html"), "<h1>router reference</h1>").unwrap();
            std::fs::write(site.join("app.js"), "console.log('app');").unwrap();
            std::fs::write(site.join("styles.css"), "body { margin: 0 }").unwrap();
            std::fs::write(site.join("i18n").join("en.json"), "{\"title\":\"Routers\"}").unwrap();

            let fixture = Self { dir };
            fixture.write_config();
            fixture
        }

        fn write_config(&self) {
            let config = format!(
                r#"
[general]
journal = true

[origin]
base_url = "http://localhost:8080/"
directory = "{site}"

[cache]
version = "v5"
state_dir = "{state}"
skip_waiting = true

[manifest]
critical = ["./", "./index.html", "./app.js"]
full = ["./", "./index.html", "./app.js", "./styles.css", "./i18n/en.json", "./missing.svg"]
"#,
                site = self.path("site").display(),
                state = self.path("state").display(),
            );
            std::fs::write(self.config_path(), config).unwrap();
        }

        fn path(&self, name: &str) -> std::path::PathBuf {
            self.dir.path().join(name)
        }

        fn config_path(&self) -> std::path::PathBuf {
            self.path("config.toml")
        }

        fn site(&self) -> std::path::PathBuf {
            self.path("site")
        }

        fn cmd(&self) -> Command {
            let mut cmd = shellcache();
            cmd.env("SHELLCACHE_CONFIG", self.config_path());
            cmd
        }

        fn install(&self) {
            self.cmd().arg("install").assert().success();
        }
    }

    fn shellcache() -> Command {
        cargo_bin_cmd!("shellcache")
    }

    fn has_namespace(state: &Path, name: &str) -> bool {
        state.join("caches").join(name).is_dir()
    }

    #[test]
    fn help_displays() {
        shellcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline cache"));
    }

    #[test]
    fn version_displays() {
        shellcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("shellcache"));
    }

    #[test]
    fn config_path() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("router-cache-"));
    }

    #[test]
    fn config_init_refuses_overwrite() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["config", "init"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn config_init_force_repairs_broken_file() {
        let fixture = Fixture::new();
        std::fs::write(fixture.config_path(), "[cache\nversion =").unwrap();

        fixture
            .cmd()
            .args(["config", "init", "--force"])
            .assert()
            .success();

        let written = std::fs::read_to_string(fixture.config_path()).unwrap();
        assert!(written.contains("router-cache-"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let fixture = Fixture::new();
        std::fs::write(fixture.config_path(), "[general]\nlog_format = \"xml\"\n").unwrap();

        fixture
            .cmd()
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn install_then_serve_offline() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cached 4 resource(s)"))
            .stdout(predicate::str::contains("./missing.svg"));

        assert!(has_namespace(&fixture.path("state"), "router-cache-v5"));

        for path in ["/", "./", "index.html", "/index.html?_refresh=1700000000000"] {
            fixture
                .cmd()
                .args(["fetch", "--offline", path])
                .assert()
                .success()
                .stdout(predicate::str::contains("<h1>router reference</h1>"));
        }
    }

    #[test]
    fn offline_miss_is_placeholder() {
        let fixture = Fixture::new();
        fixture.install();

        fixture
            .cmd()
            .args(["fetch", "--offline", "--include", "./missing.svg"])
            .assert()
            .success()
            .stdout(predicate::str::contains("503"))
            .stdout(predicate::str::contains("text/plain; charset=utf-8"))
            .stdout(predicate::str::contains("Offline"));
    }

    #[test]
    fn ordinary_resource_follows_network() {
        let fixture = Fixture::new();
        fixture.install();
        std::fs::write(fixture.site().join("styles.css"), "body { margin: 1px }").unwrap();

        fixture
            .cmd()
            .args(["fetch", "./styles.css"])
            .assert()
            .success()
            .stdout(predicate::str::contains("margin: 1px"));

        fixture
            .cmd()
            .args(["fetch", "--offline", "./styles.css"])
            .assert()
            .success()
            .stdout(predicate::str::contains("margin: 1px"));
    }

    #[test]
    fn critical_resource_is_served_from_cache() {
        let fixture = Fixture::new();
        fixture.install();
        std::fs::write(fixture.site().join("app.js"), "console.log('v2');").unwrap();

        fixture
            .cmd()
            .args(["fetch", "--include", "./app.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("x-shellcache-source: cache"))
            .stdout(predicate::str::contains("console.log('app');"));

        // The background refresh stored the new copy
        fixture
            .cmd()
            .args(["fetch", "--offline", "./app.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("console.log('v2');"));
    }

    #[test]
    fn fetch_without_install_goes_to_network() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["fetch", "./app.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("console.log('app');"));

        fixture
            .cmd()
            .args(["fetch", "--offline", "./app.js"])
            .assert()
            .failure();
    }

    #[test]
    fn update_waits_then_skip_waiting_purges_old_version() {
        let fixture = Fixture::new();
        fixture.install();

        fixture
            .cmd()
            .args(["install", "--tag", "v6", "--wait"])
            .assert()
            .success()
            .stdout(predicate::str::contains("waiting"));
        assert!(has_namespace(&fixture.path("state"), "router-cache-v5"));
        assert!(has_namespace(&fixture.path("state"), "router-cache-v6"));

        fixture
            .cmd()
            .arg("skip-waiting")
            .assert()
            .success()
            .stdout(predicate::str::contains("router-cache-v6 is active"));
        assert!(!has_namespace(&fixture.path("state"), "router-cache-v5"));
    }

    #[test]
    fn newer_install_discards_waiting_version() {
        let fixture = Fixture::new();
        fixture.install();
        fixture
            .cmd()
            .args(["install", "--tag", "v6", "--wait"])
            .assert()
            .success();
        fixture
            .cmd()
            .args(["install", "--tag", "v7"])
            .assert()
            .success();

        let state = fixture.path("state");
        assert!(has_namespace(&state, "router-cache-v7"));
        assert!(!has_namespace(&state, "router-cache-v6"));

        fixture
            .cmd()
            .arg("skip-waiting")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No worker is waiting"));
        assert!(has_namespace(&state, "router-cache-v7"));
        fixture
            .cmd()
            .args(["fetch", "--offline", "/"])
            .assert()
            .success()
            .stdout(predicate::str::contains("router reference"));
    }

    #[test]
    fn skip_waiting_without_waiting_worker_fails() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .arg("skip-waiting")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No worker is waiting"));
    }

    #[test]
    fn list_formats() {
        let fixture = Fixture::new();
        fixture.install();

        fixture
            .cmd()
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("./index.html"))
            .stdout(predicate::str::contains("./i18n/en.json"));

        let output = fixture
            .cmd()
            .args(["list", "--format", "json"])
            .output()
            .unwrap();
        let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(entries.as_array().unwrap().len(), 4);
    }

    #[test]
    fn list_without_install_fails() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("shellcache install"));
    }

    #[test]
    fn list_missing_namespace_fails_without_recreating_it() {
        let fixture = Fixture::new();
        fixture.install();
        let state = fixture.path("state");
        std::fs::remove_dir_all(state.join("caches").join("router-cache-v5")).unwrap();

        fixture
            .cmd()
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("namespace is missing"));
        assert!(!has_namespace(&state, "router-cache-v5"));
    }

    #[test]
    fn status_shows_registration() {
        let fixture = Fixture::new();
        fixture.install();

        fixture
            .cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("router-cache-v5"))
            .stdout(predicate::str::contains("active"));
    }

    #[test]
    fn journal_records_lifecycle() {
        let fixture = Fixture::new();
        fixture.install();

        let journal = std::fs::read_to_string(fixture.path("state").join("journal.log")).unwrap();
        assert!(journal.contains("install.completed"));
        assert!(journal.contains("activate.completed"));
    }
}
