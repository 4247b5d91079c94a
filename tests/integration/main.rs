//! Integration tests for kitprep

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Scratch workspace with its own settings file, apps root and caches
    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            Self::build(|_| String::new())
        }

        fn with_settings(extra: &str) -> Self {
            Self::build(|_| extra.to_string())
        }

        /// Workspace whose fetch command runs `body` as a shell script
        fn with_script(body: &str) -> Self {
            let ws = Self::build(|root| {
                format!(
                    "[prefetch]\ncommand = ['/bin/sh', '{}']\nstatus_update_every = 1\n",
                    root.join("fetch.sh").display()
                )
            });
            fs::write(ws.path().join("fetch.sh"), body).unwrap();
            ws
        }

        fn build(extra: impl FnOnce(&Path) -> String) -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            let settings = format!(
                "[general]\nevent_log = false\n\n\
                 [apps]\nroot = '{apps}'\n\n\
                 [cache]\ndefault_path = '{shared}'\nisolated_root = '{isolated}'\n\n{extra}",
                apps = root.join("apps").display(),
                shared = root.join("shared").display(),
                isolated = root.join("isolated").display(),
                extra = extra(root),
            );
            fs::write(root.join("settings.toml"), settings).unwrap();
            Self { dir }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn declare(&self, app: &str, declaration: &str) {
            let dir = self.path().join("apps").join(app);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("dependencies.toml"), declaration).unwrap();
        }

        fn populate(&self, cache: &Path, n: usize) {
            fs::create_dir_all(cache).unwrap();
            for i in 0..n {
                fs::create_dir(cache.join(format!("omni.ext_{i}"))).unwrap();
            }
        }

        fn shared_cache(&self) -> PathBuf {
            self.path().join("shared")
        }

        fn cmd(&self) -> Command {
            let mut cmd = kitprep();
            cmd.current_dir(self.path())
                .arg("--no-local")
                .arg("--settings")
                .arg(self.path().join("settings.toml"));
            cmd
        }
    }

    fn kitprep() -> Command {
        cargo_bin_cmd!("kitprep")
    }

    #[test]
    fn help_displays() {
        kitprep()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("dependency cache"));
    }

    #[test]
    fn version_displays() {
        kitprep()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("kitprep"));
    }

    #[test]
    fn estimate_default_json() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["estimate", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"estimated_seconds\": 1966.08"))
            .stdout(predicate::str::contains("\"bandwidth_mbps\": 50.0"));
    }

    #[test]
    fn estimate_halves_with_double_bandwidth() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["estimate", "--bandwidth", "100", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"estimated_seconds\": 983.04"));
    }

    #[test]
    fn estimate_rejects_zero_bandwidth() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["estimate", "--bandwidth", "0"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("bandwidth"));
    }

    #[test]
    fn validate_passes_clean_declaration() {
        let ws = Workspace::new();
        ws.declare(
            "usd_composer",
            "[dependencies]\n\"omni.kit.uiapp\" = {}\n\"omni.usd\" = \"1.10.4\"\n",
        );

        ws.cmd()
            .args(["--app", "usd_composer", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("dependencies valid"));
    }

    #[test]
    fn validate_rejects_duplicates() {
        let ws = Workspace::new();
        ws.declare(
            "usd_composer",
            "[dependencies]\n\"omni.usd\" = {}\n\"omni.ui\" = {}\n\"omni.usd-1.10.4\" = {}\n",
        );

        ws.cmd()
            .args(["--app", "usd_composer", "validate"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("declared twice"))
            .stderr(predicate::str::contains("omni.usd-1.10.4"));
    }

    #[test]
    fn validate_json_reports_issues() {
        let ws = Workspace::new();
        ws.declare(
            "usd_composer",
            "[dependencies]\n\"omni.usd\" = {}\n\"omni.usd\" = \"1.0.0\"\n",
        );

        // Duplicate TOML keys are a parse error, not a duplicate dependency
        ws.cmd()
            .args(["--app", "usd_composer", "validate", "--json"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid configuration"));

        ws.declare(
            "usd_composer",
            "[dependencies]\n\"Omni.Usd\" = {}\n",
        );
        ws.cmd()
            .args(["--app", "usd_composer", "validate", "--json"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("\"valid\": false"))
            .stdout(predicate::str::contains("\"kind\": \"malformed\""));
    }

    #[test]
    fn validate_without_declaration_uses_defaults() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["--app", "kit_base_editor", "validate", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"checked\": 0"));
    }

    #[test]
    fn invalid_app_id_is_rejected() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["--app", "../etc", "status"])
            .assert()
            .code(1);
    }

    #[test]
    fn unknown_strategy_is_config_error() {
        let ws = Workspace::new();
        ws.declare("usd_composer", "[cache]\nstrategy = \"private\"\n");

        ws.cmd()
            .args(["--app", "usd_composer", "status"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn status_isolated_app_is_preparing() {
        let ws = Workspace::new();
        ws.declare(
            "usd_composer",
            "[kit_sdk]\nversion = \"107.0.1\"\n\n[cache]\nstrategy = \"isolated\"\n",
        );

        ws.cmd()
            .args(["--app", "usd_composer", "status", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"scope\": \"isolated\""))
            .stdout(predicate::str::contains("\"sdk_version\": \"107.0.1\""))
            .stdout(predicate::str::contains("\"state\": \"preparing\""))
            .stdout(predicate::str::contains("usd_composer"));
    }

    #[test]
    fn status_global_ready_cache() {
        let ws = Workspace::new();
        ws.populate(&ws.shared_cache(), 60);

        ws.cmd()
            .args(["status", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"scope\": \"global\""))
            .stdout(predicate::str::contains("\"extension_count\": 60"))
            .stdout(predicate::str::contains("\"state\": \"ready\""))
            .stdout(predicate::str::contains("\"estimate\": null"));
    }

    #[test]
    fn config_path_honors_settings_flag() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("settings.toml"));
    }

    #[test]
    fn config_show() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("ready_threshold = 50"));
    }

    #[test]
    fn config_set_rejects_unknown_key() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn prefetch_skips_ready_cache() {
        let ws = Workspace::with_settings("[prefetch]\ncommand = ['/bin/false']\n");
        ws.populate(&ws.shared_cache(), 50);

        ws.cmd()
            .arg("prefetch")
            .assert()
            .success()
            .stdout(predicate::str::contains("nothing to fetch"));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        #[test]
        fn prefetch_populates_empty_cache() {
            let ws = Workspace::with_script(
                "mkdir -p \"$KITPREP_CACHE_PATH\"\n\
                 i=0\nwhile [ $i -lt 50 ]; do mkdir \"$KITPREP_CACHE_PATH/omni.ext_$i\"; echo \"fetched $i\"; i=$((i+1)); done\n",
            );

            ws.cmd()
                .arg("prefetch")
                .assert()
                .success()
                .stdout(predicate::str::contains("prefetch complete"));

            assert_eq!(fs::read_dir(ws.shared_cache()).unwrap().count(), 50);
        }

        #[test]
        fn prefetch_passes_profile_and_app() {
            let ws = Workspace::with_script("echo \"$KITPREP_APP $*\" > \"$(dirname \"$0\")/args.txt\"\n");
            ws.declare("usd_composer", "[cache]\nstrategy = \"isolated\"\n");

            ws.cmd()
                .args(["--app", "usd_composer", "prefetch", "--config", "debug", "-v"])
                .assert()
                .success();

            let args = fs::read_to_string(ws.path().join("args.txt")).unwrap();
            assert_eq!(args.trim(), "usd_composer --prefetch --config debug -v");
        }

        #[test]
        fn prefetch_passes_child_exit_code_through() {
            let ws = Workspace::with_script("echo 'mirror unreachable' >&2\nexit 3\n");

            ws.cmd()
                .arg("prefetch")
                .assert()
                .code(3)
                .stderr(predicate::str::contains("mirror unreachable"));
        }
    }
}
