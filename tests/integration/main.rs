//! Integration tests for tlsetup

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn tlsetup() -> Command {
        let mut cmd = cargo_bin_cmd!("tlsetup");
        cmd.env_remove("TLSETUP_CONFIG")
            .env_remove("TEXLIVE_VERSION")
            .env_remove("RUST_LOG");
        cmd
    }

    fn config_with_state(dir: &Path) -> std::path::PathBuf {
        let state = dir.join("state.json");
        let config = dir.join("config.toml");
        std::fs::write(
            &config,
            format!(
                "[cache]\nstate_file = {:?}\ndir = {:?}\n",
                state.display().to_string(),
                dir.join("store").display().to_string()
            ),
        )
        .unwrap();
        config
    }

    #[test]
    fn help_displays() {
        tlsetup()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("TeX Live"));
    }

    #[test]
    fn version_displays() {
        tlsetup()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("tlsetup"));
    }

    #[test]
    fn keys_for_pinned_release() {
        tlsetup()
            .args([
                "keys",
                "--offline",
                "--texlive-version",
                "2024",
                "--packages",
                "hyperref,amsmath",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"secondary\": \"tlsetup-v1-"))
            .stdout(predicate::str::contains("-2024-"))
            .stdout(predicate::str::contains("oldPrimary"));
    }

    #[test]
    fn keys_ignore_package_order() {
        let first = tlsetup()
            .args(["keys", "--offline", "--texlive-version", "2024", "-p", "a,b"])
            .output()
            .unwrap();
        let second = tlsetup()
            .args(["keys", "--offline", "--texlive-version", "2024", "-p", "b,a"])
            .output()
            .unwrap();
        let primary = |out: &[u8]| {
            let json: serde_json::Value = serde_json::from_slice(out).unwrap();
            json["primary"].as_str().unwrap().to_string()
        };
        assert_eq!(primary(&first.stdout), primary(&second.stdout));
    }

    #[test]
    fn invalid_version_fails() {
        tlsetup()
            .args(["keys", "--offline", "--texlive-version", "20x4"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn release_offline_prints_window() {
        tlsetup()
            .args(["release", "--offline"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"previous\""))
            .stdout(predicate::str::contains("\"latest\""))
            .stdout(predicate::str::contains("\"next\""));
    }

    #[test]
    fn invalid_config_reports_path() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(&config, "[install]\nversion = 2024\n").unwrap();

        tlsetup()
            .arg("--config")
            .arg(&config)
            .args(["release", "--offline"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("config.toml"));
    }

    #[test]
    fn save_without_state_is_a_noop() {
        let temp = TempDir::new().unwrap();
        let config = config_with_state(temp.path());

        tlsetup()
            .arg("--config")
            .arg(&config)
            .arg("save")
            .assert()
            .success()
            .stderr(predicate::str::contains("No installation recorded"));
    }

    #[test]
    fn save_consumes_empty_state() {
        let temp = TempDir::new().unwrap();
        let config = config_with_state(temp.path());
        let state = temp.path().join("state.json");
        std::fs::write(&state, "{}").unwrap();

        tlsetup()
            .arg("--config")
            .arg(&config)
            .arg("save")
            .assert()
            .success();
        assert!(!state.exists());
    }
}
