//! Integration tests for the benchmark binaries.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn generator_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_corpus-generator"))
}

fn benchmark_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_io-benchmark"))
}

fn generate(root: &std::path::Path, squadrons: usize, members: usize) {
    generator_cmd()
        .arg("--output")
        .arg(root)
        .args(["--campaign", "Arras"])
        .args(["--squadrons", &squadrons.to_string()])
        .args(["--members", &members.to_string()])
        .args(["--medal-tables", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Corpus generation complete!"));
}

mod help_command {
    use super::*;

    #[test]
    fn shows_help_with_flag() {
        benchmark_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:"));
    }

    #[test]
    fn shows_version_with_flag() {
        generator_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

mod corpus_generator {
    use super::*;

    #[test]
    fn writes_campaign_layout() {
        let temp_dir = TempDir::new().unwrap();
        generate(temp_dir.path(), 3, 4);

        let campaign = temp_dir.path().join("User/Campaigns/Arras");
        for id in ["10001", "10002", "10003"] {
            assert!(campaign.join(format!("Personnel/{id}.json")).is_file());
        }
        assert!(campaign.join("Medals/table_00.json").is_file());
        assert!(campaign.join("Medals/table_01.json").is_file());

        let roster: serde_json::Value = serde_json::from_slice(
            &std::fs::read(campaign.join("Personnel/10001.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(
            roster["squadronMemberCollection"]
                .as_object()
                .unwrap()
                .len(),
            4
        );
    }
}

mod io_benchmark {
    use super::*;

    #[test]
    fn reports_json_results() {
        let temp_dir = TempDir::new().unwrap();
        generate(temp_dir.path(), 5, 6);

        let output = benchmark_cmd()
            .arg(temp_dir.path())
            .args(["--runs", "2", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let results: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let results = results.as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["scenario"], "Arras");
        assert_eq!(results[0]["entities"], 30);
        assert_eq!(results[0]["runs"], 2);
        assert!(results[0]["naive_ms"].as_f64().unwrap() >= 0.0);
        assert!(results[0]["gain_pct"].as_f64().unwrap() <= 100.0);
    }

    #[test]
    fn empty_campaign_reports_zero_gain() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("User/Campaigns/Empty/Personnel")).unwrap();

        benchmark_cmd()
            .arg(temp_dir.path())
            .args(["--campaign", "Empty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("0 entities"))
            .stdout(predicate::str::contains("gain 0.0%"));
    }

    #[test]
    fn no_campaigns_found() {
        let temp_dir = TempDir::new().unwrap();

        benchmark_cmd()
            .arg(temp_dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("No campaigns found"));
    }

    #[test]
    fn invalid_config_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("repository.json");
        std::fs::write(&config, r#"{"fingerprint": "mtime"}"#).unwrap();

        benchmark_cmd()
            .arg(temp_dir.path())
            .arg("--config")
            .arg(&config)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Config validation failed"));
    }
}
