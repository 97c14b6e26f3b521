//! Config loading tests.
//!
//! Tests for `load_sim_config()`: path resolution, defaults, unknown field
//! rejection and validation failures on on-disk fixtures.

use arm_common::config::{ConfigError, LogLevel, ResumeMode, load_sim_config};
use arm_common::tunables::Tunables;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SHARED: &str = r#"
[shared]
service_name = "arm-sim-test"
"#;

fn robot_toml(label: &str, program: u32) -> String {
    format!(
        r#"
[[robots]]
label = "{label}"
serial_number = "SN-{label}"
id = 1
name = "{label}"
program = {program}
version = "1.0"
"#
    )
}

fn program_toml(id: u32, path: &str) -> String {
    format!(
        r#"
[[programs]]
program = {id}
path = "{path}"
time_length = 10.0
"#
    )
}

fn write(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("simulator.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_minimal_config_with_defaults() {
    let tmp = TempDir::new().unwrap();
    let content = format!("{SHARED}{}{}", program_toml(1, "p1.tsv"), robot_toml("r1", 1));
    let config = load_sim_config(&write(tmp.path(), &content)).unwrap();

    assert_eq!(config.shared.log_level, LogLevel::Info);
    assert_eq!(config.server.refresh_rate, 1.0);
    assert_eq!(config.server.resume_mode, ResumeMode::Skip);
    assert_eq!(config.robots.len(), 1);
    let robot = &config.robots[0];
    assert!(!robot.laser && !robot.suction_cup && !robot.gripper);
}

#[test]
fn test_relative_program_path_resolved_against_config_dir() {
    let tmp = TempDir::new().unwrap();
    let content = format!(
        "{SHARED}{}{}",
        program_toml(1, "programs/p1.tsv"),
        robot_toml("r1", 1)
    );
    let config = load_sim_config(&write(tmp.path(), &content)).unwrap();
    assert_eq!(config.programs[0].path, tmp.path().join("programs/p1.tsv"));
}

#[test]
fn test_absolute_program_path_kept() {
    let tmp = TempDir::new().unwrap();
    let content = format!(
        "{SHARED}{}{}",
        program_toml(1, "/opt/programs/p1.tsv"),
        robot_toml("r1", 1)
    );
    let config = load_sim_config(&write(tmp.path(), &content)).unwrap();
    assert_eq!(config.programs[0].path, Path::new("/opt/programs/p1.tsv"));
}

#[test]
fn test_server_section_parsed() {
    let tmp = TempDir::new().unwrap();
    let content = format!(
        "{SHARED}\n[server]\nrefresh_rate = 0.25\nresume_mode = \"in_place\"\n{}{}",
        program_toml(1, "p1.tsv"),
        robot_toml("r1", 1)
    );
    let config = load_sim_config(&write(tmp.path(), &content)).unwrap();
    assert_eq!(config.server.refresh_rate, 0.25);
    assert_eq!(config.server.resume_mode, ResumeMode::InPlace);
}

#[test]
fn test_missing_file() {
    let tmp = TempDir::new().unwrap();
    let result = load_sim_config(&tmp.path().join("nope.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound)));
}

#[test]
fn test_unknown_top_level_field_rejected() {
    let tmp = TempDir::new().unwrap();
    let content = format!(
        "{SHARED}{}{}\n[extra]\nfoo = 1\n",
        program_toml(1, "p1.tsv"),
        robot_toml("r1", 1)
    );
    let result = load_sim_config(&write(tmp.path(), &content));
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_unknown_nested_fields_rejected() {
    let cases = [
        // misspelt resume_mode would otherwise fall back to skip
        format!(
            "{SHARED}\n[server]\nresume_mod = \"in_place\"\n{}{}",
            program_toml(1, "p1.tsv"),
            robot_toml("r1", 1)
        ),
        format!(
            "{SHARED}{}{}lazer = true\n",
            program_toml(1, "p1.tsv"),
            robot_toml("r1", 1)
        ),
        format!(
            "{SHARED}{}time_lenght = 5.0\n{}",
            program_toml(1, "p1.tsv"),
            robot_toml("r1", 1)
        ),
    ];

    for content in cases {
        let tmp = TempDir::new().unwrap();
        let result = load_sim_config(&write(tmp.path(), &content));
        assert!(
            matches!(result, Err(ConfigError::ParseError(_))),
            "expected parse error for:\n{content}"
        );
    }
}

#[test]
fn test_validation_failures() {
    let cases = [
        // no robots
        format!("{SHARED}{}", program_toml(1, "p1.tsv")),
        // duplicate labels
        format!(
            "{SHARED}{}{}{}",
            program_toml(1, "p1.tsv"),
            robot_toml("r1", 1),
            robot_toml("r1", 1)
        ),
        // undefined program
        format!("{SHARED}{}{}", program_toml(1, "p1.tsv"), robot_toml("r1", 2)),
        // duplicate program id
        format!(
            "{SHARED}{}{}{}",
            program_toml(1, "p1.tsv"),
            program_toml(1, "p2.tsv"),
            robot_toml("r1", 1)
        ),
        // non-positive refresh rate
        format!(
            "{SHARED}\n[server]\nrefresh_rate = 0.0\n{}{}",
            program_toml(1, "p1.tsv"),
            robot_toml("r1", 1)
        ),
        // label with a separator in it
        format!("{SHARED}{}{}", program_toml(1, "p1.tsv"), robot_toml("r 1", 1)),
    ];

    for content in cases {
        let tmp = TempDir::new().unwrap();
        let result = load_sim_config(&write(tmp.path(), &content));
        assert!(
            matches!(result, Err(ConfigError::ValidationError(_))),
            "expected validation error for:\n{content}"
        );
    }
}

#[test]
fn test_sample_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/simulator.toml");
    let config = load_sim_config(&path).unwrap();
    assert_eq!(config.robots.len(), 3);
    assert!(config.programs.iter().all(|p| p.path.exists()));
}

#[test]
fn test_tunables_from_lookup_rejects_garbage() {
    let result = Tunables::from_lookup(|key| (key == "ALARMS_RANGE").then(|| "many".to_string()));
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}
