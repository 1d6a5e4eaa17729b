//! Integration tests for the tl CLI.
//!
//! Run with: `cargo test --package topolayout-cli --test cli_integration`

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

/// Helper to run tl in an isolated directory with its own config file.
fn run_tl_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tl"))
        .current_dir(dir)
        .env("TL_CONFIG", dir.join("config.json"))
        .env_remove("TL_FRAMES")
        .env_remove("TL_SEED")
        .env_remove("TL_MAX_ITERATIONS")
        .env_remove("TL_TIME_LIMIT_MS")
        .env_remove("TL_FRAME_TIMEOUT_MS")
        .args(args)
        .output()
        .expect("Failed to execute tl command")
}

/// A switch with two ports, two wired hosts and one pinned host.
fn write_physical_topology(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("office.json");
    fs::write(
        &path,
        r#"{
  "kind": "physical",
  "hosts": [
    { "id": 10, "x": -120, "y": 40 },
    { "id": 11, "x": 130, "y": -60 },
    { "id": 12, "x": 25, "y": 25, "pinned": true }
  ],
  "devices": [{ "id": 1 }],
  "ports": [
    { "id": 2, "owner": 1 },
    { "id": 3, "owner": 1 }
  ],
  "wires": [
    { "source": 10, "destination": 2 },
    { "source": 11, "destination": 3 }
  ]
}"#,
    )
    .unwrap();
    path
}

fn write_logical_topology(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("subnets.json");
    fs::write(
        &path,
        r#"{
  "kind": "logical",
  "vertices": [
    { "id": 1, "x": -100, "y": 0, "groups": ["10.0.0.0/24"] },
    { "id": 2, "x": 100, "y": 0, "groups": ["10.0.0.0/24"] },
    { "id": 3, "x": 0, "y": 120 }
  ],
  "edges": [[1, 3]],
  "viewport": { "width": 800, "height": 600 }
}"#,
    )
    .unwrap();
    path
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}"))
}

// =============================================================================
// Run command
// =============================================================================

#[test]
fn test_run_physical_prints_positions() {
    let temp = TempDir::new().unwrap();
    let topology = write_physical_topology(temp.path());

    let output = run_tl_in_dir(
        temp.path(),
        &["run", topology.to_str().unwrap(), "--frames", "5", "--seed", "7"],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary = stdout_json(&output);
    assert_eq!(summary["kind"], "physical");
    assert_eq!(summary["frames"], 5);
    let positions = summary["positions"].as_object().unwrap();
    // Hosts and the device are reported; ports are not.
    for id in ["1", "10", "11", "12"] {
        assert!(positions.contains_key(id), "missing {id}");
    }
    assert!(!positions.contains_key("2"));
    assert_eq!(positions["12"]["x"], 25.0);
    assert_eq!(positions["12"]["y"], 25.0);
}

#[test]
fn test_run_is_reproducible_with_seed() {
    let temp = TempDir::new().unwrap();
    let topology = write_physical_topology(temp.path());
    // Bound passes by iterations only so timing cannot change the result.
    fs::write(
        temp.path().join("config.json"),
        r#"{ "physical": { "budget": { "max_iterations": 10, "time_limit_ms": 60000 } } }"#,
    )
    .unwrap();
    let args = [
        "run",
        topology.to_str().unwrap(),
        "--frames",
        "3",
        "--seed",
        "42",
    ];

    let first = stdout_json(&run_tl_in_dir(temp.path(), &args));
    let second = stdout_json(&run_tl_in_dir(temp.path(), &args));
    assert_eq!(first["positions"], second["positions"]);
}

#[test]
fn test_run_logical_writes_output_file() {
    let temp = TempDir::new().unwrap();
    let topology = write_logical_topology(temp.path());
    let out = temp.path().join("result.json");

    let output = run_tl_in_dir(
        temp.path(),
        &[
            "run",
            topology.to_str().unwrap(),
            "-n",
            "4",
            "--output",
            out.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Wrote 3 positions"));

    let summary: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(summary["kind"], "logical");
    assert_eq!(summary["positions"].as_object().unwrap().len(), 3);
}

#[test]
fn test_run_table_format() {
    let temp = TempDir::new().unwrap();
    let topology = write_physical_topology(temp.path());

    let output = run_tl_in_dir(
        temp.path(),
        &["run", topology.to_str().unwrap(), "-n", "2", "--format", "table"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("physical layout"));
    assert!(stdout.contains("element"));
}

#[test]
fn test_run_rejects_dangling_wire() {
    let temp = TempDir::new().unwrap();
    let topology = temp.path().join("broken.json");
    fs::write(
        &topology,
        r#"{ "kind": "physical", "hosts": [{ "id": 1 }], "wires": [{ "source": 1, "destination": 9 }] }"#,
    )
    .unwrap();

    let output = run_tl_in_dir(temp.path(), &["run", topology.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid wire"));
}

#[test]
fn test_run_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let output = run_tl_in_dir(temp.path(), &["run", "does-not-exist.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read topology"));
}

// =============================================================================
// Config command
// =============================================================================

#[test]
fn test_config_init_then_show() {
    let temp = TempDir::new().unwrap();

    let output = run_tl_in_dir(temp.path(), &["config", "init"]);
    assert!(output.status.success());
    assert!(temp.path().join("config.json").exists());

    // A second init without --force refuses to overwrite.
    let output = run_tl_in_dir(temp.path(), &["config", "init"]);
    assert!(!output.status.success());

    let output = run_tl_in_dir(temp.path(), &["config", "init", "--force"]);
    assert!(output.status.success());

    let output = run_tl_in_dir(temp.path(), &["config", "show", "--json"]);
    assert!(output.status.success());
    let config = stdout_json(&output);
    assert_eq!(config["frames"], 60);
    assert_eq!(config["physical"]["velocity_decay"], 0.75);
    assert_eq!(config["logical"]["equilibrium_distance"], 2.8);
}

#[test]
fn test_config_env_overrides_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.json"),
        r#"{ "frames": 12, "physical": { "budget": { "max_iterations": 4 } } }"#,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_tl"))
        .current_dir(temp.path())
        .env("TL_CONFIG", temp.path().join("config.json"))
        .env("TL_FRAMES", "3")
        .env_remove("TL_MAX_ITERATIONS")
        .args(["config", "show", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let config = stdout_json(&output);
    assert_eq!(config["frames"], 3);
    assert_eq!(config["physical"]["budget"]["max_iterations"], 4);
    assert_eq!(config["physical"]["budget"]["time_limit_ms"], 3);
}

#[test]
fn test_invalid_config_is_reported() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.json"),
        r#"{ "physical": { "velocity_decay": 2.0 } }"#,
    )
    .unwrap();

    let output = run_tl_in_dir(temp.path(), &["config", "show"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("velocity_decay"));
}
