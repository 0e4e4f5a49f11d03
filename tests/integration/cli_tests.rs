//! CLI integration tests for assetsweep
//!
//! These tests run the binary against small projects laid out in temporary
//! directories.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command for the assetsweep binary
fn assetsweep() -> Command {
    Command::cargo_bin("assetsweep").unwrap()
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Project with one level, one used texture and one unused texture in its
/// own folder
fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "Content/Maps/LevelA.umap", "level");
    write(
        root,
        "Content/Maps/LevelA.umap.deps.json",
        r#"{"class": "World", "hard": ["/Game/Textures/T_Rock"]}"#,
    );
    write(root, "Content/Textures/T_Rock.uasset", "texture");
    write(root, "Content/Textures/T_Rock.uasset.deps.json", r#"{"class": "Texture2D"}"#);
    write(root, "Content/Old/T_Unused.uasset", "texture");
    write(root, "Content/Old/T_Unused.uasset.deps.json", r#"{"class": "Texture2D"}"#);
    dir
}

fn json_output(args: &[&str], project: &Path) -> serde_json::Value {
    let output = assetsweep()
        .arg(project)
        .args(["--format", "json", "--quiet"])
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "assetsweep failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("stdout is valid JSON")
}

fn classification_of<'a>(doc: &'a serde_json::Value, id: &str) -> Option<&'a str> {
    doc["report"]["assets"]
        .as_array()?
        .iter()
        .find(|a| a["id"] == id)?["classification"]
        .as_str()
}

// ============================================================================
// Help and version
// ============================================================================

#[test]
fn test_help_flag() {
    assetsweep()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--plan"))
        .stdout(predicate::str::contains("--quarantine-dir"));
}

#[test]
fn test_version_flag() {
    assetsweep()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("assetsweep"));
}

// ============================================================================
// Reports
// ============================================================================

#[test]
fn test_json_report_classifies_assets() {
    let project = sample_project();
    let doc = json_output(&[], project.path());

    assert_eq!(doc["report"]["status"], "complete");
    assert_eq!(classification_of(&doc, "/Game/Maps/LevelA"), Some("used"));
    assert_eq!(classification_of(&doc, "/Game/Textures/T_Rock"), Some("used"));
    assert_eq!(classification_of(&doc, "/Game/Old/T_Unused"), Some("unused"));
    assert!(doc.get("plan").map_or(true, |p| p.is_null()));
}

#[test]
fn test_json_report_with_plan() {
    let project = sample_project();
    let doc = json_output(&["--plan"], project.path());

    let steps = doc["plan"]["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["id"], "/Game/Old/T_Unused");
    assert_eq!(steps[0]["reason"], "unreferenced");

    let folders = doc["plan"]["folders_to_remove"].as_array().unwrap();
    assert_eq!(folders.len(), 1);
    assert!(folders[0].as_str().unwrap().ends_with("Old"));
}

#[test]
fn test_json_report_to_file() {
    let project = sample_project();
    let out = project.path().join("report.json");

    assetsweep()
        .arg(project.path())
        .args(["--format", "json", "--quiet", "--output"])
        .arg(&out)
        .assert()
        .success();

    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(classification_of(&doc, "/Game/Old/T_Unused"), Some("unused"));
}

#[test]
fn test_terminal_report_lists_unused_assets() {
    let project = sample_project();

    assetsweep()
        .arg(project.path())
        .args(["--quiet", "--plan"])
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("/Game/Old/T_Unused"))
        .stdout(predicate::str::contains("Summary"));
}

#[test]
fn test_cli_rules_override_defaults() {
    let project = sample_project();
    let doc = json_output(
        &["--exclude", "/Game/Old", "--root", "/Game/Textures/**"],
        project.path(),
    );

    assert_eq!(classification_of(&doc, "/Game/Old/T_Unused"), Some("excluded"));
    assert_eq!(classification_of(&doc, "/Game/Textures/T_Rock"), Some("used"));
}

#[test]
fn test_config_file_in_project_root() {
    let project = sample_project();
    write(
        project.path(),
        ".assetsweep.yml",
        "exclude:\n  paths:\n    - /Game/Old\n",
    );

    let doc = json_output(&[], project.path());
    assert_eq!(classification_of(&doc, "/Game/Old/T_Unused"), Some("excluded"));
}

#[test]
fn test_missing_content_folder_fails() {
    let dir = TempDir::new().unwrap();

    assetsweep()
        .arg(dir.path())
        .arg("--quiet")
        .assert()
        .failure();
}

// ============================================================================
// Deletion
// ============================================================================

#[test]
fn test_delete_dry_run_moves_nothing() {
    let project = sample_project();

    assetsweep()
        .arg(project.path())
        .args(["--quiet", "--delete", "--dry-run"])
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("/Game/Old/T_Unused"));

    assert!(project.path().join("Content/Old/T_Unused.uasset").exists());
}

#[test]
fn test_delete_moves_plan_into_quarantine() {
    let project = sample_project();
    let quarantine = project.path().join("trash");
    let undo = project.path().join("undo.sh");

    assetsweep()
        .arg(project.path())
        .args(["--quiet", "--delete", "--yes", "--quarantine-dir"])
        .arg(&quarantine)
        .arg("--undo-script")
        .arg(&undo)
        .assert()
        .success();

    let content = project.path().join("Content");
    assert!(!content.join("Old").exists(), "emptied folder is removed");
    assert!(quarantine.join("Old/T_Unused.uasset").exists());
    assert!(quarantine.join("Old/T_Unused.uasset.deps.json").exists());
    assert!(content.join("Textures/T_Rock.uasset").exists());
    assert!(content.join("Maps/LevelA.umap").exists());

    let script = fs::read_to_string(&undo).unwrap();
    assert!(script.contains("T_Unused.uasset"));
}
