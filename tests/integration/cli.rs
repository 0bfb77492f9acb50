use predicates::prelude::*;
use writenode::test_utils::{PipelineFixture, work_file_at};

use crate::common::TestProject;

/// Profiles are listed with their templates
#[test]
fn test_profiles_lists_templates() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();

    let output = project.run_writenode(&["profiles"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Exr Render"));
    assert!(output.stdout.contains("render:  nuke_shot_render"));
    assert!(output.stdout.contains("proxy render:  nuke_shot_render_proxy"));
    assert!(output.stdout.contains("Total: 3 profiles"));
}

/// Names only, one per line, in configuration order
#[test]
fn test_profiles_names_only() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();

    project
        .command()
        .args(["profiles", "--names-only"])
        .assert()
        .success()
        .stdout("Exr Render\nDpx Render\nDated Render\n");
}

/// The resolved path is printed
#[test]
fn test_resolve_prints_render_path() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();
    let root = project.root_str();
    let script = work_file_at(&root, 3);

    let output = project
        .run_writenode(&[
            "resolve",
            "--script",
            &script,
            "--profile",
            "Exr Render",
            "--output",
            "beauty",
        ])
        .unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert_eq!(output.stdout.trim(), format!("{root}/sh010/renders/v003/sh010_beauty.%04d.exr"));
}

/// Proxy paths use half the requested size
#[test]
fn test_resolve_proxy_path() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();
    let root = project.root_str();
    let script = work_file_at(&root, 3);

    project
        .command()
        .args(["resolve", "--script", &script, "-p", "Exr Render", "-o", "fg"])
        .args(["--width", "2048", "--height", "1152", "--proxy"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "{root}/sh010/renders/v003/1024x576/sh010_fg.%04d.exr"
        )));
}

/// Details include the path preview
#[test]
fn test_resolve_details() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();
    let root = project.root_str();
    let script = work_file_at(&root, 1);

    project
        .command()
        .args(["resolve", "--script", &script, "--profile", "Dpx Render", "--details"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("context: {root}/sh010")))
        .stdout(predicate::str::contains("local: renders/v001"))
        .stdout(predicate::str::contains("file: sh010.%04d.dpx"));
}

/// Illegal output names fail with the reason
#[test]
fn test_resolve_illegal_output() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();
    let script = work_file_at(&project.root_str(), 1);

    project
        .command()
        .args(["resolve", "--script", &script, "--profile", "Exr Render", "--output", "bad/name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("illegal characters"));
}

/// Scripts outside the work area are refused
#[test]
fn test_resolve_outside_work_area() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();

    project
        .command()
        .args(["resolve", "--script", "/tmp/scratch.nk", "--profile", "Exr Render"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a work file"));
}

/// Unknown profiles list the configured ones
#[test]
fn test_resolve_unknown_profile() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();
    let script = work_file_at(&project.root_str(), 1);

    project
        .command()
        .args(["resolve", "--script", &script, "--profile", "Tiff Render"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not configured"))
        .stderr(predicate::str::contains(
            "Available profiles: Exr Render, Dpx Render, Dated Render",
        ));
}

/// Rendered frames are listed
#[test]
fn test_files_lists_frames() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();
    let root = project.root_str();
    let script = work_file_at(&root, 2);

    project
        .command()
        .args(["files", "--script", &script, "--profile", "Exr Render", "--output", "beauty"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No rendered files found"));

    project.touch("sh010/renders/v002/sh010_beauty.0001.exr").unwrap();
    project.touch("sh010/renders/v002/sh010_beauty.0002.exr").unwrap();

    let output = project
        .run_writenode(&[
            "files",
            "--script",
            &script,
            "--profile",
            "Exr Render",
            "--output",
            "beauty",
        ])
        .unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    let lines: Vec<&str> = output.stdout.lines().collect();
    assert_eq!(lines, vec![
        format!("{root}/sh010/renders/v002/sh010_beauty.0001.exr"),
        format!("{root}/sh010/renders/v002/sh010_beauty.0002.exr"),
    ]);
}

/// A valid configuration validates
#[test]
fn test_validate_valid_configuration() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();

    let output = project.run_writenode(&["validate"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("✓"));
    assert!(output.stdout.contains("3 profiles, all templates resolve"));
}

/// Missing templates are reported per profile
#[test]
fn test_validate_missing_template() {
    let project = TestProject::new(PipelineFixture::broken_profile()).unwrap();

    let output = project.run_writenode(&["validate"]).unwrap();
    assert!(!output.success);
    assert!(output.stdout.contains("✗"));
    assert!(output.stdout.contains("Broken Render"));
    assert!(output.stdout.contains("nuke_shot_rendr"));
    assert!(output.stderr.contains("1 problem(s) found"));

    let output = project.run_writenode(&["validate", "--no-fail"]).unwrap();
    assert!(output.success);
}

/// Syntax errors name the file
#[test]
fn test_invalid_configuration_syntax() {
    let project = TestProject::with_fixed_root(&PipelineFixture::invalid_syntax()).unwrap();

    project
        .command()
        .arg("profiles")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"))
        .stderr(predicate::str::contains("pipeline.yml"));
}

/// Without a configuration nothing can run
#[test]
fn test_missing_configuration() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();
    std::fs::remove_file(project.config_path()).unwrap();

    project
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}
