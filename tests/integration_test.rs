use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_therapy-plan-pdf"))
}

fn output_dir() -> &'static Path {
    Path::new("tests/output")
}

fn setup() {
    fs::create_dir_all(output_dir()).expect("Failed to create output directory");
}

fn cleanup_file(name: &str) {
    let path = output_dir().join(name);
    if path.exists() {
        fs::remove_file(&path).ok();
    }
}

/// Fresh database per test.
fn temp_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = dir.path().join("app.db");
    (dir, db)
}

fn run(db: &Path, args: &[&str]) -> Output {
    cargo_bin()
        .arg("--db")
        .arg(db)
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn assert_pdf(path: &Path) {
    assert!(path.exists(), "PDF file was not created");
    let bytes = fs::read(path).expect("Failed to read PDF");
    assert!(bytes.starts_with(b"%PDF"), "Output is not a PDF");
    assert!(bytes.len() > 1000, "PDF file is too small, likely empty or corrupt");
}

#[test]
fn test_render_plan_file() {
    setup();
    let output_file = "test-render-plan.pdf";
    cleanup_file(output_file);
    let (_dir, db) = temp_db();

    let output = run(
        &db,
        &[
            "render",
            "-i", "tests/fixtures/plan.json",
            "-o", &format!("tests/output/{}", output_file),
        ],
    );

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&output_dir().join(output_file));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Erika Mustermann"));
    assert!(stdout.contains("Active items: 3"));
}

#[test]
fn test_render_with_duration_override() {
    setup();
    let output_file = "test-render-duration.pdf";
    cleanup_file(output_file);
    let (_dir, db) = temp_db();

    let output = run(
        &db,
        &[
            "render",
            "-i", "tests/fixtures/plan.json",
            "--duration", "9",
            "-o", &format!("tests/output/{}", output_file),
        ],
    );

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&output_dir().join(output_file));
}

#[test]
fn test_render_does_not_create_database() {
    setup();
    let output_file = "test-render-no-db.pdf";
    cleanup_file(output_file);
    let (_dir, db) = temp_db();

    let output = run(
        &db,
        &[
            "render",
            "-i", "tests/fixtures/plan.json",
            "-o", &format!("tests/output/{}", output_file),
        ],
    );

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&output_dir().join(output_file));
    assert!(!db.exists(), "render created {}", db.display());
}

#[test]
fn test_render_default_file_name() {
    let (dir, db) = temp_db();
    let plan = fs::canonicalize("tests/fixtures/plan.json").expect("fixture missing");

    let output = cargo_bin()
        .current_dir(dir.path())
        .arg("--db")
        .arg(&db)
        .args(["render", "-i"])
        .arg(&plan)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&dir.path().join("RevitaClinic_Therapieplan_Erika_Mustermann.pdf"));
}

#[test]
fn test_plan_without_active_items_still_renders() {
    setup();
    let output_file = "test-empty-table.pdf";
    cleanup_file(output_file);
    let (_dir, db) = temp_db();

    let output = run(
        &db,
        &[
            "render",
            "-i", "tests/fixtures/empty_plan.json",
            "-o", &format!("tests/output/{}", output_file),
        ],
    );

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&output_dir().join(output_file));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Active items: 0"));
}

#[test]
fn test_missing_logo_is_not_fatal() {
    setup();
    let output_file = "test-missing-logo.pdf";
    cleanup_file(output_file);
    let (_dir, db) = temp_db();

    let output = run(
        &db,
        &[
            "--logo", "nonexistent-logo.png",
            "render",
            "-i", "tests/fixtures/plan.json",
            "-o", &format!("tests/output/{}", output_file),
        ],
    );

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&output_dir().join(output_file));
}

#[test]
fn test_save_list_export_delete() {
    setup();
    let output_file = "test-export.pdf";
    cleanup_file(output_file);
    let (_dir, db) = temp_db();

    let saved = run(&db, &["save", "-i", "tests/fixtures/plan.json"]);
    assert!(saved.status.success(), "Save failed: {:?}", saved);
    assert!(String::from_utf8_lossy(&saved.stdout).contains("Revision: 1"));

    // Saving again continues from the stored revision
    let saved = run(&db, &["save", "-i", "tests/fixtures/plan.json"]);
    assert!(saved.status.success(), "Second save failed: {:?}", saved);
    assert!(String::from_utf8_lossy(&saved.stdout).contains("Revision: 2"));

    let listed = run(&db, &["list"]);
    assert!(listed.status.success());
    assert!(String::from_utf8_lossy(&listed.stdout).contains("Erika Mustermann"));

    let exported = run(
        &db,
        &[
            "export",
            "-n", "Erika Mustermann",
            "-o", &format!("tests/output/{}", output_file),
        ],
    );
    assert!(exported.status.success(), "Export failed: {:?}", exported);
    assert_pdf(&output_dir().join(output_file));

    let deleted = run(&db, &["delete", "-n", "Erika Mustermann"]);
    assert!(deleted.status.success(), "Delete failed: {:?}", deleted);

    let listed = run(&db, &["list"]);
    assert!(!String::from_utf8_lossy(&listed.stdout).contains("Erika Mustermann"));
}

#[test]
fn test_catalog_by_category() {
    let (_dir, db) = temp_db();
    let output = run(&db, &["catalog", "--category", "1"]);

    assert!(output.status.success(), "Command failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 Basis"));
    assert!(stdout.contains("S020  Vitamin D3"));
    assert!(stdout.contains("(Lösung)"));
    assert!(!stdout.contains("Hormone"));
}

#[test]
fn test_export_unknown_patient() {
    let (_dir, db) = temp_db();
    let output = run(&db, &["export", "-n", "Niemand", "-o", "tests/output/should-not-exist.pdf"]);
    assert!(!output.status.success(), "Command should have failed for unknown patient");
}

#[test]
fn test_delete_unknown_patient() {
    let (_dir, db) = temp_db();
    let output = run(&db, &["delete", "-n", "Niemand"]);
    assert!(!output.status.success(), "Command should have failed for unknown patient");
}

#[test]
fn test_invalid_plan_file() {
    let (_dir, db) = temp_db();
    let output = run(
        &db,
        &["render", "-i", "nonexistent.json", "-o", "tests/output/should-not-exist.pdf"],
    );
    assert!(!output.status.success(), "Command should have failed for missing plan file");
}

#[test]
fn test_invalid_clinic_profile() {
    let (_dir, db) = temp_db();
    let output = run(
        &db,
        &[
            "--clinic", "nonexistent-clinic.json",
            "render",
            "-i", "tests/fixtures/plan.json",
            "-o", "tests/output/should-not-exist.pdf",
        ],
    );
    assert!(!output.status.success(), "Command should have failed for missing clinic profile");
}
