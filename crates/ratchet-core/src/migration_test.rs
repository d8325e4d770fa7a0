use super::*;

use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

#[test]
fn test_loads_sorted_with_names() {
    let dir = TempDir::new().unwrap();
    write(&dir, "000003.sql", "CREATE TABLE b (x INT64)");
    write(&dir, "000002_test.sql", "CREATE TABLE a (x INT64)");
    write(&dir, "000004.sql", "CREATE TABLE c (x INT64)");

    let migrations = load_migrations(dir.path(), &[], false).unwrap();
    let versions: Vec<u64> = migrations.iter().map(|m| m.version).collect();
    let names: Vec<&str> = migrations.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(versions, vec![2, 3, 4]);
    assert_eq!(names, vec!["test", "", ""]);
    assert_eq!(migrations[0].file_name, "000002_test.sql");
}

#[test]
fn test_skip_versions() {
    let dir = TempDir::new().unwrap();
    write(&dir, "000002_test.sql", "CREATE TABLE a (x INT64)");
    write(&dir, "000003.sql", "CREATE TABLE b (x INT64)");
    write(&dir, "000004.sql", "CREATE TABLE c (x INT64)");

    let migrations = load_migrations(dir.path(), &[2, 3], false).unwrap();
    assert_eq!(migrations.len(), 1);
    assert_eq!(migrations[0].version, 4);
}

#[test]
fn test_duplicate_version_fails() {
    let dir = TempDir::new().unwrap();
    write(&dir, "2.sql", "CREATE TABLE a (x INT64)");
    write(&dir, "002_again.sql", "CREATE TABLE b (x INT64)");

    let err = load_migrations(dir.path(), &[], false).unwrap_err();
    assert!(matches!(err, CoreError::DuplicateVersion { version: 2, .. }));
}

#[test]
fn test_ignores_foreign_files_and_directories() {
    let dir = TempDir::new().unwrap();
    write(&dir, "README.md", "# docs");
    write(&dir, "000001.down.sql", "DROP TABLE a");
    write(&dir, "notes.txt", "scratch");
    fs::create_dir(dir.path().join("fixtures")).unwrap();
    write(&dir, "000001.sql", "CREATE TABLE a (x INT64)");

    let migrations = load_migrations(dir.path(), &[], false).unwrap();
    assert_eq!(migrations.len(), 1);
    assert_eq!(migrations[0].version, 1);
}

#[test]
fn test_up_and_generated_suffixes() {
    let dir = TempDir::new().unwrap();
    write(&dir, "000006_add_users.up.sql", "CREATE TABLE users (x INT64)");
    write(&dir, "000007_seed.generated.sql", "CREATE TABLE seeded (x INT64)");

    let migrations = load_migrations(dir.path(), &[], false).unwrap();
    assert_eq!(migrations.len(), 2);
    assert_eq!(migrations[0].name, "add_users");
    assert_eq!(migrations[1].name, "seed");
}

#[test]
fn test_partitioned_detection_flag() {
    let dir = TempDir::new().unwrap();
    write(&dir, "001.sql", "DELETE FROM T WHERE X = 1");
    write(&dir, "002.sql", "DELETE FROM T WHERE X IN (SELECT X FROM U)");

    let detected = load_migrations(dir.path(), &[], true).unwrap();
    assert_eq!(detected[0].kind, StatementKind::PartitionedDml);
    assert_eq!(detected[1].kind, StatementKind::Dml);

    let coalesced = load_migrations(dir.path(), &[], false).unwrap();
    assert_eq!(coalesced[0].kind, StatementKind::Dml);
    assert_eq!(coalesced[1].kind, StatementKind::Dml);
}

#[test]
fn test_directive_overrides_inspected_kind() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "001.sql",
        "-- @ratchet.StatementKind=ConvergentDML\n-- @ratchet.Concurrency=1\nUPDATE t SET x = 1 WHERE x = 0",
    );

    let migrations = load_migrations(dir.path(), &[], true).unwrap();
    assert_eq!(migrations[0].kind, StatementKind::ConvergentDml);
    assert_eq!(migrations[0].directives.concurrency, Some(1));
    assert_eq!(migrations[0].statements.len(), 1);
}

#[test]
fn test_statements_are_comment_free() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "001.sql",
        "-- leading comment\nCREATE TABLE a (x INT64);\n/* between */\nCREATE TABLE b (x INT64);\n",
    );

    let migrations = load_migrations(dir.path(), &[], false).unwrap();
    assert_eq!(
        migrations[0].statements,
        vec!["CREATE TABLE a (x INT64)", "CREATE TABLE b (x INT64)"]
    );
}

#[test]
fn test_directive_rescues_a_mixed_file() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "001.sql",
        "-- @ratchet.StatementKind=DML\nCREATE TABLE a (x INT64);\nINSERT INTO a (x) VALUES (1);",
    );

    let migrations = load_migrations(dir.path(), &[], false).unwrap();
    assert_eq!(migrations[0].kind, StatementKind::Dml);
    assert_eq!(migrations[0].statements.len(), 2);
}

#[test]
fn test_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let err = load_migrations(&missing, &[], false).unwrap_err();
    assert!(matches!(err, CoreError::IoWithPath { .. }));
}

#[test]
fn test_mixed_file_fails_at_load() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "001.sql",
        "CREATE TABLE a (x INT64);\nINSERT INTO a (x) VALUES (1);",
    );
    let err = load_migrations(dir.path(), &[], false).unwrap_err();
    assert!(matches!(err, CoreError::MixedStatementKinds { .. }));
}
