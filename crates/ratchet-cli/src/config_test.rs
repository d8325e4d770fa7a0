use super::*;

use std::fs;
use tempfile::TempDir;

#[test]
fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str("name: orders_db").unwrap();
    assert_eq!(config.name, "orders_db");
    assert_eq!(config.migrations_path, "migrations");
    assert_eq!(config.version_table, "SchemaMigrations");
    assert_eq!(config.lock_table, "SchemaMigrationsLock");
    assert_eq!(config.partitioned_concurrency, 1);
    assert_eq!(config.sequence.interval, 10);
    assert_eq!(config.sequence.zero_prefix_length, 6);
    assert_eq!(config.database.backend, DbBackend::Memory);
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
name: orders_db
migrations_path: db/migrations
version_table: OrdersSchemaMigrations
lock_table: OrdersSchemaMigrationsLock
partitioned_concurrency: 8
sequence:
  interval: 100
  zero_prefix_length: 4
database:
  type: memory
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.migrations_path, "db/migrations");
    assert_eq!(config.version_table, "OrdersSchemaMigrations");
    assert_eq!(config.partitioned_concurrency, 8);
    assert_eq!(config.sequence.interval, 100);
    assert_eq!(config.sequence.zero_prefix_length, 4);
}

#[test]
fn test_unknown_fields_are_rejected() {
    let result: Result<Config, _> = serde_yaml::from_str("name: x\nnot_a_field: 1");
    assert!(result.is_err());
}

#[test]
fn test_load_from_dir_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.migrations_path, "migrations");
}

#[test]
fn test_load_from_dir_reads_ratchet_yml() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("ratchet.yml"),
        "name: from_file\nmigrations_path: schema",
    )
    .unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name, "from_file");
    assert_eq!(config.migrations_dir(dir.path()), dir.path().join("schema"));
}

#[test]
fn test_empty_name_fails_validation() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ratchet.yml"), "name: \"\"").unwrap();
    assert!(Config::load_from_dir(dir.path()).is_err());
}
