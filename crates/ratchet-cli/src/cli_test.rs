use super::*;

use clap::Parser;

#[test]
fn test_parse_up_with_limit_and_skips() {
    let cli = Cli::try_parse_from([
        "ratchet",
        "migrate",
        "up",
        "5",
        "--skip-versions",
        "2,3",
        "--detect-partitioned-dml",
    ])
    .unwrap();

    let Commands::Migrate(migrate) = &cli.command;
    let MigrateCommands::Up(up) = &migrate.command else {
        panic!("expected up subcommand");
    };
    assert_eq!(up.limit, Some(5));
    assert_eq!(up.skip_versions, vec![2, 3]);
    assert!(up.detect_partitioned_dml);
    assert!(!up.print_rows_affected);
}

#[test]
fn test_parse_create_with_sequence_overrides() {
    let cli = Cli::try_parse_from([
        "ratchet",
        "migrate",
        "create",
        "add_users",
        "--interval",
        "100",
        "--zero-prefix-length",
        "4",
    ])
    .unwrap();

    let Commands::Migrate(migrate) = &cli.command;
    let MigrateCommands::Create(create) = &migrate.command else {
        panic!("expected create subcommand");
    };
    assert_eq!(create.name.as_deref(), Some("add_users"));
    assert_eq!(create.interval, Some(100));
    assert_eq!(create.zero_prefix_length, Some(4));
}

#[test]
fn test_parse_history_output_format() {
    let cli = Cli::try_parse_from(["ratchet", "migrate", "history", "--output", "json"]).unwrap();
    let Commands::Migrate(migrate) = &cli.command;
    let MigrateCommands::History(history) = &migrate.command else {
        panic!("expected history subcommand");
    };
    assert_eq!(history.output, OutputFormat::Json);

    let cli = Cli::try_parse_from(["ratchet", "migrate", "history"]).unwrap();
    let Commands::Migrate(migrate) = &cli.command;
    let MigrateCommands::History(history) = &migrate.command else {
        panic!("expected history subcommand");
    };
    assert_eq!(history.output, OutputFormat::Text);
}

#[test]
fn test_global_args_apply_anywhere() {
    let cli = Cli::try_parse_from([
        "ratchet",
        "migrate",
        "up",
        "--verbose",
        "--project-dir",
        "/srv/app",
        "--directory",
        "/srv/app/db/migrations",
    ])
    .unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.project_dir.to_str(), Some("/srv/app"));
    assert_eq!(
        cli.global.directory.as_deref().and_then(|p| p.to_str()),
        Some("/srv/app/db/migrations")
    );
}

#[test]
fn test_unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["ratchet", "migrate", "down"]).is_err());
}
