//! The migrate command group: create, up, version, history, repair and
//! setup-lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use ratchet_core::{create_migration_file, SequenceOptions};
use ratchet_db::{Database, MemoryBackend};
use ratchet_engine::{MigrateOptions, Migrator};

use crate::cli::{
    CreateArgs, GlobalArgs, HistoryArgs, MigrateArgs, MigrateCommands, OutputFormat, UpArgs,
};
use crate::config::{Config, DbBackend};

pub async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let config = Config::load_from_dir(&global.project_dir)?;
    let dir = migrations_dir(global, &config);

    match &args.command {
        MigrateCommands::Create(create) => run_create(create, &config, &dir),
        MigrateCommands::Up(up) => run_up(up, &config, &dir).await,
        MigrateCommands::Version => run_version(&config).await,
        MigrateCommands::History(history) => run_history(history, &config).await,
        MigrateCommands::Repair => run_repair(&config).await,
        MigrateCommands::SetupLock => run_setup_lock(&config).await,
    }
}

fn migrations_dir(global: &GlobalArgs, config: &Config) -> PathBuf {
    global
        .directory
        .clone()
        .unwrap_or_else(|| config.migrations_dir(&global.project_dir))
}

fn connect(config: &Config) -> Arc<dyn Database> {
    match config.database.backend {
        DbBackend::Memory => Arc::new(MemoryBackend::new()),
    }
}

fn migrate_options(config: &Config) -> MigrateOptions {
    MigrateOptions {
        version_table: config.version_table.clone(),
        lock_table: config.lock_table.clone(),
        partitioned_concurrency: config.partitioned_concurrency,
        ..Default::default()
    }
}

fn run_create(args: &CreateArgs, config: &Config, dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let options = SequenceOptions {
        interval: args.interval.unwrap_or(config.sequence.interval),
        zero_prefix_length: args
            .zero_prefix_length
            .unwrap_or(config.sequence.zero_prefix_length),
    };
    let path = create_migration_file(dir, args.name.as_deref().unwrap_or(""), options)?;
    println!("{}", path.display());
    Ok(())
}

async fn run_up(args: &UpArgs, config: &Config, dir: &Path) -> Result<()> {
    let migrator = Migrator::new(connect(config));
    let options = MigrateOptions {
        limit: args.limit.unwrap_or(-1),
        skip_versions: args.skip_versions.clone(),
        detect_partitioned_dml: args.detect_partitioned_dml,
        partitioned_concurrency: args.concurrency.unwrap_or(config.partitioned_concurrency),
        print_rows_affected: args.print_rows_affected,
        ..migrate_options(config)
    };
    migrator.up(dir, &options).await?;
    Ok(())
}

async fn run_version(config: &Config) -> Result<()> {
    let migrator = Migrator::new(connect(config));
    let (version, dirty) = migrator.version(&migrate_options(config)).await?;
    if dirty {
        println!("{} (dirty)", version);
    } else {
        println!("{}", version);
    }
    Ok(())
}

async fn run_history(args: &HistoryArgs, config: &Config) -> Result<()> {
    let migrator = Migrator::new(connect(config));
    let history = migrator.history(&migrate_options(config)).await?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&history)?),
        OutputFormat::Text => {
            println!("Version\tDirty\tCreated\tModified");
            for record in &history {
                println!(
                    "{}\t{}\t{}\t{}",
                    record.version,
                    record.dirty,
                    record.created.to_rfc3339(),
                    record.modified.to_rfc3339()
                );
            }
        }
    }
    Ok(())
}

async fn run_repair(config: &Config) -> Result<()> {
    let migrator = Migrator::new(connect(config));
    migrator.repair(&migrate_options(config)).await?;
    Ok(())
}

async fn run_setup_lock(config: &Config) -> Result<()> {
    let migrator = Migrator::new(connect(config));
    migrator.setup_lock(&migrate_options(config)).await?;
    Ok(())
}
