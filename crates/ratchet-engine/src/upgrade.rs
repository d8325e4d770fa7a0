//! Upgrade reconciliation
//!
//! When the engine finds a version-only predecessor (version table, no
//! history), the history table must be backfilled before the normal apply
//! loop can trust it: every migration at or below the recorded version gets
//! a history row, carrying the version row's dirty flag for the current
//! version itself. The upgrade indicator table is dropped once the apply
//! loop that follows the backfill completes.

use ratchet_core::Migration;
use ratchet_db::Database;

use crate::error::EngineResult;
use crate::tracking::{self, UPGRADE_INDICATOR_TABLE};

/// Insert history rows for every already-applied migration.
pub(crate) async fn backfill(
    db: &dyn Database,
    migrations: &[Migration],
    version_table: &str,
) -> EngineResult<()> {
    let Some((current, dirty)) = tracking::get_version(db, version_table).await? else {
        // Nothing was ever applied; there is no history to reconstruct.
        return Ok(());
    };

    let history_table = tracking::history_table_name(version_table);
    let versions: Vec<u64> = migrations.iter().map(|m| m.version).collect();
    db.read_write_txn(Box::new(move |txn| {
        Box::pin(async move {
            for version in versions {
                let version = version as i64;
                if version < current {
                    tracking::upsert_version_history(txn, version, false, &history_table).await?;
                } else if version == current {
                    tracking::upsert_version_history(txn, version, dirty, &history_table).await?;
                }
                // Versions above the recorded one were never applied.
            }
            Ok(())
        })
    }))
    .await?;

    Ok(())
}

/// Drop the upgrade indicator, transitioning the database to the
/// history-tracked state for good.
pub(crate) async fn mark_complete(db: &dyn Database) -> EngineResult<()> {
    db.apply_ddl(&[format!("DROP TABLE {UPGRADE_INDICATOR_TABLE}")])
        .await?;
    Ok(())
}
