//! Partitioned DML executor
//!
//! Fans statements out across a bounded worker pool. In convergent mode each
//! statement is re-submitted until a call reports zero affected rows, which
//! makes idempotent fixed-point migrations cheap to express. The aggregate
//! row count survives a failure so the caller can report partial progress.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use ratchet_db::{Database, DbError, DbResult};

/// Run `statements` as partitioned DML with up to `concurrency` workers.
///
/// Returns the summed affected-row count and the first error, if any. With
/// `concurrency == 1` statements run in input order; above that, ordering
/// across statements is unspecified, but one statement's fixed-point
/// resubmissions always stay on its own worker. The first failing worker
/// cancels the remaining work: queued statements never start, and a
/// convergent statement already in flight stops resubmitting after its next
/// completed call.
pub async fn apply_partitioned(
    db: Arc<dyn Database>,
    statements: Vec<String>,
    concurrency: usize,
    fixed_point: bool,
) -> (i64, Option<DbError>) {
    let concurrency = concurrency.max(1);
    let rows_affected = Arc::new(AtomicI64::new(0));
    let stopped = Arc::new(AtomicBool::new(false));

    if concurrency == 1 {
        for statement in &statements {
            if let Err(e) =
                apply_statement(db.as_ref(), statement, fixed_point, &rows_affected, &stopped)
                    .await
            {
                return (rows_affected.load(Ordering::SeqCst), Some(e));
            }
        }
        return (rows_affected.load(Ordering::SeqCst), None);
    }

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut set = JoinSet::new();

    for statement in statements {
        let db = Arc::clone(&db);
        let semaphore = Arc::clone(&semaphore);
        let stopped = Arc::clone(&stopped);
        let rows_affected = Arc::clone(&rows_affected);
        set.spawn(async move {
            // Semaphore closed counts as cancellation.
            let Ok(_permit) = semaphore.acquire().await else {
                return Ok(());
            };
            let result =
                apply_statement(db.as_ref(), &statement, fixed_point, &rows_affected, &stopped)
                    .await;
            if result.is_err() {
                stopped.store(true, Ordering::SeqCst);
            }
            result
        });
    }

    let mut first_error = None;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(e) => log::warn!("partitioned worker join error: {}", e),
        }
    }

    (rows_affected.load(Ordering::SeqCst), first_error)
}

/// Apply one statement, iterating to a zero-rows fixed point when asked.
/// Every successful call's row count is added to the shared aggregate before
/// the next call goes out. Once the shared stop flag is raised the loop ends
/// without submitting again, so a failure elsewhere also cancels a
/// convergence that is already under way.
async fn apply_statement(
    db: &dyn Database,
    statement: &str,
    fixed_point: bool,
    rows_affected: &AtomicI64,
    stopped: &AtomicBool,
) -> DbResult<()> {
    loop {
        if stopped.load(Ordering::SeqCst) {
            return Ok(());
        }
        let affected = db.partitioned_update(statement).await?;
        rows_affected.fetch_add(affected, Ordering::SeqCst);
        if !fixed_point || affected == 0 {
            return Ok(());
        }
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
