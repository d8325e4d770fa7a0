use super::*;

fn version_table_ddl() -> Vec<String> {
    vec![
        "CREATE TABLE SchemaMigrations (Version INT64 NOT NULL, Dirty BOOL NOT NULL) PRIMARY KEY(Version)"
            .to_string(),
    ]
}

#[tokio::test]
async fn test_create_table_registers_catalog_entry() {
    let db = MemoryBackend::new();
    db.apply_ddl(&version_table_ddl()).await.unwrap();

    assert!(db.table_exists("SchemaMigrations").await.unwrap());
    assert!(!db.table_exists("Other").await.unwrap());
    assert_eq!(db.ddl_log().await.len(), 1);
}

#[tokio::test]
async fn test_create_existing_table_fails() {
    let db = MemoryBackend::new();
    db.apply_ddl(&version_table_ddl()).await.unwrap();
    let err = db.apply_ddl(&version_table_ddl()).await.unwrap_err();
    assert!(matches!(err, DbError::AlreadyExists { .. }));
}

#[tokio::test]
async fn test_drop_table() {
    let db = MemoryBackend::new();
    db.apply_ddl(&version_table_ddl()).await.unwrap();
    db.apply_ddl(&["DROP TABLE SchemaMigrations".to_string()])
        .await
        .unwrap();
    assert!(!db.table_exists("SchemaMigrations").await.unwrap());

    let err = db
        .apply_ddl(&["DROP TABLE SchemaMigrations".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::TableNotFound { .. }));
}

#[tokio::test]
async fn test_insert_and_read_back() {
    let db = MemoryBackend::new();
    db.apply_ddl(&version_table_ddl()).await.unwrap();

    db.read_write_txn(Box::new(|txn| {
        Box::pin(async move {
            txn.buffer_write(vec![Mutation::insert(
                "SchemaMigrations",
                Row::new()
                    .with("Version", Value::Int64(3))
                    .with("Dirty", Value::Bool(false)),
            )]);
            Ok(())
        })
    }))
    .await
    .unwrap();

    let rows = db.read_all("SchemaMigrations").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_i64("Version").unwrap(), 3);
    assert!(!rows[0].get_bool("Dirty").unwrap());
}

#[tokio::test]
async fn test_duplicate_insert_fails_and_rolls_back() {
    let db = MemoryBackend::new();
    db.apply_ddl(&version_table_ddl()).await.unwrap();

    let row = Row::new()
        .with("Version", Value::Int64(1))
        .with("Dirty", Value::Bool(false));
    db.read_write_txn(Box::new({
        let row = row.clone();
        move |txn| {
            Box::pin(async move {
                txn.buffer_write(vec![Mutation::insert("SchemaMigrations", row)]);
                Ok(())
            })
        }
    }))
    .await
    .unwrap();

    // Second transaction buffers a valid delete and an invalid insert; the
    // failure must discard both.
    let err = db
        .read_write_txn(Box::new({
            let row = row.clone();
            move |txn| {
                Box::pin(async move {
                    txn.buffer_write(vec![
                        Mutation::insert(
                            "SchemaMigrations",
                            Row::new()
                                .with("Version", Value::Int64(2))
                                .with("Dirty", Value::Bool(false)),
                        ),
                        Mutation::insert("SchemaMigrations", row),
                    ]);
                    Ok(())
                })
            }
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::AlreadyExists { .. }));

    let rows = db.read_all("SchemaMigrations").await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_update_merges_columns() {
    let db = MemoryBackend::new();
    db.apply_ddl(&version_table_ddl()).await.unwrap();

    db.read_write_txn(Box::new(|txn| {
        Box::pin(async move {
            txn.buffer_write(vec![Mutation::insert(
                "SchemaMigrations",
                Row::new()
                    .with("Version", Value::Int64(1))
                    .with("Dirty", Value::Bool(true)),
            )]);
            Ok(())
        })
    }))
    .await
    .unwrap();

    db.read_write_txn(Box::new(|txn| {
        Box::pin(async move {
            txn.buffer_write(vec![Mutation::update(
                "SchemaMigrations",
                Row::new()
                    .with("Version", Value::Int64(1))
                    .with("Dirty", Value::Bool(false)),
            )]);
            Ok(())
        })
    }))
    .await
    .unwrap();

    let rows = db.read_all("SchemaMigrations").await.unwrap();
    assert!(!rows[0].get_bool("Dirty").unwrap());
}

#[tokio::test]
async fn test_commit_timestamp_resolution() {
    let db = MemoryBackend::new();
    db.apply_ddl(&[
        "CREATE TABLE H (Version INT64 NOT NULL, Created TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true)) PRIMARY KEY(Version)"
            .to_string(),
    ])
    .await
    .unwrap();

    let before = chrono::Utc::now();
    db.read_write_txn(Box::new(|txn| {
        Box::pin(async move {
            txn.buffer_write(vec![Mutation::insert(
                "H",
                Row::new()
                    .with("Version", Value::Int64(1))
                    .with("Created", Value::CommitTimestamp),
            )]);
            Ok(())
        })
    }))
    .await
    .unwrap();
    let after = chrono::Utc::now();

    let rows = db.read_all("H").await.unwrap();
    let created = rows[0].get_timestamp("Created").unwrap();
    assert!(created >= before && created <= after);
}

#[tokio::test]
async fn test_reads_inside_txn_see_pre_transaction_state() {
    let db = MemoryBackend::new();
    db.apply_ddl(&version_table_ddl()).await.unwrap();

    db.read_write_txn(Box::new(|txn| {
        Box::pin(async move {
            txn.buffer_write(vec![Mutation::insert(
                "SchemaMigrations",
                Row::new()
                    .with("Version", Value::Int64(9))
                    .with("Dirty", Value::Bool(false)),
            )]);
            // Buffered writes are not visible to reads in the same txn.
            let row = txn
                .read_row("SchemaMigrations", &vec![Value::Int64(9)])
                .await?;
            assert!(row.is_none());
            Ok(())
        })
    }))
    .await
    .unwrap();
}

#[tokio::test]
async fn test_delete_all_and_keyed_delete() {
    let db = MemoryBackend::new();
    db.apply_ddl(&version_table_ddl()).await.unwrap();

    db.read_write_txn(Box::new(|txn| {
        Box::pin(async move {
            txn.buffer_write(
                (1..=3)
                    .map(|v| {
                        Mutation::insert(
                            "SchemaMigrations",
                            Row::new()
                                .with("Version", Value::Int64(v))
                                .with("Dirty", Value::Bool(false)),
                        )
                    })
                    .collect(),
            );
            Ok(())
        })
    }))
    .await
    .unwrap();

    db.read_write_txn(Box::new(|txn| {
        Box::pin(async move {
            txn.buffer_write(vec![Mutation::delete(
                "SchemaMigrations",
                KeySet::Keys(vec![vec![Value::Int64(2)]]),
            )]);
            Ok(())
        })
    }))
    .await
    .unwrap();
    assert_eq!(db.read_all("SchemaMigrations").await.unwrap().len(), 2);

    db.read_write_txn(Box::new(|txn| {
        Box::pin(async move {
            txn.buffer_write(vec![Mutation::delete_all("SchemaMigrations")]);
            Ok(())
        })
    }))
    .await
    .unwrap();
    assert!(db.read_all("SchemaMigrations").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dml_handlers_are_routed() {
    let db = MemoryBackend::new()
        .with_dml_handler(|_| Ok(7))
        .with_partitioned_handler(|statement| {
            if statement.contains("boom") {
                Err(DbError::ExecutionFailed {
                    statement: statement.to_string(),
                    message: "scripted".to_string(),
                })
            } else {
                Ok(11)
            }
        });

    db.read_write_txn(Box::new(|txn| {
        Box::pin(async move {
            assert_eq!(txn.update("UPDATE t SET x = 1").await?, 7);
            Ok(())
        })
    }))
    .await
    .unwrap();

    assert_eq!(db.partitioned_update("DELETE FROM t").await.unwrap(), 11);
    assert!(db.partitioned_update("DELETE boom").await.is_err());
    assert_eq!(db.dml_log().await.len(), 3);
}
