//! Batched inserts: lazy sub-batching at the dialect's cap, per-item results
//! in input order, and zero statements for an empty source.

#![cfg(feature = "sqlite")]

use typed_insert::dialect::{SQLITE, capabilities_for};
use typed_insert::prelude::*;

fn events_table() -> Table {
    Table::new(
        "events",
        vec![
            ColumnDef::new("id", ColumnType::Integer).auto_increment(),
            ColumnDef::new("seq", ColumnType::Integer),
            ColumnDef::new("note", ColumnType::Text).nullable(),
        ],
    )
    .with_id_column("id")
}

const DDL: &str = "CREATE TABLE events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seq INTEGER NOT NULL,
    note TEXT
);";

#[test]
fn empty_source_issues_no_statements() -> Result<(), Box<dyn std::error::Error>> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(DDL)?;
    let events = events_table();

    let mut tx = Transaction::begin(conn)?;
    let results = tx.batch_insert(&events, Vec::<i64>::new(), |row, seq| {
        row.set("seq", seq);
    })?;
    assert!(results.is_empty());
    assert!(tx.log().is_empty(), "an empty source must not reach the store");
    tx.commit()?;
    Ok(())
}

#[test]
fn large_batch_splits_at_the_dialect_cap() -> Result<(), Box<dyn std::error::Error>> {
    let cap = capabilities_for(SQLITE)?.max_batch_size;
    let total = cap * 2 + 200;

    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(DDL)?;
    let events = events_table();

    let mut tx = Transaction::begin(conn)?;
    let results = tx.batch_insert(&events, 0..total as i64, |row, seq| {
        row.set("seq", seq);
    })?;
    assert_eq!(results.len(), total);
    assert!(results.iter().all(|r| r.rows_affected == 1));
    // Uniform signature: one statement per sub-batch.
    assert_eq!(tx.log().len(), 3);
    tx.commit()?;

    let conn = tx.into_inner().expect("connection returned after commit");
    let stored: Vec<i64> = conn
        .raw()
        .prepare("SELECT seq FROM events ORDER BY id")?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;
    let expected: Vec<i64> = (0..total as i64).collect();
    assert_eq!(stored, expected, "input order is preserved across sub-batches");
    Ok(())
}

#[test]
fn mixed_shapes_split_into_signature_runs() -> Result<(), Box<dyn std::error::Error>> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(DDL)?;
    let events = events_table();

    let items = vec![(0_i64, Some("a")), (1, Some("b")), (2, None), (3, Some("c"))];
    let mut tx = Transaction::begin(conn)?;
    let results = tx.batch_insert(&events, items, |row, (seq, note)| {
        row.set("seq", seq);
        if let Some(note) = note {
            row.set("note", note);
        }
    })?;
    assert_eq!(results.len(), 4);
    // Shapes [seq,note] [seq,note] [seq] [seq,note] form three runs.
    assert_eq!(tx.log().len(), 3);
    tx.commit()?;

    let conn = tx.into_inner().expect("connection returned after commit");
    let stored: Vec<(i64, Option<String>)> = conn
        .raw()
        .prepare("SELECT seq, note FROM events ORDER BY id")?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;
    assert_eq!(
        stored,
        vec![
            (0, Some("a".into())),
            (1, Some("b".into())),
            (2, None),
            (3, Some("c".into())),
        ]
    );
    Ok(())
}

#[test]
fn invalid_item_fails_the_whole_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(DDL)?;
    let events = events_table();

    let err = typed_insert::run(conn, |tx| {
        tx.batch_insert(&events, [Some(1_i64), None], |row, seq| {
            if let Some(seq) = seq {
                row.set("seq", seq);
            }
        })
    })
    .unwrap_err();
    assert!(matches!(err, InsertError::Validation(_)), "got {err:?}");
    Ok(())
}
