//! Rollback-on-any-error, terminal-state enforcement, and abandoned-context
//! cleanup under the blocking discipline.

#![cfg(feature = "sqlite")]

use typed_insert::prelude::*;

fn users_table() -> Table {
    Table::new(
        "users",
        vec![
            ColumnDef::new("id", ColumnType::Integer).auto_increment(),
            ColumnDef::new("name", ColumnType::Text).max_length(10).unique(),
        ],
    )
    .with_id_column("id")
}

const DDL: &str = "CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name VARCHAR(10) NOT NULL UNIQUE
);";

fn count_users(path: &std::path::Path) -> Result<i64, Box<dyn std::error::Error>> {
    let conn = SqliteConnection::open(path)?;
    let n = conn
        .raw()
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(n)
}

#[test]
fn failure_after_several_inserts_discards_all_of_them() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("test.db");
    let users = users_table();

    let conn = SqliteConnection::open(&path)?;
    conn.execute_batch(DDL)?;

    let err = typed_insert::run(conn, |tx| {
        for name in ["a", "b", "c"] {
            tx.insert(&users, |row| {
                row.set("name", name);
            })?;
        }
        // Duplicate of an uncommitted row from this same transaction.
        tx.insert(&users, |row| {
            row.set("name", "b");
        })
    })
    .unwrap_err();
    assert!(matches!(err, InsertError::ConstraintViolation(_)), "got {err:?}");
    assert_eq!(count_users(&path)?, 0, "every prior insert is discarded");
    Ok(())
}

#[test]
fn terminal_context_rejects_further_work() -> Result<(), Box<dyn std::error::Error>> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(DDL)?;
    let users = users_table();

    let mut tx = Transaction::begin(conn)?;
    tx.insert(&users, |row| {
        row.set("name", "a");
    })?;
    tx.commit()?;
    assert_eq!(tx.state(), TxState::Committed);

    let err = tx
        .insert(&users, |row| {
            row.set("name", "b");
        })
        .unwrap_err();
    assert!(matches!(err, InsertError::ContextClosed));
    assert!(matches!(tx.commit().unwrap_err(), InsertError::ContextClosed));
    assert!(matches!(tx.rollback().unwrap_err(), InsertError::ContextClosed));
    Ok(())
}

#[test]
fn explicit_rollback_discards_and_terminates() -> Result<(), Box<dyn std::error::Error>> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(DDL)?;
    let users = users_table();

    let mut tx = Transaction::begin(conn)?;
    tx.insert(&users, |row| {
        row.set("name", "a");
    })?;
    tx.rollback()?;
    assert_eq!(tx.state(), TxState::RolledBack);

    let conn = tx.into_inner().expect("connection returned after rollback");
    let n: i64 = conn
        .raw()
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    assert_eq!(n, 0);
    Ok(())
}

#[test]
fn dropping_an_open_context_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("test.db");
    let users = users_table();

    let conn = SqliteConnection::open(&path)?;
    conn.execute_batch(DDL)?;

    let mut tx = Transaction::begin(conn)?;
    tx.insert(&users, |row| {
        row.set("name", "orphan");
    })?;
    drop(tx);

    assert_eq!(count_users(&path)?, 0, "abandoned work never persists");
    Ok(())
}
