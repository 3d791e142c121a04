//! Ignore-policy inserts: a conflicting row is absorbed as a zero-effect
//! result, and a skipped row never resolves to an identifier.

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

#[test]
fn conflicting_insert_ignore_is_absorbed() -> Result<(), Box<dyn std::error::Error>> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(DDL)?;
    let users = users_table();

    let mut tx = Transaction::begin(conn)?;

    let first = tx.insert_ignore(&users, |row| {
        row.set("id", 1).set("name", "1");
    })?;
    assert_eq!(first.rows_affected, 1);

    // Same primary key, different payload: skipped, not an error.
    let second = tx.insert_ignore(&users, |row| {
        row.set("id", 1).set("name", "2");
    })?;
    assert_eq!(second.rows_affected, 0);

    tx.commit()?;
    let conn = tx.into_inner().expect("connection returned after commit");
    let stored: String =
        conn.raw()
            .query_row("SELECT name FROM users WHERE id = 1", [], |row| row.get(0))?;
    assert_eq!(stored, "1", "the pre-existing row is left untouched");
    Ok(())
}

#[test]
fn skipped_row_resolves_to_no_identifier() -> Result<(), Box<dyn std::error::Error>> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(DDL)?;
    let users = users_table();

    let (ids, _conn) = typed_insert::run(conn, |tx| {
        let written = tx.insert_ignore_and_get_id(&users, |row| {
            row.set("id", 1).set("name", "1");
        })?;
        let skipped = tx.insert_ignore_and_get_id(&users, |row| {
            row.set("id", 1).set("name", "2");
        })?;
        Ok((written, skipped))
    })?;

    assert_eq!(ids.0, Some(RowId::new("users", RawKey::Int(1))));
    // A no-op insert must not echo the identity of the pre-existing row,
    // even though the caller supplied the same key.
    assert_eq!(ids.1, None);
    Ok(())
}

#[test]
fn ignore_with_generated_key_resolves_for_written_rows() -> Result<(), Box<dyn std::error::Error>> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(DDL)?;
    let users = users_table();

    let (ids, _conn) = typed_insert::run(conn, |tx| {
        let a = tx.insert_ignore_and_get_id(&users, |row| {
            row.set("name", "erin");
        })?;
        let b = tx.insert_ignore_and_get_id(&users, |row| {
            row.set("name", "erin");
        })?;
        Ok((a, b))
    })?;

    assert!(ids.0.is_some(), "first write resolves a store-assigned key");
    assert_eq!(ids.1, None, "the duplicate is skipped without a key");
    Ok(())
}
