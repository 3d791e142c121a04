//! Typed INSERT building, execution, and transaction rollback core.
//!
//! The crate builds INSERT statements (including ignore-on-conflict variants
//! and batched multi-row inserts), executes them against heterogeneous
//! SQL-speaking stores through a pair of connection traits, resolves
//! generated row identifiers, and guarantees that any failure inside a
//! logical transaction discards every statement executed so far — under both
//! a blocking and a suspendable (async) execution discipline.
//!
//! ```no_run
//! use typed_insert::prelude::*;
//!
//! fn demo() -> Result<(), InsertError> {
//!     let users = Table::new(
//!         "users",
//!         vec![
//!             ColumnDef::new("id", ColumnType::Integer).auto_increment(),
//!             ColumnDef::new("name", ColumnType::Text).max_length(64).unique(),
//!         ],
//!     );
//!     let conn = SqliteConnection::open_in_memory()?;
//!     let (id, _conn) = typed_insert::run(conn, |tx| {
//!         tx.insert_and_get_id(&users, |row| {
//!             row.set("name", "alice");
//!         })
//!     })?;
//!     println!("inserted row {id:?}");
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod dialect;
mod error;
pub mod executor;
pub mod keys;
pub mod model;
pub mod statement;
pub mod transaction;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "test-utils-postgres")]
pub mod test_utils;

pub mod prelude;

pub use error::InsertError;
pub use executor::ExecutionResult;
pub use model::{
    ColumnDef, ColumnDefault, ColumnType, Condition, RawKey, RowId, SqlValue, Table,
};
pub use statement::{AssignmentSet, AssignmentSetBuilder, ConflictPolicy, InsertStatement};
pub use transaction::{
    AsyncTransaction, StatementLog, StatementRecord, Transaction, TxFuture, TxState, run,
    run_async,
};
