//! Convenient imports for common functionality.

pub use crate::connection::{AsyncStoreConnection, StoreConnection};
pub use crate::dialect::{DialectCapabilities, IgnoreSyntax, LengthUnit, PlaceholderStyle, capabilities_for};
pub use crate::error::InsertError;
pub use crate::executor::ExecutionResult;
pub use crate::model::{ColumnDef, ColumnDefault, ColumnType, Condition, RawKey, RowId, SqlValue, Table};
pub use crate::statement::{AssignmentSet, AssignmentSetBuilder, ConflictPolicy};
pub use crate::transaction::{AsyncTransaction, Transaction, TxState, run, run_async};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteAsyncConnection, SqliteConnection};

#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresConnection;
