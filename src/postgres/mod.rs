//! Postgres adapter for the suspendable discipline, over tokio-postgres.
//! Generated keys come back in-statement via `RETURNING`.

use tokio_postgres::NoTls;

use crate::connection::AsyncStoreConnection;
use crate::dialect::POSTGRESQL;
use crate::error::InsertError;
use crate::executor::ExecutionResult;
use crate::model::SqlValue;

mod params;

pub use params::Params;

/// Map a tokio-postgres error into the insert taxonomy: SQLSTATE class 23
/// (integrity constraint violation) becomes `ConstraintViolation`, closed
/// connections become `Connectivity`, the rest passes through.
pub(crate) fn classify(err: tokio_postgres::Error) -> InsertError {
    if let Some(db) = err.as_db_error() {
        if db.code().code().starts_with("23") {
            return InsertError::ConstraintViolation(db.message().to_owned());
        }
    }
    if err.is_closed() {
        return InsertError::Connectivity(err.to_string());
    }
    InsertError::PostgresError(err)
}

/// Postgres connection driven through the suspendable discipline.
pub struct PostgresConnection {
    client: tokio_postgres::Client,
}

impl std::fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnection").finish_non_exhaustive()
    }
}

impl PostgresConnection {
    /// Wrap an already-connected client (the caller owns the connection
    /// driver task).
    #[must_use]
    pub fn new(client: tokio_postgres::Client) -> Self {
        Self { client }
    }

    /// Connect with the given parameter string, spawning the connection
    /// driver onto the current runtime.
    ///
    /// # Errors
    /// Returns `Connectivity` if the connection cannot be established.
    pub async fn connect(config: &str) -> Result<Self, InsertError> {
        let (client, connection) = tokio_postgres::connect(config, NoTls)
            .await
            .map_err(|e| InsertError::Connectivity(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "postgres connection driver terminated");
            }
        });
        Ok(Self { client })
    }

    /// Run a raw batch of statements, for DDL setup outside this core's
    /// scope.
    ///
    /// # Errors
    /// Returns the driver's error if any statement fails.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), InsertError> {
        self.client.batch_execute(sql).await.map_err(classify)
    }

    /// Borrow the underlying tokio-postgres client, e.g. for out-of-band
    /// verification in tests.
    #[must_use]
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }
}

#[async_trait::async_trait]
impl AsyncStoreConnection for PostgresConnection {
    fn dialect(&self) -> &'static str {
        POSTGRESQL
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, InsertError> {
        let converted = Params::convert(params)?;
        self.client
            .execute(sql, converted.as_refs())
            .await
            .map_err(classify)
    }

    async fn insert_returning(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<ExecutionResult, InsertError> {
        let converted = Params::convert(params)?;
        let rows = self
            .client
            .query(sql, converted.as_refs())
            .await
            .map_err(classify)?;
        let generated_key = rows.first().and_then(|row| {
            row.try_get::<_, i64>(0)
                .map(SqlValue::Int)
                .or_else(|_| row.try_get::<_, String>(0).map(SqlValue::Text))
                .ok()
        });
        Ok(ExecutionResult {
            rows_affected: rows.len() as u64,
            generated_key,
        })
    }

    async fn last_insert_id(&mut self) -> Result<Option<i64>, InsertError> {
        // Postgres reports generated keys via RETURNING; there is no
        // connection-scoped last-insert-id to fall back on.
        Ok(None)
    }

    async fn begin(&mut self) -> Result<(), InsertError> {
        self.client.batch_execute("BEGIN").await.map_err(classify)
    }

    async fn commit(&mut self) -> Result<(), InsertError> {
        self.client.batch_execute("COMMIT").await.map_err(classify)
    }

    async fn rollback(&mut self) -> Result<(), InsertError> {
        self.client.batch_execute("ROLLBACK").await.map_err(classify)
    }

    fn abort(&mut self) {
        // Nothing synchronous to do: dropping the client closes the session
        // and the server discards its open transaction.
    }
}
