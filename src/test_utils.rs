//! Embedded `PostgreSQL` provisioning for integration tests.
//!
//! Gated behind the `test-utils-postgres` feature so ordinary builds never
//! pull in the bundled server binaries.

use postgresql_embedded::PostgreSQL;

/// A running embedded `PostgreSQL` instance plus the connection parameters
/// for reaching it.
pub struct EmbeddedPostgres {
    postgresql: PostgreSQL,
    params: String,
}

impl EmbeddedPostgres {
    /// Set up and start an embedded server, creating `dbname` on it.
    ///
    /// # Errors
    /// Returns an error if the bundled binaries cannot be set up, the server
    /// fails to start, or the database cannot be created.
    pub async fn start(dbname: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut postgresql = PostgreSQL::default();
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(dbname).await?;

        let settings = postgresql.settings();
        let params = format!(
            "host={} port={} user={} password={} dbname={dbname}",
            settings.host, settings.port, settings.username, settings.password,
        );
        Ok(Self { postgresql, params })
    }

    /// tokio-postgres connection parameter string for the created database.
    #[must_use]
    pub fn params(&self) -> &str {
        &self.params
    }

    /// Stop the server. Failures are swallowed; the instance's data directory
    /// is temporary either way.
    pub async fn stop(self) {
        let _ = self.postgresql.stop().await;
    }
}
