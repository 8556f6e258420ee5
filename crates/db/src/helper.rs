//! The DbHelper trait and connection entry points

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{instrument, warn};

use crate::backend::{PostgresHelper, SqliteHelper};
use crate::config::{DbConfig, DbType};
use crate::error::{DbError, Result};
use crate::value::{DbValue, QueryResult};

/// A connection to one database
///
/// Data-modifying statements (`INSERT`, `UPDATE`, `DELETE`, `REPLACE`,
/// `MERGE`) run inside an implicit transaction: the first one after `open` or
/// after a `commit`/`rollback` starts it, and it stays open until the next
/// `commit`, `rollback` or `close`. `close` commits. Other statements
/// (DDL, `VACUUM`, `PRAGMA`, explicit `BEGIN`) outside an open transaction
/// run in autocommit mode.
///
/// SQL text is passed to the driver untouched, so placeholders follow the
/// backend's own syntax (`?` for SQLite, `$1` for PostgreSQL, `:1` for Oracle).
#[async_trait]
pub trait DbHelper: Send {
    /// Backend this helper talks to
    fn db_type(&self) -> DbType;

    /// Whether a connection is currently open
    fn is_open(&self) -> bool;

    /// Connect to the database
    ///
    /// Fails with [`DbError::AlreadyOpen`] if the helper is already connected.
    async fn open(&mut self) -> Result<()>;

    /// Run a statement and return the number of affected rows
    async fn execute(&mut self, sql: &str, params: &[DbValue]) -> Result<u64>;

    /// Run a query and fetch all rows along with the column names
    async fn query(&mut self, sql: &str, params: &[DbValue]) -> Result<QueryResult>;

    /// Commit the open transaction, if any
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction, if any
    async fn rollback(&mut self) -> Result<()>;

    /// Commit any open transaction and disconnect
    ///
    /// Closing a helper that is not open does nothing.
    async fn close(&mut self) -> Result<()>;
}

/// Create an unopened helper for the configured backend
pub fn connect(config: DbConfig) -> Result<Box<dyn DbHelper>> {
    config.validate()?;

    match config.db_type {
        DbType::Sqlite => Ok(Box::new(SqliteHelper::new(config))),
        DbType::Postgresql => Ok(Box::new(PostgresHelper::new(config))),
        #[cfg(feature = "oracle")]
        DbType::Oracle => Ok(Box::new(crate::backend::OracleHelper::new(config))),
        #[cfg(not(feature = "oracle"))]
        DbType::Oracle => Err(DbError::BackendUnavailable(DbType::Oracle)),
    }
}

/// Open a connection, run `f` with it, and always close it afterwards
///
/// The connection is closed (which commits) whether or not `f` succeeds.
/// An error from `f` takes precedence over an error from closing.
///
/// # Example
///
/// ```ignore
/// use slim_db::{with_connection, DbConfig, DbValue};
///
/// let rows = with_connection(&DbConfig::sqlite("app.db"), |db| {
///     Box::pin(async move {
///         db.execute("INSERT INTO foo VALUES (?, ?)", &[1.into(), "a".into()]).await?;
///         db.query("SELECT * FROM foo", &[]).await
///     })
/// })
/// .await?;
/// ```
#[instrument(skip(config, f), fields(db_type = %config.db_type))]
pub async fn with_connection<R, F>(config: &DbConfig, f: F) -> Result<R>
where
    F: for<'c> FnOnce(&'c mut dyn DbHelper) -> BoxFuture<'c, Result<R>>,
{
    let mut db = connect(config.clone())?;
    db.open().await?;

    let result = f(db.as_mut()).await;
    let closed = db.close().await;

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "Failed to close connection after error");
            }
            Err(e)
        }
    }
}

/// Tracks the implicit transaction shared by all backends
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TxState {
    open: bool,
}

impl TxState {
    /// Whether a BEGIN is needed before running `sql`
    pub(crate) fn needs_begin(&self, sql: &str) -> bool {
        !self.open && opens_transaction(sql)
    }

    pub(crate) fn begun(&mut self) {
        self.open = true;
    }

    /// Track transaction control statements the caller ran through `execute`
    ///
    /// `ROLLBACK TO <savepoint>` leaves the transaction open.
    pub(crate) fn observe(&mut self, sql: &str) {
        let mut words = keywords(sql);
        let first = words.next().unwrap_or_default().to_ascii_uppercase();
        match first.as_str() {
            "BEGIN" | "START" => self.open = true,
            "COMMIT" | "END" => self.open = false,
            "ROLLBACK" => {
                let to_savepoint = words
                    .next()
                    .is_some_and(|w| w.eq_ignore_ascii_case("TO"));
                if !to_savepoint {
                    self.open = false;
                }
            }
            _ => {}
        }
    }

    /// Mark the transaction finished, returning whether one was open
    pub(crate) fn finish(&mut self) -> bool {
        std::mem::take(&mut self.open)
    }
}

/// Whether `sql` is a data-modifying statement that starts the implicit transaction
pub(crate) fn opens_transaction(sql: &str) -> bool {
    let keyword = keywords(sql).next().unwrap_or_default();
    ["INSERT", "UPDATE", "DELETE", "REPLACE", "MERGE"]
        .iter()
        .any(|dml| keyword.eq_ignore_ascii_case(dml))
}

fn keywords(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_builds_unopened_helper() {
        let db = connect(DbConfig::sqlite(":memory:")).unwrap();
        assert_eq!(db.db_type(), DbType::Sqlite);
        assert!(!db.is_open());

        let db = connect(DbConfig::postgres("localhost", 5432, "foobar", "foobar", "foobar")).unwrap();
        assert_eq!(db.db_type(), DbType::Postgresql);
        assert!(!db.is_open());
    }

    #[test]
    fn test_connect_validates_config() {
        let config = DbConfig {
            db_type: DbType::Postgresql,
            ..DbConfig::sqlite("foobar")
        };
        assert!(matches!(
            connect(config),
            Err(DbError::MissingConfig { .. })
        ));
    }

    #[cfg(not(feature = "oracle"))]
    #[test]
    fn test_oracle_unavailable_without_feature() {
        let config = DbConfig::oracle("localhost", 1521, "XEPDB1", "scott", "tiger");
        assert!(matches!(
            connect(config),
            Err(DbError::BackendUnavailable(DbType::Oracle))
        ));
    }

    #[test]
    fn test_tx_state() {
        let mut tx = TxState::default();
        assert!(tx.needs_begin("INSERT INTO foo VALUES (1)"));
        tx.begun();
        assert!(!tx.needs_begin("INSERT INTO foo VALUES (2)"));
        assert!(tx.finish());
        assert!(!tx.finish());
        assert!(tx.needs_begin("delete from foo"));
    }

    #[test]
    fn test_only_dml_opens_transaction() {
        for sql in [
            "INSERT INTO foo VALUES (1)",
            "  update foo SET txt = 'a'",
            "\nDELETE FROM foo",
            "REPLACE INTO foo VALUES (1, 'a')",
            "MERGE INTO foo USING bar ON (1 = 1)",
        ] {
            assert!(opens_transaction(sql), "{sql}");
        }

        for sql in [
            "VACUUM",
            "PRAGMA journal_mode=WAL",
            "BEGIN",
            "CREATE TABLE foo (id INTEGER)",
            "CREATE INDEX CONCURRENTLY idx ON foo (id)",
            "ATTACH DATABASE 'other.db' AS other",
            "SELECT 1",
            "INSERTED",
            "",
        ] {
            assert!(!opens_transaction(sql), "{sql}");
        }

        let tx = TxState::default();
        assert!(!tx.needs_begin("VACUUM"));
    }

    #[test]
    fn test_observe_transaction_control() {
        let mut tx = TxState::default();
        tx.observe("BEGIN");
        assert!(!tx.needs_begin("INSERT INTO foo VALUES (1)"));

        tx.observe("ROLLBACK TO SAVEPOINT sp1");
        assert!(!tx.needs_begin("INSERT INTO foo VALUES (1)"));

        tx.observe("commit");
        assert!(tx.needs_begin("INSERT INTO foo VALUES (1)"));

        tx.observe("START TRANSACTION");
        tx.observe("ROLLBACK");
        assert!(!tx.finish());

        tx.observe("SELECT 1");
        assert!(!tx.finish());
    }
}
