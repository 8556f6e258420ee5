//! SQLite implementation of DbHelper

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, Statement, TypeInfo, ValueRef};
use tracing::{debug, instrument};

use crate::config::{DbConfig, DbType};
use crate::error::{DbError, Result};
use crate::helper::{DbHelper, TxState};
use crate::value::{DbValue, QueryResult};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, <Sqlite as sqlx::Database>::Arguments<'q>>;

/// SQLite implementation of DbHelper
///
/// # Example
///
/// ```ignore
/// use slim_db::{DbConfig, DbHelper, SqliteHelper};
///
/// let mut db = SqliteHelper::new(DbConfig::sqlite(":memory:"));
/// db.open().await?;
/// db.execute("CREATE TABLE foo (id INTEGER PRIMARY KEY, txt TEXT)", &[]).await?;
/// db.execute("INSERT INTO foo VALUES (?, ?)", &[1.into(), "a".into()]).await?;
/// let result = db.query("SELECT * FROM foo WHERE id = ?", &[1.into()]).await?;
/// db.close().await?;
/// ```
pub struct SqliteHelper {
    config: DbConfig,
    conn: Option<SqliteConnection>,
    tx: TxState,
}

impl SqliteHelper {
    /// Create an unopened helper
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            conn: None,
            tx: TxState::default(),
        }
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions> {
        if self.config.is_memory() {
            return Ok(SqliteConnectOptions::from_str("sqlite::memory:")?);
        }
        Ok(SqliteConnectOptions::new()
            .filename(&self.config.dbname)
            .create_if_missing(true))
    }
}

#[async_trait]
impl DbHelper for SqliteHelper {
    fn db_type(&self) -> DbType {
        DbType::Sqlite
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    #[instrument(skip(self), fields(dbname = %self.config.dbname))]
    async fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Err(DbError::AlreadyOpen);
        }

        let conn = self.connect_options()?.connect().await?;
        self.conn = Some(conn);
        self.tx = TxState::default();

        debug!("opened sqlite connection");
        Ok(())
    }

    #[instrument(skip(self, params))]
    async fn execute(&mut self, sql: &str, params: &[DbValue]) -> Result<u64> {
        let conn = self.conn.as_mut().ok_or(DbError::NotOpen)?;

        if self.tx.needs_begin(sql) {
            sqlx::query("BEGIN").execute(&mut *conn).await?;
            self.tx.begun();
        }

        let result = bind_params(sqlx::query(sql), params)
            .execute(&mut *conn)
            .await?;
        self.tx.observe(sql);

        debug!(rows_affected = result.rows_affected(), "executed statement");
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, params))]
    async fn query(&mut self, sql: &str, params: &[DbValue]) -> Result<QueryResult> {
        let conn = self.conn.as_mut().ok_or(DbError::NotOpen)?;

        let columns: Vec<String> = (&mut *conn)
            .prepare(sql)
            .await?
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&mut *conn)
            .await?
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>>>()?;

        debug!(rows = rows.len(), "fetched rows");
        Ok(QueryResult { columns, rows })
    }

    #[instrument(skip(self))]
    async fn commit(&mut self) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(DbError::NotOpen)?;
        if self.tx.finish() {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn rollback(&mut self) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(DbError::NotOpen)?;
        if self.tx.finish() {
            sqlx::query("ROLLBACK").execute(&mut *conn).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn close(&mut self) -> Result<()> {
        if self.conn.is_none() {
            return Ok(());
        }

        self.commit().await?;
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }

        debug!("closed sqlite connection");
        Ok(())
    }
}

fn bind_params<'q>(mut query: SqliteQuery<'q>, params: &'q [DbValue]) -> SqliteQuery<'q> {
    for param in params {
        query = match param {
            DbValue::Null => query.bind(None::<String>),
            DbValue::Bool(v) => query.bind(*v),
            DbValue::Integer(v) => query.bind(*v),
            DbValue::Real(v) => query.bind(*v),
            DbValue::Text(v) => query.bind(v.as_str()),
            DbValue::Blob(v) => query.bind(v.as_slice()),
        };
    }
    query
}

fn decode_row(row: &SqliteRow) -> Result<Vec<DbValue>> {
    (0..row.len()).map(|i| decode_value(row, i)).collect()
}

fn decode_value(row: &SqliteRow, index: usize) -> Result<DbValue> {
    let type_name = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(DbValue::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };

    // Values carry their storage class; declared column types can add BOOLEAN and dates
    let value = match type_name.as_str() {
        "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" => {
            DbValue::Integer(row.try_get_unchecked::<i64, _>(index)?)
        }
        "BOOLEAN" | "BOOL" => DbValue::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            DbValue::Real(row.try_get_unchecked::<f64, _>(index)?)
        }
        "BLOB" => DbValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        _ => DbValue::Text(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}
