//! PostgreSQL implementation of DbHelper

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, Postgres};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, Statement, TypeInfo, ValueRef};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::{DbConfig, DbType};
use crate::error::{DbError, Result};
use crate::helper::{DbHelper, TxState};
use crate::value::{DbValue, QueryResult};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, <Postgres as sqlx::Database>::Arguments<'q>>;

/// PostgreSQL implementation of DbHelper
///
/// Holds a single connection; there is no pooling.
///
/// # Example
///
/// ```ignore
/// use slim_db::{DbConfig, DbHelper, PostgresHelper};
///
/// let config = DbConfig::postgres("localhost", 5432, "foobar", "foobar", "foobar");
/// let mut db = PostgresHelper::new(config);
/// db.open().await?;
/// db.execute("INSERT INTO foo VALUES ($1, $2)", &[1.into(), "a".into()]).await?;
/// db.commit().await?;
/// db.close().await?;
/// ```
pub struct PostgresHelper {
    config: DbConfig,
    conn: Option<PgConnection>,
    tx: TxState,
}

impl PostgresHelper {
    /// Create an unopened helper
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            conn: None,
            tx: TxState::default(),
        }
    }

    fn connect_options(&self) -> Result<PgConnectOptions> {
        let host = self
            .config
            .host
            .as_deref()
            .ok_or_else(|| self.config.missing("host"))?;
        let user = self
            .config
            .user
            .as_deref()
            .ok_or_else(|| self.config.missing("user"))?;

        let mut options = PgConnectOptions::new()
            .host(host)
            .database(&self.config.dbname)
            .username(user);
        if let Some(port) = self.config.port_or_default() {
            options = options.port(port);
        }
        if let Some(password) = &self.config.password {
            options = options.password(password);
        }
        Ok(options)
    }
}

#[async_trait]
impl DbHelper for PostgresHelper {
    fn db_type(&self) -> DbType {
        DbType::Postgresql
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    #[instrument(skip(self), fields(host = ?self.config.host, dbname = %self.config.dbname))]
    async fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Err(DbError::AlreadyOpen);
        }

        let conn = self.connect_options()?.connect().await?;
        self.conn = Some(conn);
        self.tx = TxState::default();

        debug!("opened postgres connection");
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

        debug!("closed postgres connection");
        Ok(())
    }
}

// NULL is sent as a text parameter, so it only binds where PostgreSQL accepts text
fn bind_params<'q>(mut query: PgQuery<'q>, params: &'q [DbValue]) -> PgQuery<'q> {
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

fn decode_row(row: &PgRow) -> Result<Vec<DbValue>> {
    (0..row.len()).map(|i| decode_value(row, i)).collect()
}

fn decode_value(row: &PgRow, index: usize) -> Result<DbValue> {
    let type_name = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(DbValue::Null);
        }
        raw.type_info().name().to_string()
    };

    let value = match type_name.as_str() {
        "BOOL" => DbValue::Bool(row.try_get::<bool, _>(index)?),
        "INT2" => DbValue::Integer(row.try_get::<i16, _>(index)? as i64),
        "INT4" => DbValue::Integer(row.try_get::<i32, _>(index)? as i64),
        "INT8" => DbValue::Integer(row.try_get::<i64, _>(index)?),
        "FLOAT4" => DbValue::Real(row.try_get::<f32, _>(index)? as f64),
        "FLOAT8" => DbValue::Real(row.try_get::<f64, _>(index)?),
        // Text keeps every digit; avg() and sum() over BIGINT return NUMERIC
        "NUMERIC" => DbValue::Text(row.try_get::<Decimal, _>(index)?.to_string()),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => {
            DbValue::Text(row.try_get_unchecked::<String, _>(index)?)
        }
        "BYTEA" => DbValue::Blob(row.try_get::<Vec<u8>, _>(index)?),
        "UUID" => DbValue::Text(row.try_get::<Uuid, _>(index)?.to_string()),
        "JSON" | "JSONB" => {
            DbValue::Text(row.try_get::<serde_json::Value, _>(index)?.to_string())
        }
        "DATE" => DbValue::Text(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIMESTAMP" => DbValue::Text(row.try_get::<NaiveDateTime, _>(index)?.to_string()),
        "TIMESTAMPTZ" => {
            DbValue::Text(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339())
        }
        other => {
            return Err(DbError::UnsupportedType {
                column: row.columns()[index].name().to_string(),
                type_name: other.to_string(),
            })
        }
    };
    Ok(value)
}
