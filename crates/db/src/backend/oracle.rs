//! Oracle implementation of DbHelper
//!
//! The oracle driver is blocking, so every call runs on tokio's blocking
//! pool with the connection shared through an `Arc`.

use std::sync::Arc;

use async_trait::async_trait;
use oracle::sql_type::{OracleType, ToSql};
use oracle::{Connection, SqlValue};
use tracing::{debug, instrument};

use crate::config::{DbConfig, DbType};
use crate::error::{DbError, Result};
use crate::helper::{DbHelper, TxState};
use crate::value::{DbValue, QueryResult};

/// Oracle implementation of DbHelper
///
/// `dbname` in the configuration is the service name; the connect string is
/// built as `//host:port/service`.
pub struct OracleHelper {
    config: DbConfig,
    conn: Option<Arc<Connection>>,
    tx: TxState,
}

impl OracleHelper {
    /// Create an unopened helper
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            conn: None,
            tx: TxState::default(),
        }
    }

    fn connect_string(&self) -> Result<String> {
        let host = self
            .config
            .host
            .as_deref()
            .ok_or_else(|| self.config.missing("host"))?;
        let port = self.config.port_or_default().unwrap_or(1521);
        Ok(format!("//{}:{}/{}", host, port, self.config.dbname))
    }

    fn conn(&self) -> Result<Arc<Connection>> {
        self.conn.clone().ok_or(DbError::NotOpen)
    }
}

/// Run a blocking driver call off the async runtime
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DbError::Driver(e.to_string()))?
}

#[async_trait]
impl DbHelper for OracleHelper {
    fn db_type(&self) -> DbType {
        DbType::Oracle
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    #[instrument(skip(self), fields(host = ?self.config.host, service = %self.config.dbname))]
    async fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Err(DbError::AlreadyOpen);
        }

        let connect_string = self.connect_string()?;
        let user = self
            .config
            .user
            .clone()
            .ok_or_else(|| self.config.missing("user"))?;
        let password = self.config.password.clone().unwrap_or_default();

        let conn = blocking(move || Ok(Connection::connect(user, password, connect_string)?))
            .await?;
        self.conn = Some(Arc::new(conn));
        self.tx = TxState::default();

        debug!("opened oracle connection");
        Ok(())
    }

    #[instrument(skip(self, params))]
    async fn execute(&mut self, sql: &str, params: &[DbValue]) -> Result<u64> {
        let conn = self.conn()?;
        let sql = sql.to_string();
        let params = params.to_vec();

        // Oracle opens transactions implicitly; only the bookkeeping is needed
        if self.tx.needs_begin(&sql) {
            self.tx.begun();
        }
        self.tx.observe(&sql);

        let rows_affected = blocking(move || {
            let bound = to_sql_params(&params);
            let refs: Vec<&dyn ToSql> = bound.iter().map(|p| p.as_ref()).collect();
            let statement = conn.execute(&sql, &refs)?;
            Ok(statement.row_count()?)
        })
        .await?;

        debug!(rows_affected, "executed statement");
        Ok(rows_affected)
    }

    #[instrument(skip(self, params))]
    async fn query(&mut self, sql: &str, params: &[DbValue]) -> Result<QueryResult> {
        let conn = self.conn()?;
        let sql = sql.to_string();
        let params = params.to_vec();

        let result = blocking(move || {
            let bound = to_sql_params(&params);
            let refs: Vec<&dyn ToSql> = bound.iter().map(|p| p.as_ref()).collect();
            let result_set = conn.query(&sql, &refs)?;

            let columns: Vec<String> = result_set
                .column_info()
                .iter()
                .map(|c| c.name().to_string())
                .collect();

            let mut rows = Vec::new();
            for row in result_set {
                let row = row?;
                let values = row
                    .sql_values()
                    .iter()
                    .zip(&columns)
                    .map(|(value, column)| decode_value(value, column))
                    .collect::<Result<Vec<_>>>()?;
                rows.push(values);
            }
            Ok(QueryResult { columns, rows })
        })
        .await?;

        debug!(rows = result.rows.len(), "fetched rows");
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn commit(&mut self) -> Result<()> {
        let conn = self.conn()?;
        if self.tx.finish() {
            blocking(move || Ok(conn.commit()?)).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn rollback(&mut self) -> Result<()> {
        let conn = self.conn()?;
        if self.tx.finish() {
            blocking(move || Ok(conn.rollback()?)).await?;
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
            blocking(move || Ok(conn.close()?)).await?;
        }

        debug!("closed oracle connection");
        Ok(())
    }
}

fn to_sql_params(params: &[DbValue]) -> Vec<Box<dyn ToSql>> {
    params
        .iter()
        .map(|param| -> Box<dyn ToSql> {
            match param {
                DbValue::Null => Box::new(None::<String>),
                DbValue::Bool(v) => Box::new(*v),
                DbValue::Integer(v) => Box::new(*v),
                DbValue::Real(v) => Box::new(*v),
                DbValue::Text(v) => Box::new(v.clone()),
                DbValue::Blob(v) => Box::new(v.clone()),
            }
        })
        .collect()
}

fn decode_value(value: &SqlValue, column: &str) -> Result<DbValue> {
    if value.is_null()? {
        return Ok(DbValue::Null);
    }

    let decoded = match value.oracle_type()? {
        OracleType::Int64 | OracleType::UInt64 => DbValue::Integer(value.get::<i64>()?),
        OracleType::Number(_, scale) if *scale <= 0 => match value.get::<i64>() {
            Ok(v) => DbValue::Integer(v),
            Err(_) => DbValue::Real(value.get::<f64>()?),
        },
        OracleType::Number(_, _)
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble => DbValue::Real(value.get::<f64>()?),
        OracleType::Boolean => DbValue::Bool(value.get::<bool>()?),
        OracleType::Raw(_) | OracleType::LongRaw | OracleType::BLOB => {
            DbValue::Blob(value.get::<Vec<u8>>()?)
        }
        OracleType::Varchar2(_)
        | OracleType::NVarchar2(_)
        | OracleType::Char(_)
        | OracleType::NChar(_)
        | OracleType::Long
        | OracleType::CLOB
        | OracleType::NCLOB
        | OracleType::Date
        | OracleType::Timestamp(_)
        | OracleType::TimestampTZ(_)
        | OracleType::TimestampLTZ(_) => DbValue::Text(value.get::<String>()?),
        other => {
            return Err(DbError::UnsupportedType {
                column: column.to_string(),
                type_name: other.to_string(),
            })
        }
    };
    Ok(decoded)
}
