//! Connection configuration

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Sqlite,
    #[serde(alias = "postgres")]
    Postgresql,
    Oracle,
}

impl DbType {
    /// Default server port, if the backend uses one
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Sqlite => None,
            Self::Postgresql => Some(5432),
            Self::Oracle => Some(1521),
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Postgresql => write!(f, "postgresql"),
            Self::Oracle => write!(f, "oracle"),
        }
    }
}

impl FromStr for DbType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgresql" | "postgres" => Ok(Self::Postgresql),
            "oracle" => Ok(Self::Oracle),
            other => Err(DbError::UnknownDbType(other.to_string())),
        }
    }
}

/// Connection settings for one database
///
/// SQLite only needs `dbname` (a file path or `:memory:`). Server backends
/// need `host`, `dbname` and `user`; `port` falls back to the backend default.
/// For Oracle, `dbname` is the service name.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub db_type: DbType,
    pub dbname: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

// Keep passwords out of logs
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("db_type", &self.db_type)
            .field("dbname", &self.dbname)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl DbConfig {
    /// SQLite database at `dbname` (`":memory:"` for an in-memory database)
    pub fn sqlite(dbname: impl Into<String>) -> Self {
        Self {
            db_type: DbType::Sqlite,
            dbname: dbname.into(),
            host: None,
            port: None,
            user: None,
            password: None,
        }
    }

    /// PostgreSQL server connection
    pub fn postgres(
        host: impl Into<String>,
        port: u16,
        dbname: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::server(DbType::Postgresql, host, port, dbname, user, password)
    }

    /// Oracle server connection; `service` is the service name
    pub fn oracle(
        host: impl Into<String>,
        port: u16,
        service: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::server(DbType::Oracle, host, port, service, user, password)
    }

    fn server(
        db_type: DbType,
        host: impl Into<String>,
        port: u16,
        dbname: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            db_type,
            dbname: dbname.into(),
            host: Some(host.into()),
            port: Some(port),
            user: Some(user.into()),
            password: Some(password.into()),
        }
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `SLIM_DB_TYPE`: `sqlite`, `postgresql` or `oracle` (default: `sqlite`)
    /// - `SLIM_DB_NAME`: Database file, database name or service name (default: `:memory:`)
    /// - `SLIM_DB_HOST`, `SLIM_DB_PORT`, `SLIM_DB_USER`, `SLIM_DB_PASSWORD`
    pub fn from_env() -> Result<Self> {
        let db_type = match std::env::var("SLIM_DB_TYPE") {
            Ok(s) => s.parse()?,
            Err(_) => DbType::Sqlite,
        };

        let config = Self {
            db_type,
            dbname: std::env::var("SLIM_DB_NAME").unwrap_or_else(|_| ":memory:".to_string()),
            host: std::env::var("SLIM_DB_HOST").ok(),
            port: std::env::var("SLIM_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
            user: std::env::var("SLIM_DB_USER").ok(),
            password: std::env::var("SLIM_DB_PASSWORD").ok(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the user
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Whether this points at an in-memory SQLite database
    pub fn is_memory(&self) -> bool {
        self.db_type == DbType::Sqlite && self.dbname == ":memory:"
    }

    /// Port to connect to, falling back to the backend default
    pub fn port_or_default(&self) -> Option<u16> {
        self.port.or_else(|| self.db_type.default_port())
    }

    /// Check that the settings the backend needs are present
    pub fn validate(&self) -> Result<()> {
        if self.dbname.is_empty() {
            return Err(self.missing("dbname"));
        }
        if self.db_type != DbType::Sqlite {
            if self.host.as_deref().map_or(true, str::is_empty) {
                return Err(self.missing("host"));
            }
            if self.user.as_deref().map_or(true, str::is_empty) {
                return Err(self.missing("user"));
            }
        }
        Ok(())
    }

    pub(crate) fn missing(&self, setting: &'static str) -> DbError {
        DbError::MissingConfig {
            db_type: self.db_type,
            setting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_db_type() {
        assert_eq!("sqlite".parse::<DbType>().unwrap(), DbType::Sqlite);
        assert_eq!("PostgreSQL".parse::<DbType>().unwrap(), DbType::Postgresql);
        assert_eq!("postgres".parse::<DbType>().unwrap(), DbType::Postgresql);
        assert_eq!("oracle".parse::<DbType>().unwrap(), DbType::Oracle);

        match "mysql".parse::<DbType>() {
            Err(DbError::UnknownDbType(name)) => assert_eq!(name, "mysql"),
            other => panic!("expected UnknownDbType, got {:?}", other),
        }
    }

    #[test]
    fn test_db_type_display_round_trips() {
        for db_type in [DbType::Sqlite, DbType::Postgresql, DbType::Oracle] {
            assert_eq!(db_type.to_string().parse::<DbType>().unwrap(), db_type);
        }
    }

    #[test]
    fn test_sqlite_config() {
        let config = DbConfig::sqlite(":memory:");
        assert!(config.is_memory());
        assert!(config.validate().is_ok());
        assert_eq!(config.port_or_default(), None);
    }

    #[test]
    fn test_server_config_requires_host_and_user() {
        let config = DbConfig {
            db_type: DbType::Postgresql,
            ..DbConfig::sqlite("foobar")
        };
        assert!(matches!(
            config.validate(),
            Err(DbError::MissingConfig { setting: "host", .. })
        ));

        let config = config.with_host("localhost");
        assert!(matches!(
            config.validate(),
            Err(DbError::MissingConfig { setting: "user", .. })
        ));

        let config = config.with_user("foobar");
        assert!(config.validate().is_ok());
        assert_eq!(config.port_or_default(), Some(5432));
    }

    #[test]
    fn test_empty_dbname_rejected() {
        assert!(matches!(
            DbConfig::sqlite("").validate(),
            Err(DbError::MissingConfig { setting: "dbname", .. })
        ));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = DbConfig::postgres("localhost", 5432, "foobar", "foobar", "s3cret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_deserialize_config() {
        let config: DbConfig = serde_json::from_value(serde_json::json!({
            "db_type": "postgres",
            "dbname": "foobar",
            "host": "localhost",
            "port": 5432,
            "user": "foobar",
            "password": "foobar"
        }))
        .unwrap();
        assert_eq!(
            config,
            DbConfig::postgres("localhost", 5432, "foobar", "foobar", "foobar")
        );
    }
}
