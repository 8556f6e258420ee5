//! # Database helper
//!
//! A single open/execute/query/commit/rollback/close interface over
//! SQLite, PostgreSQL and Oracle.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  DbConfig  ──connect()──▶                    │
//! │                                                              │
//! │   Box<dyn DbHelper>                                          │
//! │     ├── SqliteHelper    (sqlx, SqliteConnection)             │
//! │     ├── PostgresHelper  (sqlx, PgConnection)                 │
//! │     └── OracleHelper    (oracle crate, feature = "oracle")   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use slim_db::prelude::*;
//!
//! let config = DbConfig::sqlite(":memory:");
//! let result = with_connection(&config, |db| {
//!     Box::pin(async move {
//!         db.execute("CREATE TABLE foo (id INTEGER PRIMARY KEY, txt TEXT)", &[]).await?;
//!         db.execute("INSERT INTO foo VALUES (?, ?)", &[1.into(), "a".into()]).await?;
//!         db.commit().await?;
//!         db.query("SELECT * FROM foo WHERE id = ?", &[1.into()]).await
//!     })
//! })
//! .await?;
//!
//! assert_eq!(result.columns, vec!["id", "txt"]);
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod helper;
pub mod value;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::{DbConfig, DbType};
    pub use crate::error::DbError;
    pub use crate::helper::{connect, with_connection, DbHelper};
    pub use crate::value::{DbValue, QueryResult};
}

// Re-export key types at crate root
pub use backend::{PostgresHelper, SqliteHelper};
#[cfg(feature = "oracle")]
pub use backend::OracleHelper;
pub use config::{DbConfig, DbType};
pub use error::{DbError, Result};
pub use helper::{connect, with_connection, DbHelper};
pub use value::{DbValue, QueryResult};
