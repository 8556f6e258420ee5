//! Backend implementations of [`DbHelper`](crate::DbHelper)

mod postgres;
mod sqlite;

#[cfg(feature = "oracle")]
mod oracle;

pub use postgres::PostgresHelper;
pub use sqlite::SqliteHelper;

#[cfg(feature = "oracle")]
pub use self::oracle::OracleHelper;
