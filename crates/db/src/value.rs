//! Values passed to and returned from the database

use serde::{Deserialize, Serialize};

/// A single SQL parameter or column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DbValue {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (any width up to 64 bits)
    Integer(i64),
    /// Floating point value
    Real(f64),
    /// Text value; also used for dates, UUIDs and JSON columns
    Text(String),
    /// Binary value
    Blob(Vec<u8>),
}

impl DbValue {
    /// Parse a command-line style literal
    ///
    /// `null`, `true`/`false`, integers and floats map to their typed
    /// variants; anything else is text. Quote a value (`'42'`) to force text.
    pub fn parse_literal(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("null") {
            return DbValue::Null;
        }
        if raw.eq_ignore_ascii_case("true") {
            return DbValue::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return DbValue::Bool(false);
        }
        if let Ok(v) = raw.parse::<i64>() {
            return DbValue::Integer(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            if v.is_finite() {
                return DbValue::Real(v);
            }
        }
        let unquoted = raw
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .unwrap_or(raw);
        DbValue::Text(unquoted.to_string())
    }

    /// Whether this is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    /// Integer value, if this is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DbValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Text value, if this is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DbValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for DbValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbValue::Null => write!(f, "NULL"),
            DbValue::Bool(v) => write!(f, "{}", v),
            DbValue::Integer(v) => write!(f, "{}", v),
            DbValue::Real(v) => write!(f, "{}", v),
            DbValue::Text(v) => write!(f, "{}", v),
            DbValue::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        DbValue::Integer(v)
    }
}

impl From<i32> for DbValue {
    fn from(v: i32) -> Self {
        DbValue::Integer(v as i64)
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        DbValue::Real(v)
    }
}

impl From<bool> for DbValue {
    fn from(v: bool) -> Self {
        DbValue::Bool(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        DbValue::Text(v.to_string())
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        DbValue::Text(v)
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(v: Vec<u8>) -> Self {
        DbValue::Blob(v)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(DbValue::Null)
    }
}

/// Rows returned by a query, together with their column names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in select order
    pub columns: Vec<String>,
    /// One entry per row, values in column order
    pub rows: Vec<Vec<DbValue>>,
}

impl QueryResult {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were returned
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at `row` for the named column
    pub fn get(&self, row: usize, column: &str) -> Option<&DbValue> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        assert_eq!(DbValue::parse_literal("NULL"), DbValue::Null);
        assert_eq!(DbValue::parse_literal("true"), DbValue::Bool(true));
        assert_eq!(DbValue::parse_literal("False"), DbValue::Bool(false));
        assert_eq!(DbValue::parse_literal("42"), DbValue::Integer(42));
        assert_eq!(DbValue::parse_literal("-7"), DbValue::Integer(-7));
        assert_eq!(DbValue::parse_literal("2.5"), DbValue::Real(2.5));
        assert_eq!(DbValue::parse_literal("abc"), DbValue::Text("abc".into()));
        assert_eq!(DbValue::parse_literal("'42'"), DbValue::Text("42".into()));
        assert_eq!(DbValue::parse_literal("inf"), DbValue::Text("inf".into()));
        assert_eq!(DbValue::parse_literal(""), DbValue::Text(String::new()));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(DbValue::from(None::<i64>), DbValue::Null);
        assert_eq!(DbValue::from(Some("x")), DbValue::Text("x".into()));
    }

    #[test]
    fn test_serializes_untagged() {
        let row = vec![
            DbValue::Integer(1),
            DbValue::Text("a".into()),
            DbValue::Null,
            DbValue::Bool(true),
        ];
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            serde_json::json!([1, "a", null, true])
        );
    }

    #[test]
    fn test_query_result_get() {
        let result = QueryResult {
            columns: vec!["id".into(), "txt".into()],
            rows: vec![vec![DbValue::Integer(2), DbValue::Text("b".into())]],
        };
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(0, "txt"), Some(&DbValue::Text("b".into())));
        assert_eq!(result.get(0, "missing"), None);
        assert_eq!(result.get(1, "id"), None);
    }
}
