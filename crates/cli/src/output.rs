// Output formatting for CLI

use serde::Serialize;
use slim_db::{DbValue, QueryResult};

/// Widest a text table column may get before values are truncated
const MAX_COLUMN_WIDTH: usize = 40;

#[derive(Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s {
            "json" => OutputFormat::Json,
            "yaml" => OutputFormat::Yaml,
            _ => OutputFormat::Text,
        }
    }

    pub fn print_value<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        match self {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(value)?);
            }
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(value)?);
            }
            OutputFormat::Text => {
                // Text format is handled by each command
            }
        }
        Ok(())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, OutputFormat::Text)
    }
}

/// Print a simple key-value pair for text output
pub fn print_field(label: &str, value: &str) {
    println!("{:<14} {}", format!("{}:", label), value);
}

/// Print a table header
pub fn print_table_header(columns: &[(&str, usize)]) {
    let header: String = columns
        .iter()
        .map(|(name, width)| format!("{:<width$}", name, width = width))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", header);
}

/// Print a table row
pub fn print_table_row(values: &[(&str, usize)]) {
    let row: String = values
        .iter()
        .map(|(val, width)| format!("{:<width$}", truncate(val, *width), width = width))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", row);
}

/// Shorten `value` to `width` characters, marking the cut with "..."
pub fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut s: String = value.chars().take(keep).collect();
    s.push_str("...");
    s
}

/// Column widths that fit the header and every rendered value
pub fn column_widths(columns: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|v| v.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// Print query rows as an aligned text table
pub fn print_query_table(result: &QueryResult) {
    let rendered: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(DbValue::to_string).collect())
        .collect();
    let widths = column_widths(&result.columns, &rendered);

    let header: Vec<(&str, usize)> = result
        .columns
        .iter()
        .map(String::as_str)
        .zip(widths.iter().copied())
        .collect();
    print_table_header(&header);

    for row in &rendered {
        let values: Vec<(&str, usize)> = row
            .iter()
            .map(String::as_str)
            .zip(widths.iter().copied())
            .collect();
        print_table_row(&values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert!(matches!(OutputFormat::from_str("json"), OutputFormat::Json));
        assert!(matches!(OutputFormat::from_str("yaml"), OutputFormat::Yaml));
        assert!(OutputFormat::from_str("text").is_text());
        assert!(OutputFormat::from_str("anything").is_text());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("a much longer value", 10), "a much ...");
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_column_widths() {
        let columns = vec!["id".to_string(), "txt".to_string()];
        let rows = vec![
            vec!["1".to_string(), "a".to_string()],
            vec!["1000".to_string(), "x".repeat(100)],
        ];
        assert_eq!(column_widths(&columns, &rows), vec![4, MAX_COLUMN_WIDTH]);
    }

    #[test]
    fn test_column_widths_without_rows() {
        let columns = vec!["name".to_string()];
        assert_eq!(column_widths(&columns, &[]), vec![4]);
    }
}
