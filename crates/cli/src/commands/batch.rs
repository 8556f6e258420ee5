// Batch command: run every statement of a SQL file on the worker pool
//
// Each statement gets its own connection (and so its own transaction), which
// is committed when the connection closes. Statements run in parallel, so a
// file whose statements depend on each other should use `--workers 1`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use slim_db::{with_connection, DbConfig};
use slim_parallel::{RunSummary, TaskError, TaskOutcome, TaskWrapper, WorkerPool, WorkerPoolConfig};
use tracing::{info, warn};

use crate::output::{print_field, print_table_header, print_table_row, OutputFormat};

/// Outcome of one statement, in file order
#[derive(Debug, Serialize)]
pub struct StatementOutcome {
    pub index: usize,
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

/// Everything a batch run reports
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub statements: Vec<StatementOutcome>,
    pub summary: RunSummary,
}

impl BatchReport {
    /// Pair each statement with its outcome
    pub fn new(statements: Vec<String>, outcomes: Vec<TaskOutcome<u64>>) -> Self {
        let summary = RunSummary::from_outcomes(&outcomes);
        let statements = statements
            .into_iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (sql, outcome))| {
                let (rows_affected, error) = match outcome {
                    Ok(rows) => (Some(rows), None),
                    Err(e) => (None, Some(e)),
                };
                StatementOutcome {
                    index,
                    sql,
                    rows_affected,
                    error,
                }
            })
            .collect();

        Self {
            statements,
            summary,
        }
    }
}

pub async fn run(
    config: DbConfig,
    file: &Path,
    workers: Option<usize>,
    output_format: OutputFormat,
) -> Result<()> {
    let script = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let statements = split_statements(&script);
    if statements.is_empty() {
        warn!(file = %file.display(), "No statements found");
    }

    let mut pool_config = WorkerPoolConfig::from_env().with_pool_name("batch");
    if let Some(workers) = workers {
        pool_config = pool_config.with_worker_count(workers);
    }

    // Workers are blocking threads; they drive each connection on this runtime
    let handle = tokio::runtime::Handle::current();
    let task = TaskWrapper::from_std_error(move |sql: String| {
        handle.block_on(with_connection(&config, |db| {
            Box::pin(async move { db.execute(&sql, &[]).await })
        }))
    })
    .with_name("execute-statement");

    info!(
        file = %file.display(),
        statements = statements.len(),
        workers = pool_config.worker_count,
        "Running batch"
    );

    let outcomes = WorkerPool::with_config(task, statements.clone(), pool_config)
        .context("Invalid worker pool settings")?
        .run()
        .await
        .context("Worker pool failed")?;

    let report = BatchReport::new(statements, outcomes);
    if output_format.is_text() {
        print_report(&report);
    } else {
        output_format.print_value(&report)?;
    }

    if !report.summary.is_success() {
        bail!(
            "{} of {} statements failed",
            report.summary.failed,
            report.summary.total
        );
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    print_table_header(&[("#", 5), ("STATUS", 8), ("ROWS", 8), ("STATEMENT", 60)]);
    for outcome in &report.statements {
        let index = outcome.index.to_string();
        let status = if outcome.error.is_some() { "failed" } else { "ok" };
        let rows = outcome
            .rows_affected
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        let sql = outcome.sql.replace('\n', " ");
        print_table_row(&[
            (index.as_str(), 5),
            (status, 8),
            (rows.as_str(), 8),
            (sql.as_str(), 60),
        ]);
    }

    let failures: Vec<&StatementOutcome> = report
        .statements
        .iter()
        .filter(|o| o.error.is_some())
        .collect();
    if !failures.is_empty() {
        println!();
        println!("Failures:");
        for outcome in failures {
            if let Some(error) = &outcome.error {
                println!("  #{}: {}", outcome.index, error);
            }
        }
    }

    println!();
    print_field("Statements", &report.summary.total.to_string());
    print_field("Succeeded", &report.summary.succeeded.to_string());
    print_field("Failed", &report.summary.failed.to_string());
}

/// Split a SQL script into statements on `;`
///
/// Semicolons inside quoted strings or identifiers do not split, `--` line
/// comments are dropped, and empty statements are skipped.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            ';' => push_statement(&mut statements, &mut current),
            _ => current.push(c),
        }
    }
    push_statement(&mut statements, &mut current);

    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple_script() {
        let script = "CREATE TABLE foo (id INTEGER);\nINSERT INTO foo VALUES (1);\n\n";
        assert_eq!(
            split_statements(script),
            vec!["CREATE TABLE foo (id INTEGER)", "INSERT INTO foo VALUES (1)"]
        );
    }

    #[test]
    fn test_split_keeps_last_statement_without_semicolon() {
        assert_eq!(
            split_statements("SELECT 1; SELECT 2"),
            vec!["SELECT 1", "SELECT 2"]
        );
    }

    #[test]
    fn test_split_ignores_semicolons_in_quotes() {
        let script = "INSERT INTO foo VALUES ('a;b'); INSERT INTO \"odd;name\" VALUES ('it''s; fine')";
        assert_eq!(
            split_statements(script),
            vec![
                "INSERT INTO foo VALUES ('a;b')",
                "INSERT INTO \"odd;name\" VALUES ('it''s; fine')",
            ]
        );
    }

    #[test]
    fn test_split_drops_comments_and_empty_statements() {
        let script = "-- setup; not a statement\nSELECT 1;;\n  ;\nSELECT 2 -- trailing; comment\n;";
        assert_eq!(split_statements(script), vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_empty_script() {
        assert!(split_statements("").is_empty());
        assert!(split_statements("  \n-- only a comment\n").is_empty());
    }

    #[test]
    fn test_report_keeps_file_order() {
        let statements = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let outcomes = vec![Ok(1), Err(TaskError::failed("no such table")), Ok(0)];

        let report = BatchReport::new(statements, outcomes);

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.failed_indices, vec![1]);
        assert_eq!(report.statements[0].rows_affected, Some(1));
        assert_eq!(report.statements[1].sql, "b");
        assert!(report.statements[1].error.is_some());
        assert_eq!(report.statements[2].rows_affected, Some(0));
    }

    #[test]
    fn test_report_serializes_without_empty_fields() {
        let report = BatchReport::new(vec!["SELECT 1".to_string()], vec![Ok(0)]);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["statements"][0]["rows_affected"], 0);
        assert!(json["statements"][0].get("error").is_none());
        assert_eq!(json["summary"]["succeeded"], 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_runs_statements_against_sqlite() {
        let path = std::env::temp_dir().join(format!(
            "slim-cli-batch-{}.sql",
            std::process::id()
        ));
        std::fs::write(&path, "SELECT 1; SELECT 2; NOT SQL").unwrap();

        let result = run(
            DbConfig::sqlite(":memory:"),
            &path,
            Some(2),
            OutputFormat::Json,
        )
        .await;

        std::fs::remove_file(&path).ok();
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "1 of 3 statements failed");
    }
}
