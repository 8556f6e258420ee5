// Execute command: run one statement and commit

use anyhow::{Context, Result};
use serde::Serialize;
use slim_db::{with_connection, DbConfig};

use super::parse_params;
use crate::output::OutputFormat;

#[derive(Debug, Serialize)]
struct ExecuteOutput {
    rows_affected: u64,
}

pub async fn run(
    config: &DbConfig,
    sql: &str,
    params: &[String],
    output_format: OutputFormat,
) -> Result<()> {
    let sql = sql.to_string();
    let params = parse_params(params);

    let rows_affected = with_connection(config, |db| {
        Box::pin(async move { db.execute(&sql, &params).await })
    })
    .await
    .with_context(|| format!("Failed to execute statement on {}", config.db_type))?;

    if output_format.is_text() {
        println!("{} row(s) affected", rows_affected);
    } else {
        output_format.print_value(&ExecuteOutput { rows_affected })?;
    }

    Ok(())
}
