// Query command: run one query and print its rows

use anyhow::{Context, Result};
use slim_db::{with_connection, DbConfig};

use super::parse_params;
use crate::output::{print_query_table, OutputFormat};

pub async fn run(
    config: &DbConfig,
    sql: &str,
    params: &[String],
    output_format: OutputFormat,
) -> Result<()> {
    let sql = sql.to_string();
    let params = parse_params(params);

    let result = with_connection(config, |db| {
        Box::pin(async move { db.query(&sql, &params).await })
    })
    .await
    .with_context(|| format!("Failed to run query on {}", config.db_type))?;

    if output_format.is_text() {
        print_query_table(&result);
        println!("({} row(s))", result.len());
    } else {
        output_format.print_value(&result)?;
    }

    Ok(())
}
