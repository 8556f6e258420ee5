// slim CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Every database flag can also come from SLIM_DB_* environment variables.
// Design Decision: Support text/json/yaml output formats for scripting.

mod commands;
mod output;
mod telemetry;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use slim_db::{DbConfig, DbType};

#[derive(Parser)]
#[command(name = "slim")]
#[command(about = "slim CLI - Run SQL against SQLite, PostgreSQL or Oracle, one statement or a parallel batch")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub db: DbArgs,

    /// Output format
    #[arg(long, short, global = true, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Database connection flags
#[derive(Args)]
pub struct DbArgs {
    /// Database backend: sqlite, postgresql or oracle
    #[arg(long, global = true, env = "SLIM_DB_TYPE", default_value = "sqlite")]
    pub db_type: String,

    /// SQLite file, PostgreSQL database name or Oracle service name
    #[arg(long, global = true, env = "SLIM_DB_NAME", default_value = ":memory:")]
    pub db_name: String,

    /// Server host
    #[arg(long, global = true, env = "SLIM_DB_HOST")]
    pub db_host: Option<String>,

    /// Server port (defaults to the backend's standard port)
    #[arg(long, global = true, env = "SLIM_DB_PORT")]
    pub db_port: Option<u16>,

    /// Database user
    #[arg(long, global = true, env = "SLIM_DB_USER")]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long, global = true, env = "SLIM_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,
}

impl DbArgs {
    /// Build and validate the connection configuration
    pub fn to_config(&self) -> anyhow::Result<DbConfig> {
        let db_type: DbType = self.db_type.parse()?;

        let config = DbConfig {
            db_type,
            dbname: self.db_name.clone(),
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_password.clone(),
        };
        config
            .validate()
            .with_context(|| format!("Invalid {} connection settings", db_type))?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one statement and print the affected row count
    Execute {
        /// SQL statement (placeholders use the backend's syntax)
        sql: String,

        /// Bound parameter (repeatable): null, true/false, numbers, otherwise text
        #[arg(long = "param", short = 'p')]
        params: Vec<String>,
    },

    /// Run a query and print the rows
    Query {
        /// SQL query (placeholders use the backend's syntax)
        sql: String,

        /// Bound parameter (repeatable): null, true/false, numbers, otherwise text
        #[arg(long = "param", short = 'p')]
        params: Vec<String>,
    },

    /// Run every statement of a SQL file in parallel, one connection each
    Batch {
        /// File with `;`-separated statements
        file: PathBuf,

        /// Worker threads (default: SLIM_POOL_WORKERS or the number of CPUs)
        #[arg(long, short)]
        workers: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(telemetry::TelemetryConfig::from_env());

    let output_format = output::OutputFormat::from_str(&cli.output);
    let config = cli.db.to_config()?;

    match cli.command {
        Commands::Execute { sql, params } => {
            commands::execute::run(&config, &sql, &params, output_format).await
        }
        Commands::Query { sql, params } => {
            commands::query::run(&config, &sql, &params, output_format).await
        }
        Commands::Batch { file, workers } => {
            commands::batch::run(config, &file, workers, output_format).await
        }
    }
}
