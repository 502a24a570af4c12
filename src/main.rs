use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nlsql_admin::api::ExecuteResponse;
use nlsql_admin::{classify_safety, generate, AdminService, SchemaSummary, Settings};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nlsql")]
#[command(about = "Natural-language PostgreSQL administration assistant")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate SQL for a request without executing it
    Generate {
        /// The request in plain English
        query: String,

        /// Load the schema of this database for data queries
        #[arg(short, long, conflicts_with = "schema_file")]
        database: Option<String>,

        /// Read a saved schema listing instead of connecting
        #[arg(long)]
        schema_file: Option<PathBuf>,
    },

    /// Classify the risk of a SQL statement
    Safety {
        sql: String,
    },

    /// Execute a SQL statement
    Execute {
        sql: String,

        #[arg(short, long)]
        database: String,

        /// Required: confirms the statement should run
        #[arg(long)]
        confirm: bool,

        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Generate SQL, show it, and execute after confirmation
    Ask {
        query: String,

        #[arg(short, long)]
        database: String,

        /// Skip the interactive confirmation
        #[arg(short, long)]
        yes: bool,

        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Extract and print a database schema
    Schema {
        #[arg(short, long)]
        database: String,

        /// Include row estimates, nullability, defaults and indexes
        #[arg(long)]
        detailed: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::load()?;
    let service = AdminService::new(settings);

    match args.command {
        Command::Generate {
            query,
            database,
            schema_file,
        } => {
            let response = match (database, schema_file) {
                (Some(db), _) => service.generate(&db, &query).await,
                (None, Some(path)) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    generate(&query, &SchemaSummary::parse(&text))
                }
                (None, None) => generate(&query, &SchemaSummary::default()),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Safety { sql } => {
            println!("{}", serde_json::to_string_pretty(&classify_safety(&sql))?);
        }
        Command::Execute {
            sql,
            database,
            confirm,
            format,
        } => {
            if !confirm {
                bail!("Refusing to execute without --confirm");
            }
            let response = service.execute(&database, &sql, confirm).await?;
            print_execution(&response, format)?;
        }
        Command::Ask {
            query,
            database,
            yes,
            format,
        } => {
            let generated = service.generate(&database, &query).await;
            let Some(sql) = generated.sql.clone() else {
                println!("{}", serde_json::to_string_pretty(&generated)?);
                return Ok(());
            };

            eprintln!("{}\n", sql);
            if let Some(recommendation) = &generated.recommendation {
                eprintln!("{}", recommendation);
            }
            if let Some(warnings) = &generated.warnings {
                eprintln!("{}", warnings);
            }

            if !yes && !prompt_confirmation()? {
                info!("Execution declined");
                eprintln!("Not executed.");
                return Ok(());
            }

            let response = service.execute(&database, &sql, true).await?;
            print_execution(&response, format)?;
        }
        Command::Schema { database, detailed } => {
            if detailed {
                println!("{}", service.describe_schema(&database).await?);
            } else {
                println!("{}", service.refresh_schema(&database).await?);
            }
        }
    }

    Ok(())
}

fn prompt_confirmation() -> Result<bool> {
    eprint!("Execute this query? [y/N] ");
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_execution(response: &ExecuteResponse, format: OutputFormat) -> Result<()> {
    match (format, &response.columns, &response.data) {
        (OutputFormat::Csv, Some(columns), Some(data)) if response.success => {
            let mut writer = csv::Writer::from_writer(io::stdout());
            writer.write_record(columns)?;
            for row in data {
                let record: Vec<String> = columns
                    .iter()
                    .map(|column| csv_field(row.get(column)))
                    .collect();
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
        _ => println!("{}", serde_json::to_string_pretty(response)?),
    }

    if !response.success {
        bail!(
            "{}",
            response.error.as_deref().unwrap_or("Execution failed")
        );
    }
    Ok(())
}

fn csv_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
