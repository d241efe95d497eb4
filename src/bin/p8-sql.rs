//! Percolate SQL CLI
//!
//! Ask questions of a SQLite database in natural language.

use clap::{Parser, Subcommand, ValueEnum};
use percolate_sql::db::SqliteOpener;
use percolate_sql::pipeline::SqlRunner;
use percolate_sql::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Percolate SQL CLI - natural language to SQL
#[derive(Parser)]
#[command(name = "p8-sql")]
#[command(about = "Answer natural language questions from a SQLite database", long_about = None)]
#[command(version)]
struct Cli {
    /// Database path (overrides P8_DB_PATH)
    #[arg(long, global = true, env = "P8_DB_PATH")]
    db: Option<PathBuf>,

    /// Model name (overrides P8_DEFAULT_LLM)
    #[arg(long, global = true, env = "P8_DEFAULT_LLM")]
    model: Option<String>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Allow statements that modify the database
    #[arg(long, global = true)]
    allow_writes: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question and print the response envelope
    Ask {
        /// Question in natural language
        question: String,
    },

    /// Print the schema context given to the model
    Schema {
        /// Print as JSON instead of prompt text
        #[arg(long)]
        json: bool,
    },

    /// Execute SQL directly and print the rows
    Run {
        /// SQL query string
        sql: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Ask { question } => {
            if question.trim().is_empty() {
                eprintln!("Error: question is empty");
                return Ok(ExitCode::from(2));
            }
            cmd_ask(&config, &question).await?;
        }
        Commands::Schema { json } => {
            cmd_schema(&config, json).await?;
        }
        Commands::Run { sql } => {
            cmd_run(&config, &sql).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let base = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let mut config = base.with_env_overrides(|key| std::env::var(key).ok())?;

    if let Some(db) = &cli.db {
        config.db_path = PathBuf::from(shellexpand::tilde(&db.to_string_lossy()).to_string());
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
        if let Ok(key) = std::env::var(config.llm.provider().api_key_var()) {
            config.llm.api_key = Some(key);
        }
    }
    if cli.allow_writes {
        config.read_only = false;
    }

    tracing::debug!(
        db = %config.db_path.display(),
        model = %config.llm.model,
        read_only = config.read_only,
        "Configuration loaded"
    );
    Ok(config)
}

fn init_tracing(format: LogFormat, verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

async fn cmd_ask(config: &PipelineConfig, question: &str) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    println!("{}", pipeline.handle_json(question).await);
    Ok(())
}

async fn cmd_schema(config: &PipelineConfig, json: bool) -> anyhow::Result<()> {
    let schema = SqlRunner::new(config, Arc::new(SqliteOpener)).schema().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else {
        println!("{}", schema.render());
    }
    Ok(())
}

async fn cmd_run(config: &PipelineConfig, sql: &str) -> anyhow::Result<()> {
    let rows = SqlRunner::new(config, Arc::new(SqliteOpener)).query(sql).await?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
