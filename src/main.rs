//! Quickorm CLI - declarative record store over SQLite

mod commands;

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use quickorm::config::{self, QuickormConfig};
use quickorm::{DatabaseDeclaration, RecordMapper, SqliteAdapter, StorageAdapter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "quickorm")]
#[command(version)]
#[command(about = "Quick-n-easy record mapper - declared tables, additive migrations, bidirectional relations")]
#[command(long_about = r#"
Quickorm stores records for tables declared in a schema file:
  • Tables and missing columns are created on connect
  • Input is validated and coerced against the declared types
  • One-to-one / one-to-many relations are kept in sync on both sides
  • Reads expand relations into nested records

Example usage:
  quickorm init
  quickorm insert --table user --data '{"email": "a@b.c"}'
  quickorm get --id user_3f6c...
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the schema declaration, TOML or JSON (overrides config)
    #[arg(short, long, global = true)]
    schema: Option<PathBuf>,

    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Create missing tables and columns
    Migrate,

    /// Show the declared tables and fields
    Schema {
        /// Only this table
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Insert a record
    Insert {
        /// Table to insert into
        #[arg(short, long)]
        table: String,

        /// Field values as a JSON object
        #[arg(long)]
        data: String,
    },

    /// Fetch a record by id
    Get {
        /// Record id
        #[arg(short, long)]
        id: String,

        /// Return raw relation ids
        #[arg(long)]
        no_expand: bool,
    },

    /// List every record of a table
    List {
        /// Table to list
        #[arg(short, long)]
        table: String,

        /// Return raw relation ids
        #[arg(long)]
        no_expand: bool,
    },

    /// Rewrite a record; the JSON must carry its id
    Update {
        /// Full record as a JSON object
        #[arg(long)]
        data: String,
    },

    /// Delete a record by id
    Delete {
        /// Record id
        #[arg(short, long)]
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    ok: bool,
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Print a JSON success envelope; no-op in human mode
pub fn emit_success<T: Serialize>(output_mode: OutputMode, command: &str, data: T) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = Envelope { ok: true, command, data: Some(data), error: None };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn emit_error(output_mode: OutputMode, command: &str, err: &anyhow::Error) {
    match output_mode {
        OutputMode::Human => quickorm::ui::error(&format!("{:#}", err)),
        OutputMode::Json => {
            let envelope: Envelope<'_, ()> = Envelope {
                ok: false,
                command,
                data: None,
                error: Some(format!("{:#}", err)),
            };
            match serde_json::to_string_pretty(&envelope) {
                Ok(text) => println!("{}", text),
                Err(_) => eprintln!("{:#}", err),
            }
        }
    }
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::Migrate => "migrate",
            Commands::Schema { .. } => "schema",
            Commands::Insert { .. } => "insert",
            Commands::Get { .. } => "get",
            Commands::List { .. } => "list",
            Commands::Update { .. } => "update",
            Commands::Delete { .. } => "delete",
        }
    }
}

/// File config merged with CLI overrides
struct Resolved {
    config: QuickormConfig,
    database: PathBuf,
    schema: PathBuf,
}

impl Resolved {
    fn load(config_path: Option<&Path>, database: Option<PathBuf>, schema: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = config::load_config(config_path)?.unwrap_or_default();
        let database = database
            .or_else(|| config.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(config::default_database_path);
        let schema = schema
            .or_else(|| config.schema.as_ref().map(PathBuf::from))
            .unwrap_or_else(config::default_schema_path);
        Ok(Self { config, database, schema })
    }

    fn declaration(&self) -> anyhow::Result<DatabaseDeclaration> {
        config::load_declaration(&self.schema)
    }

    fn open_adapter(&self) -> anyhow::Result<SqliteAdapter> {
        config::ensure_db_dir(&self.database)?;
        tracing::debug!("Opening database {}", self.database.display());
        Ok(SqliteAdapter::open(&self.database)?)
    }

    async fn connect(&self) -> anyhow::Result<RecordMapper> {
        let declaration = self.declaration()?;
        let adapter = Arc::new(self.open_adapter()?);
        let mapper = RecordMapper::connect_with_options(adapter, declaration, self.config.mapper_options()).await?;
        Ok(mapper)
    }
}

async fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let Cli { config: config_path, database, schema, command, .. } = cli;
    let resolve = || Resolved::load(config_path.as_deref(), database.clone(), schema.clone());

    match command {
        Commands::Init { force } => {
            let path = config_path.clone().unwrap_or_else(config::default_config_path);
            commands::run_init(output_mode, &path, force)?;
        }

        Commands::Schema { table } => {
            let declaration = resolve()?.declaration()?;
            commands::run_schema(output_mode, &declaration, table.as_deref())?;
        }

        Commands::Migrate => {
            let resolved = resolve()?;
            let declaration = resolved.declaration()?;
            let adapter = resolved.open_adapter()?;
            commands::run_migrate(output_mode, &adapter, &declaration).await?;
            adapter.close().await?;
        }

        Commands::Insert { table, data } => {
            let mapper = resolve()?.connect().await?;
            commands::run_insert(output_mode, &mapper, &table, &data).await?;
            mapper.close().await?;
        }

        Commands::Get { id, no_expand } => {
            let mapper = resolve()?.connect().await?;
            commands::run_get(output_mode, &mapper, &id, !no_expand).await?;
            mapper.close().await?;
        }

        Commands::List { table, no_expand } => {
            let mapper = resolve()?.connect().await?;
            commands::run_list(output_mode, &mapper, &table, !no_expand).await?;
            mapper.close().await?;
        }

        Commands::Update { data } => {
            let mapper = resolve()?.connect().await?;
            commands::run_update(output_mode, &mapper, &data).await?;
            mapper.close().await?;
        }

        Commands::Delete { id } => {
            let mapper = resolve()?.connect().await?;
            commands::run_delete(output_mode, &mapper, &id).await?;
            mapper.close().await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let command = cli.command.name();

    if let Err(err) = run(cli, output_mode).await {
        emit_error(output_mode, command, &err);
        std::process::exit(1);
    }
}
