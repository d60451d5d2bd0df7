//! Paddock CLI - manage the F1 race data store

use clap::{Parser, Subcommand};
use paddock::config::{self, PaddockConfig};
use paddock::import;
use paddock::storage::Store;
use paddock::ui::{self, Icons};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "paddock")]
#[command(version)]
#[command(about = "Formula 1 race data store - schema lifecycle and collector imports")]
#[command(long_about = r#"
Paddock keeps races, events, circuits, drivers, constructors, results and
standings in one SQLite database.

Example usage:
  paddock init
  paddock import --file weekend.json
  paddock stats --database data/f1.db
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides DB_PATH and paddock.toml)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create every table and index
    Init,

    /// Drop and re-create every table
    Reset,

    /// Drop every table
    Drop,

    /// Show table creation order and foreign-key dependents
    Order,

    /// Row counts per table
    Stats,

    /// Import a collector bundle (JSON)
    Import {
        /// Bundle file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Write a default paddock.toml
    Config {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
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

    if let Err(e) = run(cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Config { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let defaults = PaddockConfig {
                database: Some(config::default_database_path().display().to_string()),
            };
            config::write_config(&path, &defaults, force)?;
            ui::success(&format!("Wrote {}", path.display()));
            Ok(())
        }
        command => {
            let database = database_path(cli.database.as_deref(), cli.config.as_deref())?;
            let store = Store::open(&database)?;
            execute(&store, &database, command)?;
            store.close()?;
            Ok(())
        }
    }
}

fn database_path(flag: Option<&Path>, config_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let file_config = config::load_config(config_path)?;
    let env_path = std::env::var(config::DB_PATH_ENV).ok();
    let database =
        config::resolve_database_path(flag, env_path.as_deref(), file_config.as_ref());
    config::ensure_db_dir(&database)?;
    Ok(database)
}

fn execute(store: &Store, database: &Path, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init => {
            store.initialize()?;
            store.commit()?;
            ui::success(&format!("Initialized {}", database.display()));
        }

        Commands::Reset => {
            store.reset_tables()?;
            store.commit()?;
            ui::success(&format!("{} Reset every table in {}", Icons::WRENCH, database.display()));
        }

        Commands::Drop => {
            store.drop_tables()?;
            store.commit()?;
            ui::success(&format!("{} Dropped every table in {}", Icons::TRASH, database.display()));
        }

        Commands::Order => {
            let graph = store.dependency_graph()?;
            let order = graph.creation_order()?;
            ui::header(&format!("{} Creation order", Icons::LINK));
            println!("{}", ui::order_table(&graph, &order));
        }

        Commands::Stats => {
            let stats = store.stats()?;
            ui::header(&format!("{} Paddock statistics", Icons::STATS));
            ui::info(&format!("{} Database", Icons::DATABASE), &database.display().to_string());
            println!("{}", ui::stats_table(&stats));
        }

        Commands::Import { file } => run_import(store, &file)?,

        // needs no store; dispatched by `run`
        Commands::Config { .. } => {}
    }
    Ok(())
}

fn run_import(store: &Store, file: &Path) -> anyhow::Result<()> {
    let bundle = import::load_bundle(file)?;
    if bundle.is_empty() {
        ui::warn(&format!("{} holds no records", file.display()));
        return Ok(());
    }

    ui::header(&format!("{} Importing {}", Icons::PACKAGE, file.display()));
    store.initialize()?;
    store.commit()?;

    let report = import::import(store, &bundle)?;
    println!("{}", ui::import_table(&report));

    let total = report.total();
    ui::section("Summary");
    ui::summary_row("inserted", &total.inserted.to_string());
    ui::summary_row("updated", &total.updated.to_string());
    ui::success("Import complete");
    Ok(())
}
