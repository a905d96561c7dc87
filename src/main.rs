use std::io::stderr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use ledger_cli::cli::{
    handle_account_command, handle_audit_command, handle_category_command,
    handle_history_command, handle_import_command, handle_transaction_command, AccountCommands,
    AuditArgs, CategoryCommands, HistoryCommands, ImportArgs, TransactionCommands,
};
use ledger_cli::config::{LedgerPaths, Settings};
use ledger_cli::storage::{init::schema_version, Storage};

#[derive(Parser)]
#[command(
    name = "ledger",
    version,
    about = "Personal ledger with exact money arithmetic and idempotent CSV import",
    long_about = "ledger keeps accounts and transactions in a local SQLite database. \
                  Every write keeps each account's stored balance equal to its opening \
                  balance plus the sum of its transactions, and importing the same CSV \
                  file twice is refused."
)]
struct Cli {
    /// Log level for diagnostics on stderr (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "LEDGER_LOG")]
    log_level: Option<String>,

    /// Data directory (overrides LEDGER_DATA_DIR and the default location)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, database and settings file
    Init,

    /// Show current configuration and paths
    Config,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Transaction management commands
    #[command(subcommand, alias = "transaction")]
    Txn(TransactionCommands),

    /// Import transactions from a CSV file
    Import(ImportArgs),

    /// Import history
    #[command(subcommand)]
    History(HistoryCommands),

    /// Show recent audit log entries
    Audit(AuditArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(dir) => LedgerPaths::with_base_dir(dir),
        None => LedgerPaths::new()?,
    };
    let settings = Settings::load_or_create(&paths)?;

    let log_level = cli.log_level.as_deref().unwrap_or(&settings.log_level);
    setup_logging(parse_log_level(log_level));
    debug!(base_dir = %paths.base_dir().display(), "Resolved data directory");

    let Some(command) = cli.command else {
        println!("ledger - personal ledger with idempotent CSV import");
        println!();
        println!("Run 'ledger init' to create a ledger.");
        println!("Run 'ledger --help' for usage information.");
        return Ok(());
    };

    match command {
        Commands::Init => {
            println!("Initializing ledger at: {}", paths.base_dir().display());
            let storage = Storage::open(&paths)?;
            if !paths.settings_file().exists() {
                settings.save(&paths)?;
            }
            println!("  Database: {}", paths.database_file().display());
            println!("  Schema version: {}", schema_version(storage.conn())?);
            println!("  Settings: {}", paths.settings_file().display());
            println!("Initialization complete!");
        }
        Commands::Config => {
            println!("Ledger Configuration");
            println!("====================");
            println!("Data directory: {}", paths.base_dir().display());
            println!("Database:       {}", paths.database_file().display());
            println!("Audit log:      {}", paths.audit_log().display());
            println!("Settings file:  {}", paths.settings_file().display());
            println!(
                "Initialized:    {}",
                if paths.is_initialized() { "Yes" } else { "No" }
            );
            println!();
            println!("Settings:");
            println!("  Currency symbol:     {}", settings.currency_symbol);
            println!("  Display date format: {}", settings.display_date_format);
            println!("  Import batch size:   {}", settings.import.batch_size);
            println!("  Import date format:  {}", settings.import.date_format);
            println!("  Skip duplicates:     {}", settings.import.skip_duplicates);
            println!("  Log level:           {}", settings.log_level);
        }
        Commands::Account(cmd) => {
            let storage = Storage::open(&paths)?;
            handle_account_command(&storage, &settings, cmd)?;
        }
        Commands::Category(cmd) => {
            let storage = Storage::open(&paths)?;
            handle_category_command(&storage, cmd)?;
        }
        Commands::Txn(cmd) => {
            let storage = Storage::open(&paths)?;
            handle_transaction_command(&storage, &settings, cmd)?;
        }
        Commands::Import(args) => {
            let storage = Storage::open(&paths)?;
            handle_import_command(&storage, &settings, args)?;
        }
        Commands::History(cmd) => {
            let storage = Storage::open(&paths)?;
            handle_history_command(&storage, &settings, cmd)?;
        }
        Commands::Audit(args) => {
            let storage = Storage::open(&paths)?;
            handle_audit_command(&storage, args)?;
        }
    }

    Ok(())
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "off" => LevelFilter::OFF,
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'warn'", level);
            LevelFilter::WARN
        }
    }
}

fn setup_logging(level: LevelFilter) {
    // stdout carries command output (and JSON); diagnostics go to stderr
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry().with(terminal_log).init();
}
