mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::Value;
use std::path::PathBuf;
use std::process;

use loan_ledger_core::session::LedgerSession;
use loan_ledger_core::store::JsonFileStore;

use commands::loans::{
    AddArgs, DeleteArgs, EditArgs, ListArgs, PayArgs, PayInstallmentArgs, ShowArgs,
};
use commands::schedule::ScheduleArgs;

/// Track personal loans and their monthly installments
#[derive(Parser)]
#[command(
    name = "loans",
    version,
    about = "Track personal loans and their monthly installments",
    long_about = "A CLI for recording loans, deriving monthly installment schedules \
                  and marking installments and payments as complete. State is kept \
                  in a single JSON entry on disk."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Directory holding the ledger entry
    #[arg(long, env = "LOAN_LEDGER_DIR", default_value = ".", global = true)]
    store_dir: PathBuf,

    /// Name of the ledger entry (stored as <name>.json)
    #[arg(long, env = "LOAN_LEDGER_KEY", default_value = "loans", global = true)]
    store_key: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new loan
    Add(AddArgs),
    /// Change the details of a loan
    Edit(EditArgs),
    /// Remove a loan
    Delete(DeleteArgs),
    /// Record a lump-sum payment against a loan
    Pay(PayArgs),
    /// Mark one monthly installment as paid
    PayInstallment(PayInstallmentArgs),
    /// List loans, refreshing overdue status first
    List(ListArgs),
    /// Show a single loan with its progress
    Show(ShowArgs),
    /// Portfolio totals across all loans
    Summary,
    /// Preview an installment schedule without saving anything
    Schedule(ScheduleArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

type Session = LedgerSession<JsonFileStore>;

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let store = JsonFileStore::new(&cli.store_dir, cli.store_key.as_str());
    tracing::debug!(store = %store.path().display(), "using ledger store");

    let result: Result<Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Add(args) => with_session(store, |s| commands::loans::run_add(args, s)),
        Commands::Edit(args) => with_session(store, |s| commands::loans::run_edit(args, s)),
        Commands::Delete(args) => with_session(store, |s| commands::loans::run_delete(args, s)),
        Commands::Pay(args) => with_session(store, |s| commands::loans::run_pay(args, s)),
        Commands::PayInstallment(args) => {
            with_session(store, |s| commands::loans::run_pay_installment(args, s))
        }
        Commands::List(args) => with_session(store, |s| commands::loans::run_list(args, s)),
        Commands::Show(args) => with_session(store, |s| commands::loans::run_show(args, s)),
        Commands::Summary => with_session(store, commands::loans::run_summary),
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::Version => {
            println!("loans {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

fn with_session<F>(store: JsonFileStore, run: F) -> Result<Value, Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Session) -> Result<Value, Box<dyn std::error::Error>>,
{
    let mut session = LedgerSession::open(store);
    run(&mut session)
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
