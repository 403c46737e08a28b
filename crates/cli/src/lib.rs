pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use capquote_core::domain::price_table::ItemType;
use clap::{Parser, Subcommand};

use crate::commands::quote::QuoteArgs;

#[derive(Debug, Parser)]
#[command(
    name = "capquote",
    about = "Capquote pricing CLI",
    long_about = "Price cap orders against quantity-tiered tables and operate the price table store.",
    after_help = "Examples:\n  capquote quote --quantity 150 --fabric Polyester --logo \"Laser Cut:Large\"\n  capquote tables list --item-type logo\n  capquote doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Emit diagnostic logs to stderr")]
    pub verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price one order and print the estimate as JSON")]
    Quote(QuoteArgs),
    #[command(about = "Inspect or export the configured price tables")]
    Tables {
        #[command(subcommand)]
        action: TablesAction,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Write the built-in (or a TOML file's) price tables into the database")]
    Seed {
        #[arg(long, help = "TOML price table document to load instead of the built-in tables")]
        from: Option<PathBuf>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, and price table readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum TablesAction {
    #[command(about = "Summarise every table, optionally for one item type")]
    List {
        #[arg(long, help = "product | logo | fabric | closure | accessory | delivery")]
        item_type: Option<ItemType>,
    },
    #[command(about = "Render the loaded tables as a TOML document")]
    Export {
        #[arg(long, help = "Write to this path instead of stdout")]
        output: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    if cli.verbose {
        init_logging();
    }

    let result = match cli.command {
        Command::Quote(args) => commands::quote::run(args),
        Command::Tables { action: TablesAction::List { item_type } } => {
            commands::tables::list(item_type)
        }
        Command::Tables { action: TablesAction::Export { output } } => {
            commands::tables::export(output)
        }
        Command::Migrate => commands::migrate::run(),
        Command::Seed { from } => commands::seed::run(from),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON document.
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
