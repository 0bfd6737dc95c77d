use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod auth;
mod categorize_cmd;
mod config;
mod progress;
mod report_cmd;
mod rules_cmd;
mod sheets_cmd;
mod state;

use rules_cmd::RulesCommand;
use sheets_cmd::SheetsCommand;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Categorize bank and card statements with rules and AI")]
struct Cli {
    /// Log progress at info level (RUST_LOG overrides)
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write ~/.tally/config.toml with defaults
    Init,

    /// Store credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Manage sheets
    Sheets {
        #[command(subcommand)]
        command: SheetsCommand,
    },

    /// Import a CSV statement into a sheet and categorize the new transactions
    Import {
        csv: PathBuf,

        #[arg(long)]
        sheet: String,

        /// Rules and keyword categories only
        #[arg(long, default_value_t = false)]
        no_ai: bool,
    },

    /// Categorize every transaction in a sheet again
    Recategorize {
        #[arg(long)]
        sheet: String,

        /// Send every transaction to the model, ignoring rules
        #[arg(long, default_value_t = false)]
        ai_only: bool,
    },

    /// Set one transaction's category by hand
    SetCategory {
        #[arg(long)]
        sheet: String,

        /// Transaction id
        id: String,

        category: String,

        #[arg(long)]
        subcategory: Option<String>,
    },

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },

    /// Income, expenses and spending by category
    Summary {
        #[arg(long)]
        sheet: String,

        /// Break one category down by subcategory
        #[arg(long)]
        category: Option<String>,
    },

    /// Monthly spending per category, with averages
    Trends {
        #[arg(long)]
        sheet: String,
    },

    /// Ask the model for spending insights
    Insights {
        #[arg(long)]
        sheet: String,
    },

    /// Write a sheet's transactions to CSV
    Export {
        #[arg(long)]
        sheet: String,

        file: PathBuf,
    },

    /// Show the AI activity log
    Activity {
        #[arg(long, default_value_t = false)]
        clear: bool,

        /// Print each entry's structured details
        #[arg(long, default_value_t = false)]
        details: bool,
    },
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Save an Anthropic API key to ~/.tally/auth.json
    PasteAnthropicKey,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config()?;
    let store = state::open_store()?;

    match cli.command {
        Command::Init => config::init_config()?,

        Command::Auth { command } => match command {
            AuthCommand::PasteAnthropicKey => auth::anthropic_paste_key()?,
        },

        Command::Sheets { command } => sheets_cmd::run(&store, command)?,

        Command::Import { csv, sheet, no_ai } => {
            categorize_cmd::import(&store, &cfg, &csv, &sheet, no_ai).await?
        }

        Command::Recategorize { sheet, ai_only } => {
            categorize_cmd::recategorize(&store, &cfg, &sheet, ai_only).await?
        }

        Command::SetCategory {
            sheet,
            id,
            category,
            subcategory,
        } => {
            let subcategory = subcategory.as_deref();
            categorize_cmd::set_category_cmd(&store, &sheet, &id, &category, subcategory)?
        }

        Command::Rules { command } => rules_cmd::run(&store, &cfg, command).await?,

        Command::Summary { sheet, category } => {
            report_cmd::summary(&store, &sheet, category.as_deref())?
        }

        Command::Trends { sheet } => report_cmd::trends(&store, &sheet)?,

        Command::Insights { sheet } => report_cmd::insights(&store, &cfg, &sheet).await?,

        Command::Export { sheet, file } => sheets_cmd::export_sheet(&store, &sheet, &file)?,

        Command::Activity { clear, details } => report_cmd::activity(&store, clear, details)?,
    }

    Ok(())
}
