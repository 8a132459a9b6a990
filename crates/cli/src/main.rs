// boq - combine Bills of Quantities into a formula-driven spreadsheet

mod boq_ops;
mod combine;
mod exit_codes;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use boqsheet_config::Settings;
use boqsheet_engine::BoqError;
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "boq")]
#[command(about = "Combine Bills of Quantities into one formula-driven XLSX sheet")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Verbose logging to stderr (same as BOQ_LOG=debug)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine BoQ files into one spreadsheet
    #[command(after_help = "\
Examples:
  boq combine site-a.json site-b.json -o combined.xlsx
  boq combine *.json -o smeta.xlsx --sheet-name Smeta --title 'Combined BoQ'
  boq combine a.json b.json -o out.xlsx --json")]
    Combine {
        /// BoQ files, in column order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file (default: combined.xlsx in output.directory or cwd)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Worksheet name
        #[arg(long)]
        sheet_name: Option<String>,

        /// Title line above the header row
        #[arg(long)]
        title: Option<String>,

        /// Settings file (default: <config dir>/boqsheet/settings.json)
        #[arg(long, env = "BOQ_CONFIG")]
        config: Option<PathBuf>,

        /// Print the combine report as JSON
        #[arg(long)]
        json: bool,

        /// Suppress the summary and conflict warnings
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Check that BoQ files load
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// List the items of a BoQ with line and document totals
    Show {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Create an empty BoQ file
    New {
        /// BoQ name (becomes the column header when combined)
        name: String,

        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Add a product to a BoQ (quantities of an existing product are summed)
    #[command(group(ArgGroup::new("source").required(true).args(["name", "catalog"])))]
    #[command(after_help = "\
Examples:
  boq add site-a.json --id 17 --name 'Cable 3x2.5' --qty 120 --unit m --price 1.2
  boq add site-a.json --id 17 --qty 40 --catalog products.json")]
    Add {
        file: PathBuf,

        #[arg(long)]
        id: String,

        #[arg(long)]
        qty: f64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, conflicts_with = "catalog")]
        unit: Option<String>,

        #[arg(long, conflicts_with = "catalog")]
        price: Option<f64>,

        #[arg(long, conflicts_with = "catalog")]
        category: Option<String>,

        /// Take the snapshot from a catalog file (JSON array of products)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Remove a product from a BoQ
    Remove {
        file: PathBuf,

        #[arg(long)]
        id: String,
    },

    /// Set the quantity of a product already in a BoQ
    SetQty {
        file: PathBuf,

        #[arg(long)]
        id: String,

        #[arg(long)]
        qty: f64,
    },

    /// Move a product one position up or down
    #[command(group(ArgGroup::new("direction").required(true).args(["up", "down"])))]
    Move {
        file: PathBuf,

        #[arg(long)]
        id: String,

        #[arg(long)]
        up: bool,

        #[arg(long)]
        down: bool,
    },

    /// Re-snapshot names, units and prices from a catalog
    Refresh {
        file: PathBuf,

        #[arg(long)]
        catalog: PathBuf,

        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Settings file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the settings file location
    Path,
    /// Write a settings file with every default filled in
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  boqsheet-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("BOQ_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show usage
            eprintln!("Usage: boq <command> [options]");
            eprintln!("       boq --help for more information");
            Ok(())
        }
        Some(Commands::Combine { files, output, sheet_name, title, config, json, quiet }) => {
            combine::cmd_combine(files, output, sheet_name, title, config, json, quiet)
        }
        Some(Commands::Validate { files, json }) => boq_ops::cmd_validate(files, json),
        Some(Commands::Show { file, json }) => boq_ops::cmd_show(file, json),
        Some(Commands::New { name, output, force }) => boq_ops::cmd_new(name, output, force),
        Some(Commands::Add { file, id, qty, name, unit, price, category, catalog }) => {
            match (catalog, name) {
                (Some(path), _) => boq_ops::cmd_add(file, id, qty, boq_ops::AddSource::Catalog(path)),
                (None, Some(name)) => boq_ops::cmd_add(
                    file,
                    id,
                    qty,
                    boq_ops::AddSource::Manual { name, unit, price, category },
                ),
                (None, None) => Err(CliError::args("either --name or --catalog is required")),
            }
        }
        Some(Commands::Remove { file, id }) => boq_ops::cmd_remove(file, id),
        Some(Commands::SetQty { file, id, qty }) => boq_ops::cmd_set_qty(file, id, qty),
        Some(Commands::Move { file, id, up, down: _ }) => boq_ops::cmd_move(file, id, up),
        Some(Commands::Refresh { file, catalog, quiet }) => boq_ops::cmd_refresh(file, catalog, quiet),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => {
                println!("{}", Settings::config_path().display());
                Ok(())
            }
            ConfigCommands::Init { force } => cmd_config_init(force),
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn cmd_config_init(force: bool) -> Result<(), CliError> {
    let path = Settings::config_path();
    if path.exists() && !force {
        return Err(CliError::args(format!("{} already exists", path.display()))
            .with_hint("pass --force to overwrite"));
    }
    Settings::default().save().map_err(CliError::io)?;
    println!("{}", path.display());
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<BoqError> for CliError {
    fn from(err: BoqError) -> Self {
        let hint = match &err {
            BoqError::EmptyInput => Some("pass one or more BoQ .json files".to_string()),
            BoqError::MalformedDocument { .. } => {
                Some("`boq validate <FILES>...` checks every file at once".to_string())
            }
            BoqError::EmptyMatrix => Some("add items to at least one BoQ first".to_string()),
            BoqError::Write { .. } => {
                Some("check that the destination directory exists and is writable".to_string())
            }
            BoqError::UnknownProduct(_) => Some("check the id against the catalog file".to_string()),
            BoqError::MissingItem(_) => Some("`boq show <FILE>` lists the ids in a BoQ".to_string()),
            BoqError::InvalidPrice(_) => Some("omit --price for a product without a price".to_string()),
            _ => None,
        };
        Self { code: exit_code(&err), message: err.to_string(), hint }
    }
}
