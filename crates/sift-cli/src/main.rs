use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sift_cli::{commands, render, Format};
use sift_locator::LocatorError;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sift", version, about = "Query JSON and YAML records with locators")]
struct Cli {
    /// Schema describing the records
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Engine settings overriding the schema's `settings:` block
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Format::Text)]
    output: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print one page of matching records
    Find {
        /// Records file (.json, .yaml or .yml)
        #[arg(long)]
        items: PathBuf,
        /// Locator, e.g. "status:failure,count:10"; empty matches everything
        #[arg(default_value = "")]
        locator: String,
    },
    /// Print the single record a locator matches
    Get {
        /// Records file (.json, .yaml or .yml)
        #[arg(long)]
        items: PathBuf,
        locator: String,
    },
    /// List the supported dimensions
    Describe,
    /// Show how a locator splits into dimensions
    Parse { locator: String },
}

fn init_tracing() {
    let env = std::env::var("SIFT_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter = EnvFilter::from_str(&env).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn schema_path(cli: &Cli) -> Result<&Path> {
    cli.schema
        .as_deref()
        .context("--schema is required for this command")
}

fn run(cli: &Cli) -> Result<()> {
    let mut out = io::stdout().lock();
    match &cli.command {
        Commands::Find { items, locator } => {
            let finder = sift_cli::load_finder(schema_path(cli)?, items, cli.settings.as_deref())?;
            let report = commands::find(&finder, locator)?;
            render(&report, cli.output, &mut out)?;
            if cli.output == Format::Text {
                eprintln!("{}", report.summary());
            }
        }
        Commands::Get { items, locator } => {
            let finder = sift_cli::load_finder(schema_path(cli)?, items, cli.settings.as_deref())?;
            let record = commands::get(&finder, locator)?;
            render(&record, cli.output, &mut out)?;
        }
        Commands::Describe => {
            let finder = sift_cli::load_schema_finder(schema_path(cli)?)?;
            let infos = commands::describe(&finder);
            render(infos.as_slice(), cli.output, &mut out)?;
        }
        Commands::Parse { locator } => {
            let view = commands::parse(locator)?;
            render(&view, cli.output, &mut out)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if err.downcast_ref::<LocatorError>().is_some() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
