//! spectag - Keep consensus-spec excerpts in source comments up to date
//!
//! spectag finds `<spec ...>` tags in comments, resolves them against a
//! local knowledge base of specification snapshots, and rewrites their
//! bodies in place.

use eyre::{Result, WrapErr};
use facet_args as args;
use owo_colors::OwoColorize;
use spectag::commands::{self, ProcessOptions, Project};
use spectag::output::{OutputFormat, render_forks, render_history, render_process};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "SPECTAG_LOG";

/// CLI arguments
#[derive(Debug, facet::Facet)]
struct Args {
    /// Subcommand to run (default: process)
    #[facet(args::subcommand)]
    command: Option<Command>,

    /// Path to config file (default: <root>/.spectag.yml)
    #[facet(args::named, args::short = 'c', default)]
    config: Option<PathBuf>,

    /// Project root (default: current directory)
    #[facet(args::named, args::short = 'r', default)]
    root: Option<PathBuf>,
}

/// Subcommands
#[derive(Debug, facet::Facet)]
#[repr(u8)]
enum Command {
    /// Resolve every spec tag and rewrite its body
    Process {
        /// Files or directories to process (default: the whole project)
        #[facet(args::positional, default)]
        paths: Vec<PathBuf>,

        /// Don't write anything, exit 1 if a file would change
        #[facet(args::named, default)]
        check: bool,

        /// Output format: text, json
        #[facet(args::named, args::short = 'f', default)]
        format: Option<String>,
    },

    /// List every item with the forks that introduced or changed it
    History {
        /// Preset to list (default: mainnet)
        #[facet(args::named, args::short = 'p', default)]
        preset: Option<String>,

        /// Only list items whose name contains this string
        #[facet(args::named, args::short = 's', default)]
        search: Option<String>,

        /// Output format: text, json
        #[facet(args::named, args::short = 'f', default)]
        format: Option<String>,
    },

    /// List the configured fork order
    Forks {
        /// Output format: text, json
        #[facet(args::named, args::short = 'f', default)]
        format: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Args =
        facet_args::from_std_args().wrap_err("Failed to parse command line arguments")?;

    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir().wrap_err("Failed to get current directory")?,
    };
    let project = Project::open(root, args.config.as_deref())?;

    let command = args.command.unwrap_or(Command::Process {
        paths: Vec::new(),
        check: false,
        format: None,
    });

    match command {
        Command::Process {
            paths,
            check,
            format,
        } => run_process(&project, paths, check, format),
        Command::History {
            preset,
            search,
            format,
        } => {
            let format = OutputFormat::parse(format.as_deref())?;
            let listing = commands::history(&project, preset.as_deref(), search.as_deref())?;
            print!("{}", render_history(&listing, format)?);
            Ok(())
        }
        Command::Forks { format } => {
            let format = OutputFormat::parse(format.as_deref())?;
            print!("{}", render_forks(&commands::forks(&project), format)?);
            Ok(())
        }
    }
}

fn run_process(
    project: &Project,
    paths: Vec<PathBuf>,
    check: bool,
    format: Option<String>,
) -> Result<()> {
    let format = OutputFormat::parse(format.as_deref())?;

    if format == OutputFormat::Text {
        eprintln!(
            "{} Processing spec tags in {}...",
            "->".blue().bold(),
            project.root.display()
        );
    }

    let outcome = commands::process(project, &ProcessOptions { paths, check })?;
    print!("{}", render_process(&outcome, format)?);

    if !outcome.is_passing() {
        std::process::exit(1);
    }
    Ok(())
}
