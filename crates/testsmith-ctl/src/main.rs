//! testsmith: deterministic API test-case generation from OpenAPI documents.
//!
//! Reads an OpenAPI document and a test policy, prints or writes the
//! generated test cases, and can emit runnable pytest modules.

mod cli_config;
mod commands;
mod emit;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "testsmith")]
#[command(about = "Generate API test cases from OpenAPI documents", long_about = None)]
#[command(version, styles = output::clap_styles())]
struct Cli {
    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate test cases for every operation in an OpenAPI document
    Generate(GenerateArgs),

    /// List the operations of an OpenAPI document with their components
    Catalog(CatalogArgs),

    /// Inspect and validate test policies
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },

    /// Check externally written test plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Debug, Args)]
pub(crate) struct GenerateArgs {
    /// OpenAPI document (JSON or YAML)
    pub spec: PathBuf,

    /// Test policy file (JSON, TOML, or YAML). Default: built-in policy
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Profile applied on top of the policy for this run
    #[arg(long)]
    pub profile: Option<String>,

    /// Enrich test cases through the configured text generator
    #[arg(long)]
    pub ai: bool,

    /// Print the full run as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Also write the full run as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit pytest modules into this directory
    #[arg(long)]
    pub pytest_dir: Option<PathBuf>,

    /// Test plan whose notes enrich workflow, performance, reliability, scalability, and security cases
    #[arg(long)]
    pub plan: Option<PathBuf>,

    /// Synthesis worker threads
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Debug, Args)]
pub(crate) struct CatalogArgs {
    /// OpenAPI document (JSON or YAML)
    pub spec: PathBuf,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum PolicyCommands {
    /// Show enabled categories and available profiles
    Show {
        /// Test policy file. Default: built-in policy
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Show the policy as it would be with this profile applied
        #[arg(long)]
        profile: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a policy file and report configuration errors
    Validate {
        /// Test policy file
        policy: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum PlanCommands {
    /// Check a test plan's shape and list the insights found in it
    Validate {
        /// Test plan file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "testsmith=debug"
    } else {
        "testsmith=info"
    };
    let filter = EnvFilter::from_default_env().add_directive(
        directive
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli_config::load_cli_config() {
        Ok(config) => run(cli.command, &config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        output::error(format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &cli_config::CliConfig) -> anyhow::Result<()> {
    match command {
        Commands::Generate(args) => commands::handle_generate_command(args, config).await,
        Commands::Catalog(args) => commands::handle_catalog_command(args),
        Commands::Policy { command } => commands::handle_policy_command(command, config).await,
        Commands::Plan { command } => commands::handle_plan_command(command),
    }
}
