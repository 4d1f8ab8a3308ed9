//! Insurance Portal CLI
//!
//! Command-line front end for the insurance application portal.
//!
//! # Usage
//!
//! ```bash
//! portal forms list
//! portal forms show health_insurance_application
//! portal apply --form health_insurance_application --set age=25 --set country=USA
//! portal apply --interactive
//! portal applications --sort Age:desc --filter home --page 2
//! ```

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "portal")]
#[command(version)]
#[command(about = "Insurance Portal Command Line Interface", long_about = None)]
struct Cli {
    /// Form service base URL
    #[arg(long, env = "PORTAL_API_URL")]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "PORTAL_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Output format
    #[arg(long, short)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse application forms
    Forms {
        #[command(subcommand)]
        action: FormCommands,
    },
    /// Fill in and submit an application
    Apply(ApplyArgs),
    /// List submitted applications
    Applications(ApplicationsArgs),
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum FormCommands {
    /// List available forms
    List,
    /// Show the fields of a form (first form if omitted)
    Show { form_id: Option<String> },
    /// Report schema problems in a form (first form if omitted)
    Check { form_id: Option<String> },
}

#[derive(Args)]
struct ApplyArgs {
    /// Form to fill in (first form if omitted)
    #[arg(long)]
    form: Option<String>,

    /// Field value as FIELD_ID=VALUE; checkbox values are comma separated
    #[arg(long = "set", value_name = "FIELD_ID=VALUE")]
    set: Vec<String>,

    /// YAML or JSON file mapping field ids to values
    #[arg(long)]
    values: Option<std::path::PathBuf>,

    /// Prompt for each visible field
    #[arg(long, short)]
    interactive: bool,

    /// Validate and print the payload without submitting
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct ApplicationsArgs {
    /// Sort column, optionally suffixed with :asc or :desc
    #[arg(long, value_name = "COLUMN[:DIR]")]
    sort: Option<String>,

    /// Show only rows containing this text
    #[arg(long)]
    filter: Option<String>,

    /// Hide a column
    #[arg(long)]
    hide: Vec<String>,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Rows per page
    #[arg(long)]
    page_size: Option<usize>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::failure(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // config commands must work even when the saved settings are broken
    let command = match cli.command {
        Commands::Config { action } => return commands::config::handle(action, cli.profile.as_deref()),
        command => command,
    };

    let config = config::Config::load(cli.profile.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config not readable, using defaults");
        config::Config::default()
    });
    let ctx = commands::Context::new(&config, cli.api_url, cli.timeout_secs, cli.format)?;

    match command {
        Commands::Forms { action } => commands::forms::handle(action, &ctx).await,
        Commands::Apply(args) => commands::apply::handle(args, &ctx).await,
        Commands::Applications(args) => commands::applications::handle(args, &ctx).await,
        Commands::Config { action } => commands::config::handle(action, cli.profile.as_deref()),
    }
}
