//! CLI entry and dispatch.

use std::fmt;

use anyhow::{Context, Result};
use clap::Parser;
use medxz_core::logging;

mod commands;

#[derive(Parser)]
#[command(name = "medxz")]
#[command(version)]
#[command(about = "Sign in to a medxz server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server URL for this run (default: the saved one)
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Verify the stored session
    Status,

    /// Sign in and remember the server and organization
    Login {
        /// Organization code (default: the saved one)
        #[arg(long, value_name = "CODE")]
        org: Option<String>,

        #[arg(long)]
        email: String,

        #[arg(long, env = "MEDXZ_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out of the current session
    Logout,

    /// Forget the saved organization code
    ChangeOrg,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the config file path
    Path,
    /// Print the saved settings
    Show,
}

/// Failure already shown to the user; exit non-zero without repeating it.
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("command failed")
    }
}

impl std::error::Error for Reported {}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, server } = cli;
    tracing::debug!(server = ?server, "dispatching command");

    match command {
        Commands::Status => commands::auth::status(server).await,
        Commands::Login {
            org,
            email,
            password,
        } => commands::auth::login(server, org, email, password).await,
        Commands::Logout => commands::auth::logout(server).await,
        Commands::ChangeOrg => commands::auth::change_org(server).await,
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Show => commands::config::show(server.as_deref()),
        },
    }
}
