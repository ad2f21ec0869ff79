//! Tabys CLI - operator tool for the Tabys admin bot.
//!
//! ```bash
//! tabys check-config
//! tabys permissions npo
//! tabys session show 123456789
//! tabys rate-limit reset 123456789 login
//! ```
//!
//! See `tabys --help` for all available commands and options.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tabys", about = "Tabys admin bot operator tool", version)]
struct Cli {
    /// Config file; missing files fall back to defaults and TABYS_* variables
    #[arg(long, short, global = true, default_value = "tabys.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration
    CheckConfig,

    /// Print the permission table for a role
    Permissions {
        /// Role name, e.g. `npo` or `super_admin`
        role: String,
    },

    /// Inspect or revoke stored sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage rate-limit counters
    RateLimit {
        #[command(subcommand)]
        action: RateLimitAction,
    },

    /// Check that Redis and the backend are reachable
    Probe,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show the session of an identity
    Show { user: String },

    /// Delete the session of an identity
    Revoke {
        user: String,

        /// Also tell the backend the identity logged out
        #[arg(long)]
        notify_backend: bool,
    },
}

#[derive(Subcommand)]
enum RateLimitAction {
    /// Clear the counter of one action, e.g. `login` or `general`
    Reset { user: String, action: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::CheckConfig => commands::config::run(&cli.config),
        Commands::Permissions { role } => {
            print!("{}", commands::permissions::render(&role.into()));
            Ok(())
        }
        Commands::Session { action: SessionAction::Show { user } } => {
            commands::session::show(&cli.config, &user).await
        }
        Commands::Session { action: SessionAction::Revoke { user, notify_backend } } => {
            commands::session::revoke(&cli.config, &user, notify_backend).await
        }
        Commands::RateLimit { action: RateLimitAction::Reset { user, action } } => {
            commands::rate_limit::reset(&cli.config, &user, &action).await
        }
        Commands::Probe => commands::probe::run(&cli.config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
