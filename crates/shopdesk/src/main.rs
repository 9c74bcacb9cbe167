// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shopdesk - chat assistant backend for an e-commerce analytics dashboard.
//!
//! This is the binary entry point.

mod app;
mod commands;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shopdesk_config::ShopdeskConfig;

/// Shopdesk - chat assistant backend for an e-commerce analytics dashboard.
#[derive(Parser, Debug)]
#[command(name = "shopdesk", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the standard search path.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the chat API over HTTP.
    Serve,
    /// Ask one question and print the answer.
    Ask {
        query: String,
        #[arg(long, default_value = "cli")]
        user: String,
        #[arg(long)]
        session: Option<String>,
        /// Comma-separated permissions granted to the asking user.
        #[arg(long, value_delimiter = ',', default_value = "read")]
        permissions: Vec<String>,
        /// Print every pipeline event as a JSON line.
        #[arg(long)]
        json: bool,
    },
    /// Show a user's current rate limit consumption.
    Usage {
        #[arg(long, default_value = "cli")]
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// Clear a user's rate limit counters.
    ResetLimits {
        #[arg(long)]
        user: String,
    },
    /// Summarize query volume and latency.
    Analytics {
        #[arg(long, default_value_t = 7)]
        days: u32,
        #[arg(long)]
        json: bool,
    },
    /// Probe every backend.
    Health {
        #[arg(long)]
        json: bool,
    },
    /// Create the database and run migrations.
    InitDb,
}

fn load_config(path: Option<&PathBuf>) -> ShopdeskConfig {
    let loaded = match path {
        Some(path) => shopdesk_config::load_and_validate_path(path),
        None => shopdesk_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            shopdesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` overrides the configured level. Logs go to stderr so command
/// output on stdout stays clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shopdesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());
    init_tracing(&config.server.log_level);

    let outcome = match cli.command {
        Commands::Serve => serve::run_serve(config).await.map(|()| true),
        Commands::Ask {
            query,
            user,
            session,
            permissions,
            json,
        } => {
            commands::run_ask(
                &config,
                commands::AskArgs {
                    query: &query,
                    user: &user,
                    session: session.as_deref(),
                    permissions: &permissions,
                    json,
                },
            )
            .await
        }
        Commands::Usage { user, json } => {
            commands::run_usage(&config, &user, json).await.map(|()| true)
        }
        Commands::ResetLimits { user } => {
            commands::run_reset_limits(&config, &user).await.map(|()| true)
        }
        Commands::Analytics { days, json } => {
            commands::run_analytics(&config, days, json).await.map(|()| true)
        }
        Commands::Health { json } => commands::run_health(&config, json).await,
        Commands::InitDb => commands::run_init_db(&config).await.map(|()| true),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
