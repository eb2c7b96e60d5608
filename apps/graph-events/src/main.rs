mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use graph_auth::{HostContext, StaticTokenSource};
use graph_client::{AccessPointCell, EventsQuery};
use serde::Serialize;

use crate::config::AppConfig;

/// Environment variable holding the bearer token.
const TOKEN_ENV: &str = "GRAPH_ACCESS_TOKEN";

/// Graph calendar events - read the signed-in user's profile and events
#[derive(Parser)]
#[command(name = "graph-events")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host context (session) name the token belongs to
    #[arg(long, default_value = "default")]
    context: String,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the signed-in user
    Me,
    /// List calendar events
    Events {
        /// Page size requested from Graph
        #[arg(long)]
        top: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = cli.config.as_deref()
        && !path.is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    let config = AppConfig::load(cli.config.as_deref())?;
    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    logging::init(&config.logging, cli.verbose)?;

    let tokens = Arc::new(StaticTokenSource::from_env(TOKEN_ENV));
    let cell = AccessPointCell::new(config.client, tokens);
    let host = Arc::new(HostContext::new(cli.context));
    let client = cell.get_instance(&host).client()?;

    tracing::info!(context = host.id(), base_url = %client.base_url(), "graph-events starting");

    match cli.command.unwrap_or(Commands::Events { top: None }) {
        Commands::Me => print_json(&client.me().await?),
        Commands::Events { top } => {
            let query = EventsQuery {
                top,
                ..EventsQuery::default()
            };
            let events = client.list_events(&query).await?;
            tracing::info!(count = events.len(), "events fetched");
            print_json(&events)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
