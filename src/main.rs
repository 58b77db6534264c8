//! `Vibra` CLI - serve the resolution API or resolve songs from the shell

mod cmd;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cmd::{cmd_providers, cmd_resolve, cmd_search, cmd_serve};

#[derive(Parser)]
#[command(name = "vibra")]
#[command(about = "Resolve songs to audio streams across interchangeable backends")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (default: ~/.config/vibra/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and streaming proxy
    Serve {
        /// Address to listen on (overrides config and PORT)
        #[arg(short, long)]
        listen: Option<SocketAddr>,

        /// Bytes fetched ahead of the continuation request
        #[arg(long)]
        prefix_bytes: Option<u64>,
    },

    /// Resolve a query or video id to an audio URL (prints JSON)
    Resolve {
        /// Free-text song query
        #[arg(short, long, required_unless_present = "video_id")]
        query: Option<String>,

        /// Known video id (wins over --query)
        #[arg(long)]
        video_id: Option<String>,

        /// Also list up to this many candidates
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Search for playable candidates
    Search {
        /// Free-text song query
        query: String,

        /// Maximum number of candidates
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// List provider pools in priority order
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v; logs go to stderr so stdout stays parseable
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = vibra::Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { listen, prefix_bytes } => {
            cmd_serve(config, listen, prefix_bytes).await?;
        }
        Commands::Resolve { query, video_id, limit } => {
            cmd_resolve(&config, query, video_id, limit).await?;
        }
        Commands::Search { query, limit } => {
            cmd_search(&config, &query, limit).await?;
        }
        Commands::Providers => {
            cmd_providers(&config);
        }
    }

    Ok(())
}
