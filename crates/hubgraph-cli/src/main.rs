//! HubGraph CLI - Command-line interface for HubGraph
//!
//! `hubgraph serve` polls the GitHub events feed and serves the resulting
//! graph to the visualizer; `hubgraph status` inspects a running instance.

use clap::{Parser, Subcommand};
use colored::Colorize;
use hubgraph_feed::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use hubgraph_scheduler::{DEFAULT_PAGES, MAX_REFRESH_INTERVAL_SECS};
use hubgraph_server::DEFAULT_PORT;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod progress;

#[derive(Parser)]
#[command(name = "hubgraph")]
#[command(author = "HubGraph Contributors")]
#[command(version)]
#[command(about = "Live graph of public GitHub activity", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the events feed and serve the graph
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Feed pages fetched per refresh
        #[arg(long, default_value_t = DEFAULT_PAGES, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,

        /// Seconds between refreshes (0 derives it from the API)
        #[arg(
            short,
            long,
            default_value_t = 0,
            value_parser = clap::value_parser!(u64).range(..=MAX_REFRESH_INTERVAL_SECS)
        )]
        delay: u64,

        /// GitHub token for the authenticated quota
        #[arg(long, env = "HUBGRAPH_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Headless mode: bind to 0.0.0.0 for remote access
        #[arg(long)]
        headless: bool,

        /// API root the feed is read from
        #[arg(long, default_value = DEFAULT_API_URL)]
        api_url: String,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,

        /// Also push live updates over WebSocket on this port
        #[arg(long)]
        sync_port: Option<u16>,

        /// Recompute the refresh interval from the API after every cycle
        #[arg(long)]
        adaptive_interval: bool,
    },

    /// Show the state of a running instance
    Status {
        /// Base URL of the instance
        #[arg(long, default_value = "http://localhost:3000")]
        url: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let result = match cli.command {
        Commands::Serve {
            port,
            pages,
            delay,
            token,
            headless,
            api_url,
            timeout,
            sync_port,
            adaptive_interval,
        } => {
            commands::serve(commands::ServeArgs {
                port,
                pages,
                delay,
                token,
                headless,
                api_url,
                timeout,
                sync_port,
                adaptive_interval,
            })
            .await
        }
        Commands::Status { url } => commands::status(&url).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["hubgraph", "serve"]).unwrap();
        match cli.command {
            Commands::Serve {
                port,
                pages,
                delay,
                headless,
                timeout,
                sync_port,
                adaptive_interval,
                ..
            } => {
                assert_eq!(port, 3000);
                assert_eq!(pages, 3);
                assert_eq!(delay, 0);
                assert!(!headless);
                assert_eq!(timeout, 30);
                assert_eq!(sync_port, None);
                assert!(!adaptive_interval);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_zero_pages_rejected() {
        assert!(Cli::try_parse_from(["hubgraph", "serve", "--pages", "0"]).is_err());
    }

    #[test]
    fn test_delay_beyond_a_week_rejected() {
        let week = MAX_REFRESH_INTERVAL_SECS.to_string();
        assert!(Cli::try_parse_from(["hubgraph", "serve", "--delay", week.as_str()]).is_ok());

        let over = (MAX_REFRESH_INTERVAL_SECS + 1).to_string();
        assert!(Cli::try_parse_from(["hubgraph", "serve", "--delay", over.as_str()]).is_err());
        assert!(Cli::try_parse_from(["hubgraph", "serve", "-d", "18446744073709551615"]).is_err());
    }

    #[test]
    fn test_status_url() {
        let cli =
            Cli::try_parse_from(["hubgraph", "status", "--url", "http://box:8080"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { url } if url == "http://box:8080"));
    }
}
