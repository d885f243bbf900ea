//! CLI command implementations.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use colored::Colorize;
use hubgraph_core::timestamp::seconds_until_refresh;
use hubgraph_feed::{EventSource, FeedConfig};
use hubgraph_graph::{GraphLink, GraphNode, SnapshotPublisher};
use hubgraph_scheduler::{RefreshScheduler, SchedulerConfig, BOOTSTRAP_INTERVAL};
use hubgraph_server::{HubServer, ServerConfig, SyncServer, SyncServerConfig, HUBDATA_PATH};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::progress;

/// Options for `hubgraph serve`.
pub struct ServeArgs {
    pub port: u16,
    pub pages: u32,
    pub delay: u64,
    pub token: Option<String>,
    pub headless: bool,
    pub api_url: String,
    pub timeout: u64,
    pub sync_port: Option<u16>,
    pub adaptive_interval: bool,
}

/// Polls the feed and serves the graph until Ctrl+C.
pub async fn serve(args: ServeArgs) -> Result<()> {
    let feed_config = FeedConfig {
        api_url: args.api_url,
        timeout: Duration::from_secs(args.timeout),
        ..FeedConfig::default()
    }
    .with_token(args.token);
    let source = EventSource::connect(feed_config).context("invalid feed configuration")?;
    let authenticated = source.is_authenticated();

    let scheduler_config = SchedulerConfig {
        pages: args.pages,
        adaptive_interval: args.adaptive_interval,
        ..SchedulerConfig::default()
    }
    .with_delay_secs(args.delay);

    let publisher = SnapshotPublisher::shared();
    let spinner = progress::spinner()?;
    let scheduler = RefreshScheduler::new(source, publisher.clone(), scheduler_config)?
        .with_progress(progress::render_to(spinner.clone()));

    let server_config = if args.headless {
        ServerConfig::public(args.port)
    } else {
        ServerConfig::local(args.port)
    };
    let server = HubServer::new(publisher.clone(), server_config);
    // Bind before polling so a busy port fails fast.
    let listener = server.bind().await?;

    let sync = match args.sync_port {
        Some(port) => {
            let ip = if args.headless {
                Ipv4Addr::UNSPECIFIED
            } else {
                Ipv4Addr::LOCALHOST
            };
            let sync = SyncServer::new(
                publisher.clone(),
                SyncServerConfig {
                    addr: SocketAddr::from((ip, port)),
                },
            );
            let listener = sync.bind().await?;
            Some((sync, listener))
        }
        None => None,
    };

    spinner.println(format!(
        "{} Serving http://localhost:{}{}",
        "✓".green(),
        args.port,
        HUBDATA_PATH
    ));
    if args.headless {
        spinner.println("  Headless mode: accepting connections from any host");
    }
    if let Some(port) = args.sync_port {
        spinner.println(format!("{} Live updates on ws://localhost:{}", "✓".green(), port));
    }
    if !authenticated {
        spinner.println(format!(
            "  {} unauthenticated quota is 60 requests/hour; set {} for more",
            "note:".yellow(),
            "HUBGRAPH_TOKEN".cyan()
        ));
    }
    spinner.println(format!("  Press {} to stop", "Ctrl+C".cyan()));

    let cancel = CancellationToken::new();

    let mut http = tokio::spawn({
        let cancel = cancel.clone();
        async move { server.serve(listener, cancel).await }
    });
    let sync = sync.map(|(sync, listener)| {
        let cancel = cancel.clone();
        tokio::spawn(async move { sync.serve(listener, cancel).await })
    });
    let refresh = scheduler.spawn(cancel.clone());

    let http_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("Shutdown requested");
            cancel.cancel();
            http.await?
        }
        result = &mut http => {
            cancel.cancel();
            result?
        }
    };

    refresh.await?;
    if let Some(sync) = sync {
        sync.await??;
    }
    spinner.finish_and_clear();
    http_result?;

    Ok(())
}

/// The parts of `/hubdata.json` the status command reads.
///
/// `lastUpdate` stays a string so an unparsable timestamp is reported
/// instead of failing the whole command.
#[derive(Debug, Deserialize)]
struct HubData {
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,
    #[serde(rename = "requestsUsed")]
    requests_used: u32,
    #[serde(rename = "maxRequests")]
    max_requests: u32,
    #[serde(rename = "lastUpdate")]
    last_update: String,
    #[serde(rename = "refreshInterval")]
    refresh_interval: i64,
}

/// Shows the state of a running instance.
pub async fn status(url: &str) -> Result<()> {
    let endpoint = format!("{}{}", url.trim_end_matches('/'), HUBDATA_PATH);

    let response = reqwest::get(&endpoint)
        .await
        .with_context(|| format!("failed to reach {}", endpoint))?;
    if !response.status().is_success() {
        bail!("{} answered {}", endpoint, response.status());
    }
    let data: HubData = response
        .json()
        .await
        .with_context(|| format!("{} did not return a graph snapshot", endpoint))?;

    let repos = data.nodes.iter().filter(|n| n.is_repo()).count();

    println!("{}", "HubGraph Status".cyan().bold());
    println!();
    println!(
        "  {} {} ({} repositories, {} events)",
        "Nodes:".dimmed(),
        data.nodes.len(),
        repos,
        data.nodes.len() - repos
    );
    println!("  {} {}", "Links:".dimmed(), data.links.len());
    println!(
        "  {} {}/{} req/hr used",
        "Quota:".dimmed(),
        data.requests_used,
        data.max_requests
    );
    println!(
        "  {} {}",
        "Last update:".dimmed(),
        if data.last_update.is_empty() {
            "never"
        } else {
            data.last_update.as_str()
        }
    );
    println!(
        "  {} {}",
        "Next refresh:".dimmed(),
        next_refresh(&data.last_update, data.refresh_interval, &Utc::now())
    );

    Ok(())
}

/// Describes when the instance will refresh next.
///
/// A timestamp that cannot be parsed is treated as "refresh now".
fn next_refresh<Tz: TimeZone>(last_update: &str, interval: i64, now: &DateTime<Tz>) -> String {
    if last_update.is_empty() {
        return "waiting for the first cycle".to_string();
    }
    if interval == BOOTSTRAP_INTERVAL {
        return "now (bootstrapping)".to_string();
    }

    match seconds_until_refresh(last_update, interval, now) {
        Ok(seconds) if seconds > 0 => format!("in {}s", seconds),
        Ok(_) => "now".to_string(),
        Err(e) => {
            warn!("{}", e);
            "now".to_string()
        }
    }
}
