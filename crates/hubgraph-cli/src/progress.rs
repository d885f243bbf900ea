//! Live status line for `hubgraph serve`.

use colored::Colorize;
use hubgraph_scheduler::{ProgressCallback, RefreshProgress};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Creates the spinner the refresh status is drawn on.
pub fn spinner() -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Starting...");
    Ok(spinner)
}

/// Renders scheduler progress onto `spinner`.
pub fn render_to(spinner: ProgressBar) -> ProgressCallback {
    Box::new(move |event| {
        if let Some(message) = describe(&event) {
            spinner.set_message(message);
        }
    })
}

/// One status line per event, or `None` for events that leave it unchanged.
fn describe(event: &RefreshProgress) -> Option<String> {
    let message = match event {
        RefreshProgress::CycleStarted { bootstrap: true } => "Reading rate limits...".to_string(),
        RefreshProgress::CycleStarted { bootstrap: false } => "Refreshing...".to_string(),
        RefreshProgress::PageFetched { page, pages, .. } => {
            format!("Page {}/{} analyzed...", page, pages)
        }
        RefreshProgress::RateLimitCountdown { seconds_left, .. } => format!(
            "{} Will reset in {} seconds",
            "Rate limit reached.".yellow(),
            seconds_left
        ),
        RefreshProgress::TransportRetry {
            page, retry_after, ..
        } => format!(
            "{} page {}, retrying in {}s",
            "Request failed for".yellow(),
            page,
            retry_after.as_secs().max(1)
        ),
        RefreshProgress::NoNewData => "No new data".to_string(),
        RefreshProgress::CycleCompleted {
            nodes,
            links,
            requests_used,
            max_requests,
            ..
        } => format!(
            "{} {} nodes, {} links (RL: {}/{} req/hr used)",
            "Content updated:".green(),
            nodes,
            links,
            requests_used,
            max_requests
        ),
        RefreshProgress::CycleFailed { error } => format!("{} {}", "Refresh failed:".red(), error),
        RefreshProgress::NextRefreshIn {
            seconds,
            requests_used,
            max_requests,
        } => format!(
            "Next refresh in: {}s (RL: {}/{} req/hr used)",
            seconds, requests_used, max_requests
        ),
        _ => return None,
    };
    Some(message)
}
