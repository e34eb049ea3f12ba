//! One-shot publishing job, meant to be run from cron:
//!
//!     confess-publisher [daily|weekly]
//!
//! Fetches the top submissions for the window from a running confess
//! server and forwards the payload to a webhook. Rendering the result
//! as an image and posting it to the social network happen behind
//! that webhook, outside this repo.

use anyhow::{Context, bail};
use serde_json::json;
use tracing::info;

use confess_types::api::{TopResponse, TopWindow};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confess_publisher=info".into()),
        )
        .init();

    let window = match std::env::args().nth(1).as_deref() {
        None | Some("daily") => TopWindow::Daily,
        Some("weekly") => TopWindow::Weekly,
        Some(other) => bail!("unknown window '{}', expected daily or weekly", other),
    };

    let api_url =
        std::env::var("CONFESS_API_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".into());
    let webhook_url = std::env::var("CONFESS_WEBHOOK_URL")
        .context("CONFESS_WEBHOOK_URL must be set to the publishing webhook")?;

    let client = reqwest::Client::new();

    let top: TopResponse = client
        .get(format!("{}/top", api_url))
        .query(&[("window", window.as_str())])
        .send()
        .await
        .context("fetching top submissions")?
        .error_for_status()?
        .json()
        .await
        .context("decoding top submissions")?;

    // An empty window is a 200 from the API; for the cron surface it
    // is a failure worth noticing.
    if top.confessions.is_empty() {
        bail!("no submissions in the {} window", window.as_str());
    }

    let headline = match window {
        TopWindow::Daily => "Top confession from the past 24 hours",
        TopWindow::Weekly => "Top confessions from this week",
    };

    client
        .post(&webhook_url)
        .json(&json!({
            "window": window,
            "headline": headline,
            "confessions": top.confessions,
        }))
        .send()
        .await
        .context("posting to webhook")?
        .error_for_status()
        .context("webhook rejected the payload")?;

    info!(
        window = window.as_str(),
        count = top.confessions.len(),
        "top submissions published"
    );
    Ok(())
}
