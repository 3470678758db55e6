use crate::{api, api::handlers::auth::AuthConfig};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub redis_url: String,
    pub store_timeout: Duration,
    pub auth: AuthConfig,
}

// Host and path only; credentials never reach the logs.
fn redacted(raw: &str) -> Result<String> {
    let url = Url::parse(raw).context("invalid connection URL")?;
    let host = url.host_str().unwrap_or("localhost");
    let port = url
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    Ok(format!("{}://{}{}{}", url.scheme(), host, port, url.path()))
}

/// Execute the server action.
/// # Errors
/// Returns an error if a connection URL is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        database = %redacted(&args.dsn)?,
        store = %redacted(&args.redis_url)?,
        requests_per_minute = args.auth.requests_per_minute(),
        session_ttl_seconds = args.auth.session_ttl().as_secs(),
        "Starting counsel"
    );

    api::new(
        args.port,
        args.dsn,
        args.redis_url,
        args.store_timeout,
        args.auth,
    )
    .await
}
