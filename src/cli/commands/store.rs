use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_REDIS_URL: &str = "redis-url";
pub const ARG_STORE_TIMEOUT_MS: &str = "store-timeout-ms";

#[derive(Debug)]
pub struct Options {
    pub redis_url: String,
    pub timeout: Duration,
}

impl Options {
    /// Parse key-value store arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the URL is empty or the timeout is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let redis_url = matches
            .get_one::<String>(ARG_REDIS_URL)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_REDIS_URL}"))?;
        let timeout_ms = matches
            .get_one::<u64>(ARG_STORE_TIMEOUT_MS)
            .copied()
            .unwrap_or(500);
        if timeout_ms == 0 {
            return Err(anyhow::anyhow!("--{ARG_STORE_TIMEOUT_MS} must be greater than 0"));
        }

        Ok(Self {
            redis_url,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_REDIS_URL)
                .long(ARG_REDIS_URL)
                .help("Redis URL holding sessions, rate counters and allow-lists")
                .env("REDIS_URL")
                .default_value("redis://127.0.0.1:6379"),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT_MS)
                .long(ARG_STORE_TIMEOUT_MS)
                .help("Upper bound for a single key-value store command, in milliseconds")
                .env("COUNSEL_STORE_TIMEOUT_MS")
                .default_value("500")
                .value_parser(clap::value_parser!(u64)),
        )
}
