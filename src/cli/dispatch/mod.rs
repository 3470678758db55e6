//! Maps parsed CLI arguments to an action.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, store};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let store_opts = store::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        redis_url: store_opts.redis_url,
        store_timeout: store_opts.timeout,
        auth: auth_opts.into_config(),
    }))
}
