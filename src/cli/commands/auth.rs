use clap::{builder::ValueParser, Arg, ArgAction, ArgMatches, Command};
use jsonwebtoken::Algorithm;
use secrecy::SecretString;

use crate::api::handlers::auth::{parse_algorithm, AuthConfig};

pub const ARG_SECRET_KEY: &str = "secret-key";
pub const ARG_ALGORITHM: &str = "algorithm";
pub const ARG_ACCESS_TOKEN_EXPIRE_MINUTES: &str = "access-token-expire-minutes";
pub const ARG_REQUESTS_PER_MINUTE: &str = "allowed-request-attempts-per-minute";
pub const ARG_TRUST_PROXY_HEADERS: &str = "trust-proxy-headers";

#[derive(Debug)]
pub struct Options {
    pub secret_key: SecretString,
    pub algorithm: Algorithm,
    pub access_token_expire_minutes: u64,
    pub requests_per_minute: u64,
    pub trust_proxy_headers: bool,
}

impl Options {
    /// Parse token and limiter arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret is missing or empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let secret_key = matches
            .get_one::<String>(ARG_SECRET_KEY)
            .cloned()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_SECRET_KEY}"))?;

        Ok(Self {
            secret_key: SecretString::from(secret_key),
            algorithm: matches
                .get_one::<Algorithm>(ARG_ALGORITHM)
                .copied()
                .unwrap_or(Algorithm::HS256),
            access_token_expire_minutes: matches
                .get_one::<u64>(ARG_ACCESS_TOKEN_EXPIRE_MINUTES)
                .copied()
                .unwrap_or(30),
            requests_per_minute: matches
                .get_one::<u64>(ARG_REQUESTS_PER_MINUTE)
                .copied()
                .unwrap_or(60),
            trust_proxy_headers: matches.get_flag(ARG_TRUST_PROXY_HEADERS),
        })
    }

    #[must_use]
    pub fn into_config(self) -> AuthConfig {
        AuthConfig::new(self.secret_key)
            .with_algorithm(self.algorithm)
            .with_session_ttl_seconds(self.access_token_expire_minutes.saturating_mul(60))
            .with_requests_per_minute(self.requests_per_minute)
            .with_trust_proxy_headers(self.trust_proxy_headers)
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET_KEY)
                .long(ARG_SECRET_KEY)
                .help("Shared secret used to verify bearer tokens")
                .env("SECRET_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ALGORITHM)
                .long(ARG_ALGORITHM)
                .help("Token signature algorithm: HS256, HS384 or HS512")
                .env("ALGORITHM")
                .default_value("HS256")
                .value_parser(ValueParser::from(parse_algorithm)),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_EXPIRE_MINUTES)
                .long(ARG_ACCESS_TOKEN_EXPIRE_MINUTES)
                .help("Token and session lifetime in minutes; must match the issuer")
                .env("ACCESS_TOKEN_EXPIRE_MINUTES")
                .default_value("30")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REQUESTS_PER_MINUTE)
                .long(ARG_REQUESTS_PER_MINUTE)
                .help("Requests allowed per source address in each 60 second window")
                .env("ALLOWED_REQUEST_ATTEMPTS_PER_MINUTE")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_TRUST_PROXY_HEADERS)
                .long(ARG_TRUST_PROXY_HEADERS)
                .help("Count requests by x-forwarded-for / x-real-ip instead of the TCP peer")
                .env("COUNSEL_TRUST_PROXY_HEADERS")
                .action(ArgAction::SetTrue),
        )
}
