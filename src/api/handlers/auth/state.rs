//! Auth configuration and the shared per-process auth state.

use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};

use super::{
    allow_list::AllowList, gate::Gate, rate_limit::RateLimiter, storage::PrincipalStore,
};
use crate::store::KeyValueStore;

const DEFAULT_SESSION_TTL_SECONDS: u64 = 30 * 60;
const DEFAULT_REQUESTS_PER_MINUTE: u64 = 60;

/// Process-wide auth settings, built once at startup and handed to each
/// component's constructor. Nothing on the request path reads the environment.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    secret_key: SecretString,
    algorithm: Algorithm,
    session_ttl_seconds: u64,
    requests_per_minute: u64,
    trust_proxy_headers: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            secret_key,
            algorithm: Algorithm::HS256,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            trust_proxy_headers: false,
        }
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Session lifetime. Must equal the `exp` window the issuer puts in tokens.
    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_requests_per_minute(mut self, limit: u64) -> Self {
        self.requests_per_minute = limit;
        self
    }

    /// Take the client address from `x-forwarded-for` / `x-real-ip` instead of
    /// the TCP peer. Only enable behind a proxy that overwrites these headers.
    #[must_use]
    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    pub(crate) fn secret_key(&self) -> &SecretString {
        &self.secret_key
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn requests_per_minute(&self) -> u64 {
        self.requests_per_minute
    }

    #[must_use]
    pub fn trust_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }
}

/// Everything the HTTP layer needs to gate requests, shared behind an `Arc`.
pub struct AuthState {
    config: AuthConfig,
    gate: Gate,
    rate_limiter: RateLimiter,
    allow_list: AllowList,
    store: Arc<dyn KeyValueStore>,
    principals: Arc<dyn PrincipalStore>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn KeyValueStore>,
        principals: Arc<dyn PrincipalStore>,
        allow_list: AllowList,
    ) -> Self {
        let gate = Gate::new(&config, store.clone(), principals.clone());
        let rate_limiter = RateLimiter::new(&config, store.clone());
        Self {
            config,
            gate,
            rate_limiter,
            allow_list,
            store,
            principals,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub(crate) fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub(crate) fn principals(&self) -> &Arc<dyn PrincipalStore> {
        &self.principals
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .field("allow_list", &self.allow_list)
            .finish_non_exhaustive()
    }
}
