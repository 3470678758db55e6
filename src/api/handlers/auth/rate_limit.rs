//! Fixed-window request limiting per source address.
//!
//! Flow Overview:
//! 1) Read the counter for the source. Absent starts a new 60 s window at 1.
//! 2) At or over the limit: reject without touching the counter.
//! 3) Otherwise rewrite `count + 1` with the TTL that is left, to the
//!    millisecond, so the window stays anchored to its first request.
//!
//! Counters are keyed by the bare source address, the layout the login
//! service shares.
//!
//! The read and the write are separate store commands. Two racing requests can
//! both write the same value, undercounting by one near the threshold.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{debug, error, warn};

use super::{error::GateError, state::{AuthConfig, AuthState}, utils::extract_client_ip};
use crate::store::{KeyTtl, KeyValueStore};

pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
const UNKNOWN_SOURCE: &str = "unknown";

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    limit: u64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: &AuthConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            limit: config.requests_per_minute(),
        }
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Count one request from `source` against its current window.
    ///
    /// # Errors
    /// Returns [`GateError::TooManyRequests`] when the window is full and
    /// [`GateError::StoreUnavailable`] when the store cannot be reached.
    pub async fn admit(&self, source: &str) -> Result<(), GateError> {
        let current = match self.store.get(source).await? {
            None => return self.open_window(source).await,
            Some(raw) => match raw.parse::<u64>() {
                Ok(count) => count,
                Err(_) => {
                    warn!(source, "Unparseable rate counter {raw:?}, starting a new window");
                    return self.open_window(source).await;
                }
            },
        };

        if current >= self.limit {
            debug!(source, count = current, limit = self.limit(), "Rate limit reached");
            return Err(GateError::TooManyRequests);
        }

        match self.store.ttl(source).await? {
            KeyTtl::Expires(remaining) if !remaining.is_zero() => {
                let next = (current + 1).to_string();
                self.store.set_with_expiry(source, &next, remaining).await?;
                Ok(())
            }
            KeyTtl::Persistent => {
                warn!(source, "Rate counter has no expiry, starting a new window");
                self.open_window(source).await
            }
            // Expired between the two reads.
            KeyTtl::Expires(_) | KeyTtl::Missing => self.open_window(source).await,
        }
    }

    async fn open_window(&self, key: &str) -> Result<(), GateError> {
        if self.limit == 0 {
            return Err(GateError::TooManyRequests);
        }
        self.store
            .set_with_expiry(key, "1", RATE_LIMIT_WINDOW)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

/// Address the request is counted against.
///
/// The TCP peer, unless proxy headers are trusted and present. IPv4 peers on
/// the dual-stack listener arrive IPv4-mapped and are reported dotted.
pub(crate) fn client_addr(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(ip) = extract_client_ip(request.headers()) {
            return ip;
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(
            || UNKNOWN_SOURCE.to_string(),
            |info| info.0.ip().to_canonical().to_string(),
        )
}

/// Middleware rejecting requests once their source exhausts its window.
pub async fn enforce(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let source = client_addr(&request, auth_state.config().trust_proxy_headers());
    match auth_state.rate_limiter().admit(&source).await {
        Ok(()) => next.run(request).await,
        Err(GateError::StoreUnavailable) => {
            error!(source, "Rate limiter store unavailable, rejecting request");
            GateError::StoreUnavailable.into_response()
        }
        Err(err) => err.into_response(),
    }
}
