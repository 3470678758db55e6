//! Source address and browser origin allow-lists.
//!
//! Both lists live in the key-value store as plain lists and are read once at
//! startup. An empty list places no restriction.

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{collections::HashSet, sync::Arc};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};
use url::Url;

use super::{error::GateError, rate_limit::client_addr, state::AuthState};
use crate::store::{KeyValueStore, StoreResult};

pub const ALLOWED_IPS_KEY: &str = "allowed_ip_list";
pub const ALLOWED_ORIGINS_KEY: &str = "allowed_origins";

#[derive(Clone, Debug, Default)]
pub struct AllowList {
    ips: HashSet<String>,
    origins: Vec<HeaderValue>,
}

impl AllowList {
    /// Build from explicit values. Origins that are not valid URLs are skipped.
    #[must_use]
    pub fn new<I, O>(ips: I, origins: O) -> Self
    where
        I: IntoIterator<Item = String>,
        O: IntoIterator<Item = String>,
    {
        let ips = ips
            .into_iter()
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .collect();
        let origins = origins
            .into_iter()
            .filter_map(|origin| match normalize_origin(&origin) {
                Some(value) => Some(value),
                None => {
                    warn!("Ignoring invalid allowed origin: {origin}");
                    None
                }
            })
            .collect();
        Self { ips, origins }
    }

    /// Read both lists from the store.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    pub async fn load(store: &dyn KeyValueStore) -> StoreResult<Self> {
        let ips = store.list_range(ALLOWED_IPS_KEY, 0, -1).await?;
        let origins = store.list_range(ALLOWED_ORIGINS_KEY, 0, -1).await?;
        let allow_list = Self::new(ips, origins);
        info!(
            ips = allow_list.ips.len(),
            origins = allow_list.origins.len(),
            "Loaded allow-lists"
        );
        Ok(allow_list)
    }

    #[must_use]
    pub fn permits(&self, addr: &str) -> bool {
        self.ips.is_empty() || self.ips.contains(addr)
    }

    #[must_use]
    pub fn origins(&self) -> &[HeaderValue] {
        &self.origins
    }

    /// CORS policy: the configured origins, or any origin when none are set.
    #[must_use]
    pub fn cors_layer(&self) -> CorsLayer {
        let cors = CorsLayer::new()
            .allow_headers([CONTENT_TYPE, AUTHORIZATION])
            .allow_methods([Method::GET, Method::POST]);
        if self.origins.is_empty() {
            cors.allow_origin(Any)
        } else {
            cors.allow_origin(AllowOrigin::list(self.origins.clone()))
                .allow_credentials(true)
        }
    }
}

// Reduce to scheme://host[:port], the form browsers send in `Origin`.
fn normalize_origin(origin: &str) -> Option<HeaderValue> {
    let parsed = Url::parse(origin.trim()).ok()?;
    let host = parsed.host_str()?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    HeaderValue::from_str(&format!("{}://{}{}", parsed.scheme(), host, port)).ok()
}

/// Middleware rejecting sources outside the IP allow-list.
pub async fn enforce(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let source = client_addr(&request, auth_state.config().trust_proxy_headers());
    if auth_state.allow_list().permits(&source) {
        next.run(request).await
    } else {
        warn!(source, "Source address not in allow-list");
        GateError::AccessDenied.into_response()
    }
}
