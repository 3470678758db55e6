//! Single-active-session registry and the logout endpoint.
//!
//! One record per principal, keyed by the bare email (the layout the login
//! service writes), holding the only token that is currently honored. Writing a new token overwrites the old one, which is how
//! earlier tokens for the same principal stop being accepted.

use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::{sync::Arc, time::Duration};
use subtle::ConstantTimeEq;
use tracing::{debug, error};

use super::{
    error::GateError,
    principal::Principal,
    state::{AuthConfig, AuthState},
};
use crate::store::{KeyValueStore, StoreResult};

#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(config: &AuthConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl: config.session_ttl(),
        }
    }

    /// Lifetime given to records written with [`Self::store`].
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Make `token` the active session for `principal_key`, replacing any
    /// previous one. Last writer wins.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    pub async fn store(&self, principal_key: &str, token: &str, ttl: Duration) -> StoreResult<()> {
        self.store
            .set_with_expiry(principal_key, token, ttl)
            .await
    }

    /// # Errors
    /// Returns an error if the store is unreachable.
    pub async fn lookup(&self, principal_key: &str) -> StoreResult<Option<String>> {
        self.store.get(principal_key).await
    }

    /// Drop the active session. Returns `false` when there was none; that is
    /// not an error and writes nothing.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    pub async fn revoke(&self, principal_key: &str) -> StoreResult<bool> {
        self.store.delete(principal_key).await
    }

    /// Whether `token` is the active session for `principal_key`.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    pub async fn matches(&self, principal_key: &str, token: &str) -> StoreResult<bool> {
        Ok(self
            .lookup(principal_key)
            .await?
            .is_some_and(|current| bool::from(current.as_bytes().ct_eq(token.as_bytes()))))
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Missing or stale token", body = super::error::ErrorBody),
        (status = 503, description = "Session store unavailable", body = super::error::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    principal: Extension<Principal>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, GateError> {
    match auth_state.gate().close_session(&principal).await {
        Ok(existed) => {
            debug!(user_id = principal.id, existed, "Session revoked");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(err) => {
            error!("Failed to revoke session: {err}");
            Err(err)
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header, if present and non-empty.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
