//! Authenticated principal extraction.
//!
//! Flow Overview: read the bearer token, run it through the gate, and attach
//! the resolved principal to the request so handlers can take it as
//! `Extension<Principal>`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use super::{error::GateError, session::extract_bearer_token, state::AuthState};

/// Authenticated user context resolved from the bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    /// Unique and stable; the session registry is keyed by it.
    pub email: String,
    pub is_admin: bool,
    pub is_lawyer: bool,
}

/// Middleware admitting only requests whose bearer token is the principal's
/// active session. Rejections carry the gate's status and message.
pub async fn require_auth(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(request.headers()) else {
        debug!(path = %request.uri().path(), "Missing bearer token");
        return GateError::NotAuthenticated.into_response();
    };

    match auth_state.gate().authenticate(&token).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => {
            debug!(path = %request.uri().path(), "Request rejected: {err}");
            err.into_response()
        }
    }
}
