//! Authenticated self-service endpoint.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use super::auth::{ErrorBody, Principal};

#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "Return the authenticated principal.", body = Principal),
        (status = 401, description = "Missing, invalid or stale bearer token.", body = ErrorBody),
        (status = 429, description = "Too many requests from this address.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_me(principal: Extension<Principal>) -> impl IntoResponse {
    (StatusCode::OK, Json(principal.0))
}
