//! Gate rejection kinds and their HTTP rendering.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::store::StoreError;

/// Why a request was not admitted.
///
/// Every variant is terminal for the request. `InvalidToken` and
/// `PrincipalNotFound` render identically so callers cannot tell a forged
/// signature from a token naming an unknown principal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    #[error("no bearer credentials")]
    NotAuthenticated,
    #[error("invalid token")]
    InvalidToken,
    #[error("principal not found")]
    PrincipalNotFound,
    #[error("token no longer matches the active session")]
    TokenExpired,
    #[error("too many requests")]
    TooManyRequests,
    #[error("source address not allowed")]
    AccessDenied,
    #[error("backing store unavailable")]
    StoreUnavailable,
}

impl GateError {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotAuthenticated
            | Self::InvalidToken
            | Self::PrincipalNotFound
            | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message shown to the caller.
    #[must_use]
    pub fn detail(self) -> &'static str {
        match self {
            Self::NotAuthenticated => "Not authenticated.",
            Self::InvalidToken | Self::PrincipalNotFound => "Token is not valid.",
            Self::TokenExpired => "Token is expired.",
            Self::TooManyRequests => "Too many requests.",
            Self::AccessDenied => "Access denied.",
            Self::StoreUnavailable => "Service temporarily unavailable.",
        }
    }
}

impl From<StoreError> for GateError {
    fn from(_: StoreError) -> Self {
        Self::StoreUnavailable
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            detail: self.detail().to_string(),
        });
        let mut response = (self.status(), body).into_response();
        if self.status() == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
