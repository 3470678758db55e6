//! Request gating: bearer token verification, single active session and
//! per-address rate limiting.
//!
//! ## Admission order
//!
//! 1. Allow-list: sources outside a non-empty IP allow-list get 403.
//! 2. Rate limit: at most `ALLOWED_REQUEST_ATTEMPTS_PER_MINUTE` requests per
//!    source address in a fixed 60 second window, 429 beyond it.
//! 3. Protected routes only: the bearer token must verify, name a known
//!    principal, and be that principal's active session, 401 otherwise.
//!
//! ## Sessions
//!
//! Each principal has at most one active token, stored under its email with
//! the same lifetime as the token. Issuing a token for a principal replaces the
//! stored one, so earlier tokens are refused with "Token is expired." even
//! though their signature and `exp` are still good.
//!
//! Every check fails closed: when the key-value store or the database cannot
//! answer, the request is refused with 503.

pub mod allow_list;
mod error;
pub mod gate;
pub mod principal;
pub mod rate_limit;
pub mod session;
mod state;
pub mod storage;
pub mod token;
pub mod utils;

pub use allow_list::AllowList;
pub use error::{ErrorBody, GateError};
pub use gate::Gate;
pub use principal::{require_auth, Principal};
pub use rate_limit::RateLimiter;
pub use session::SessionRegistry;
pub use state::{AuthConfig, AuthState};
pub use storage::{InMemoryPrincipals, PgPrincipalStore, PrincipalStore};
pub use token::{parse_algorithm, Claims, TokenSigner, TokenVerifier};
