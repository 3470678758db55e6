//! # Counsel request gate
//!
//! `counsel` decides whether an inbound request may reach the Counsel API.
//!
//! ## Admission
//!
//! - **Rate limiting:** each source address gets a fixed 60 second window with
//!   a configurable number of requests. The window is anchored to its first
//!   request and rejected requests do not extend it.
//! - **Bearer tokens:** HMAC-signed JWTs carrying a `user_id` claim. A bad
//!   signature, an elapsed `exp`, a missing claim and an unknown principal all
//!   answer "Token is not valid.".
//! - **Single active session:** the key-value store keeps one token per
//!   principal email. Any other token, however well signed, answers
//!   "Token is expired.".
//!
//! Store failures and timeouts refuse the request.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
