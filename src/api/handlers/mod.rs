//! API handlers for Counsel.

pub mod auth;
pub mod health;
pub mod me;
