//! Request admission.
//!
//! `authenticate` moves a bearer token through three checks and stops at the
//! first failure:
//! 1) signature, algorithm and `exp` (no I/O),
//! 2) the `user_id` claim resolves to a principal,
//! 3) the token is that principal's active session.
//!
//! Any store failure rejects the request.

use anyhow::Context;
use std::sync::Arc;
use tracing::{debug, error};

use super::{
    error::GateError,
    principal::Principal,
    session::SessionRegistry,
    state::AuthConfig,
    storage::PrincipalStore,
    token::{TokenSigner, TokenVerifier},
};
use crate::store::KeyValueStore;

pub struct Gate {
    verifier: TokenVerifier,
    signer: TokenSigner,
    sessions: SessionRegistry,
    principals: Arc<dyn PrincipalStore>,
}

impl Gate {
    #[must_use]
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn KeyValueStore>,
        principals: Arc<dyn PrincipalStore>,
    ) -> Self {
        Self {
            verifier: TokenVerifier::new(config),
            signer: TokenSigner::new(config),
            sessions: SessionRegistry::new(config, store),
            principals,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Resolve `token` to the principal it was issued for.
    ///
    /// # Errors
    /// - [`GateError::InvalidToken`] when verification fails.
    /// - [`GateError::PrincipalNotFound`] when the claim names no principal.
    /// - [`GateError::TokenExpired`] when the token is not the active session.
    /// - [`GateError::StoreUnavailable`] when either store cannot answer.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, GateError> {
        let principal_id = self.verifier.verify(token)?;

        let principal = match self.principals.find_principal_by_id(principal_id).await {
            Ok(Some(principal)) => principal,
            Ok(None) => {
                debug!(user_id = principal_id, "Token names an unknown principal");
                return Err(GateError::PrincipalNotFound);
            }
            Err(err) => {
                error!("Failed to lookup principal: {err:#}");
                return Err(GateError::StoreUnavailable);
            }
        };

        let active = self
            .sessions
            .matches(&principal.email, token)
            .await
            .map_err(|err| {
                error!("Failed to lookup session: {err}");
                GateError::from(err)
            })?;
        if !active {
            debug!(user_id = principal.id, "Token is not the active session");
            return Err(GateError::TokenExpired);
        }

        Ok(principal)
    }

    /// Issue a token for `principal` and make it the active session, which
    /// retires any token issued before it.
    ///
    /// # Errors
    /// Returns an error if signing fails or the session store is unreachable.
    pub async fn open_session(&self, principal: &Principal) -> anyhow::Result<String> {
        let token = self
            .signer
            .sign(principal.id)
            .context("failed to sign session token")?;
        self.sessions
            .store(&principal.email, &token, self.sessions.ttl())
            .await
            .context("failed to store session")?;
        Ok(token)
    }

    /// Revoke the active session of `principal`. Returns whether one existed.
    ///
    /// # Errors
    /// Returns [`GateError::StoreUnavailable`] when the store cannot answer.
    pub async fn close_session(&self, principal: &Principal) -> Result<bool, GateError> {
        Ok(self.sessions.revoke(&principal.email).await?)
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("verifier", &self.verifier)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::handlers::auth::{storage::InMemoryPrincipals, token::Claims},
        store::{KeyTtl, MemoryStore, StoreError, StoreResult},
    };
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::time::Duration;

    fn config() -> AuthConfig {
        AuthConfig::new(SecretString::from("gate-secret")).with_session_ttl_seconds(300)
    }

    fn bob() -> Principal {
        Principal {
            id: 3,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            is_admin: false,
            is_lawyer: false,
        }
    }

    fn gate_with(store: Arc<dyn KeyValueStore>) -> (Gate, InMemoryPrincipals) {
        let principals = InMemoryPrincipals::new();
        principals.insert(bob());
        let gate = Gate::new(&config(), store, Arc::new(principals.clone()));
        (gate, principals)
    }

    struct UnreachableStore;

    #[async_trait]
    impl KeyValueStore for UnreachableStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Timeout {
                command: "GET",
                timeout: Duration::from_millis(1),
            })
        }

        async fn set_with_expiry(&self, _: &str, _: &str, _: Duration) -> StoreResult<()> {
            Err(StoreError::Connection("refused".to_string()))
        }

        async fn ttl(&self, _key: &str) -> StoreResult<KeyTtl> {
            Err(StoreError::Connection("refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> StoreResult<bool> {
            Err(StoreError::Connection("refused".to_string()))
        }

        async fn list_range(&self, _: &str, _: isize, _: isize) -> StoreResult<Vec<String>> {
            Err(StoreError::Connection("refused".to_string()))
        }

        async fn ping(&self) -> StoreResult<()> {
            Err(StoreError::Connection("refused".to_string()))
        }
    }

    #[tokio::test]
    async fn active_session_is_admitted() {
        let (gate, _) = gate_with(Arc::new(MemoryStore::new()));
        let token = gate.open_session(&bob()).await.unwrap();
        assert_eq!(gate.authenticate(&token).await, Ok(bob()));
    }

    #[tokio::test]
    async fn admits_session_written_by_login_service() {
        let store = MemoryStore::new();
        let (gate, _) = gate_with(Arc::new(store.clone()));
        let token = TokenSigner::new(&config()).sign(3).unwrap();
        store
            .set_with_expiry("bob@example.com", &token, Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(gate.authenticate(&token).await, Ok(bob()));
    }

    #[tokio::test]
    async fn revoked_session_is_expired() {
        let (gate, _) = gate_with(Arc::new(MemoryStore::new()));
        let token = gate.open_session(&bob()).await.unwrap();
        assert!(gate.close_session(&bob()).await.unwrap());
        assert_eq!(
            gate.authenticate(&token).await,
            Err(GateError::TokenExpired)
        );
    }

    #[tokio::test]
    async fn new_session_retires_previous_token() {
        let (gate, _) = gate_with(Arc::new(MemoryStore::new()));
        let first = TokenSigner::new(&config())
            .sign_claims(&Claims {
                user_id: Some(3),
                iat: Some(1),
                exp: i64::MAX / 2,
            })
            .unwrap();
        gate.sessions()
            .store("bob@example.com", &first, gate.sessions().ttl())
            .await
            .unwrap();
        assert_eq!(gate.authenticate(&first).await, Ok(bob()));

        let second = gate.open_session(&bob()).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(
            gate.authenticate(&first).await,
            Err(GateError::TokenExpired)
        );
        assert_eq!(gate.authenticate(&second).await, Ok(bob()));
    }

    #[tokio::test]
    async fn tampered_token_is_invalid_before_any_lookup() {
        let store = MemoryStore::new();
        let (gate, _) = gate_with(Arc::new(store.clone()));
        let token = gate.open_session(&bob()).await.unwrap();
        let mut tampered = token.into_bytes();
        let last = tampered.len() - 2;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();

        assert_eq!(
            gate.authenticate(&tampered).await,
            Err(GateError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn unknown_principal_is_rejected() {
        let (gate, principals) = gate_with(Arc::new(MemoryStore::new()));
        let token = gate.open_session(&bob()).await.unwrap();
        principals.remove(3);
        let err = gate.authenticate(&token).await.unwrap_err();
        assert_eq!(err, GateError::PrincipalNotFound);
        assert_eq!(err.detail(), "Token is not valid.");
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let (gate, _) = gate_with(Arc::new(UnreachableStore));
        let token = TokenSigner::new(&config()).sign(3).unwrap();
        assert_eq!(
            gate.authenticate(&token).await,
            Err(GateError::StoreUnavailable)
        );
        assert_eq!(
            gate.close_session(&bob()).await,
            Err(GateError::StoreUnavailable)
        );
        assert!(gate.open_session(&bob()).await.is_err());
    }
}
