//! Principal lookups against the entity store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::{PgPool, Row};
use std::{collections::HashMap, sync::Arc};
use tracing::Instrument;

use super::principal::Principal;

/// Read-only access to principals by id.
///
/// `Ok(None)` means the id names no principal; `Err` means the store could not
/// answer.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_principal_by_id(&self, id: i64) -> Result<Option<Principal>>;

    async fn ping(&self) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn find_principal_by_id(&self, id: i64) -> Result<Option<Principal>> {
        let query = r#"SELECT id, username, email, "isAdmin", "isLawyer" FROM users WHERE id = $1"#;
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup principal")?;

        let Some(row) = row else {
            return Ok(None);
        };

        // `users.id` is an INTEGER column.
        let id: i32 = row.try_get("id").context("malformed users.id")?;
        Ok(Some(Principal {
            id: i64::from(id),
            username: row.try_get("username").context("malformed users.username")?,
            email: row.try_get("email").context("malformed users.email")?,
            is_admin: row.try_get("isAdmin").context("malformed users.isAdmin")?,
            is_lawyer: row.try_get("isLawyer").context("malformed users.isLawyer")?,
        }))
    }

    async fn ping(&self) -> Result<()> {
        let query = "SELECT 1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("database ping failed")?;
        Ok(())
    }
}

/// Principals held in memory. Used by tests and local runs without a database.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPrincipals {
    principals: Arc<RwLock<HashMap<i64, Principal>>>,
}

impl InMemoryPrincipals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, principal: Principal) {
        self.principals.write().insert(principal.id, principal);
    }

    pub fn remove(&self, id: i64) -> Option<Principal> {
        self.principals.write().remove(&id)
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipals {
    async fn find_principal_by_id(&self, id: i64) -> Result<Option<Principal>> {
        Ok(self.principals.read().get(&id).cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
