// Persistence access layer: one generic repository over the registry tables,
// backed by PostgreSQL in deployments and by shared in-memory tables in
// development and tests.

pub mod entity;
pub mod memory;
pub mod models;
mod postgres;
mod repo;

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tokio::sync::RwLock;

use crate::db::pool::check_pool_health;

pub use entity::{Commit, Entity};
pub use memory::MemoryTables;
pub use repo::Repo;

use memory::MemorySession;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    /// Unique or foreign-key violation.
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found<E: Entity>(id: &E::Id) -> Self {
        Self::NotFound { entity: E::NAME, id: id.to_string() }
    }
}

#[derive(Clone)]
pub enum Store {
    Postgres(PgPool),
    Memory(Arc<RwLock<MemoryTables>>),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(Arc::default())
    }

    /// Opens a request-scoped unit of work. Nothing is acquired until the
    /// first repository call.
    pub fn session(&self) -> Session {
        let backend = match self {
            Self::Postgres(pool) => Backend::Postgres(PgSession { pool: pool.clone(), tx: None }),
            Self::Memory(shared) => Backend::Memory(MemorySession::new(Arc::clone(shared))),
        };
        Session { backend }
    }

    pub async fn check_health(&self) -> anyhow::Result<()> {
        match self {
            Self::Postgres(pool) => check_pool_health(pool).await,
            Self::Memory(_) => Ok(()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

/// One request's view of the store.
///
/// Writes made with [`Commit::Deferred`] stay private to the session until
/// [`Session::commit`]. Dropping a session discards anything uncommitted.
pub struct Session {
    backend: Backend,
}

enum Backend {
    Postgres(PgSession),
    Memory(MemorySession),
}

struct PgSession {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    async fn connection(&mut self) -> Result<&mut PgConnection, StoreError> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };

        Ok(&mut **self.tx.insert(tx))
    }
}

impl Session {
    pub fn repo<E: Entity>(&mut self) -> Repo<'_, E> {
        Repo::new(self)
    }

    /// Publishes every pending write. A session with nothing pending commits
    /// trivially.
    pub async fn commit(&mut self) -> Result<(), StoreError> {
        match &mut self.backend {
            Backend::Postgres(session) => {
                if let Some(tx) = session.tx.take() {
                    tx.commit().await?;
                }
                Ok(())
            }
            Backend::Memory(session) => {
                session.commit();
                Ok(())
            }
        }
    }
}

impl<S> FromRequestParts<S> for Session
where
    Store: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Store::from_ref(state).session())
    }
}
