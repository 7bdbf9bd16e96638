use std::marker::PhantomData;

use super::{
    entity::{Commit, Entity},
    memory, postgres, Backend, Session, StoreError,
};

/// Typed CRUD over one entity table, borrowed from a [`Session`].
pub struct Repo<'s, E: Entity> {
    session: &'s mut Session,
    _entity: PhantomData<fn() -> E>,
}

impl<'s, E: Entity> Repo<'s, E> {
    pub(super) fn new(session: &'s mut Session) -> Self {
        Self { session, _entity: PhantomData }
    }

    pub async fn get(&mut self, id: &E::Id) -> Result<Option<E>, StoreError> {
        match &mut self.session.backend {
            Backend::Postgres(session) => postgres::get::<E>(session.connection().await?, id).await,
            Backend::Memory(session) => Ok(session.read(|tables| memory::get::<E>(tables, id)).await),
        }
    }

    /// One window of matching rows. `sort` falls back to the entity's
    /// default ordering; ties always break on the primary key.
    pub async fn list(
        &mut self,
        offset: u64,
        limit: u64,
        sort: Option<E::SortKey>,
        filter: &E::Filter,
    ) -> Result<Vec<E>, StoreError> {
        let sort = sort.unwrap_or_else(E::default_sort);
        match &mut self.session.backend {
            Backend::Postgres(session) => {
                let offset = i64::try_from(offset).unwrap_or(i64::MAX);
                let limit = i64::try_from(limit).unwrap_or(i64::MAX);
                postgres::list::<E>(session.connection().await?, offset, limit, sort, filter).await
            }
            Backend::Memory(session) => {
                let offset = usize::try_from(offset).unwrap_or(usize::MAX);
                let limit = usize::try_from(limit).unwrap_or(usize::MAX);
                Ok(session
                    .read(|tables| memory::list::<E>(tables, offset, limit, sort, filter))
                    .await)
            }
        }
    }

    pub async fn count(&mut self, filter: &E::Filter) -> Result<u64, StoreError> {
        let total = match &mut self.session.backend {
            Backend::Postgres(session) => {
                postgres::count::<E>(session.connection().await?, filter).await?
            }
            Backend::Memory(session) => {
                session.read(|tables| memory::count::<E>(tables, filter)).await
            }
        };

        Ok(u64::try_from(total).unwrap_or_default())
    }

    pub async fn create(&mut self, new: E::New, commit: Commit) -> Result<E, StoreError> {
        let row = match &mut self.session.backend {
            Backend::Postgres(session) => {
                postgres::create::<E>(session.connection().await?, &new).await?
            }
            Backend::Memory(session) => {
                session.write(|tables| memory::create::<E>(tables, new)).await?
            }
        };

        self.finish(commit).await?;
        Ok(row)
    }

    /// Fails with [`StoreError::NotFound`] when `id` is absent.
    pub async fn update(
        &mut self,
        id: &E::Id,
        changes: E::Changes,
        commit: Commit,
    ) -> Result<E, StoreError> {
        let row = match &mut self.session.backend {
            Backend::Postgres(session) => {
                postgres::update::<E>(session.connection().await?, id, &changes).await?
            }
            Backend::Memory(session) => {
                session.write(|tables| memory::update::<E>(tables, id, changes)).await?
            }
        };

        self.finish(commit).await?;
        Ok(row)
    }

    /// Deleting an absent id succeeds. Returns whether a row was removed.
    pub async fn delete(&mut self, id: &E::Id, commit: Commit) -> Result<bool, StoreError> {
        let removed = match &mut self.session.backend {
            Backend::Postgres(session) => {
                postgres::delete::<E>(session.connection().await?, id).await?
            }
            Backend::Memory(session) => {
                session.write(|tables| memory::delete::<E>(tables, id)).await?
            }
        };

        self.finish(commit).await?;
        Ok(removed)
    }

    async fn finish(&mut self, commit: Commit) -> Result<(), StoreError> {
        match commit {
            Commit::Now => self.session.commit().await,
            Commit::Deferred => Ok(()),
        }
    }
}
