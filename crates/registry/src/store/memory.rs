use std::{collections::BTreeMap, sync::Arc};

use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use super::{
    entity::Entity,
    models::{Access, Document, Event},
    StoreError,
};

/// Registry tables held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    pub(crate) documents: BTreeMap<String, Document>,
    pub(crate) events: BTreeMap<String, Event>,
    pub(crate) accesses: BTreeMap<i64, Access>,
    /// Last generated surrogate key, shared by every table.
    pub(crate) sequence: i64,
}

/// Session over the shared tables.
///
/// The first write takes the shared write lock and works on a private copy
/// until commit, which gives the same serial behaviour a database
/// transaction would for concurrent requests.
pub(crate) struct MemorySession {
    shared: Arc<RwLock<MemoryTables>>,
    staged: Option<Staged>,
}

struct Staged {
    guard: OwnedRwLockWriteGuard<MemoryTables>,
    tables: MemoryTables,
}

impl MemorySession {
    pub(crate) fn new(shared: Arc<RwLock<MemoryTables>>) -> Self {
        Self { shared, staged: None }
    }

    pub(crate) async fn read<R>(&self, read: impl FnOnce(&MemoryTables) -> R) -> R {
        match &self.staged {
            Some(staged) => read(&staged.tables),
            None => read(&*self.shared.read().await),
        }
    }

    pub(crate) async fn write<R>(
        &mut self,
        write: impl FnOnce(&mut MemoryTables) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let staged = match self.staged.take() {
            Some(staged) => staged,
            None => {
                let guard = Arc::clone(&self.shared).write_owned().await;
                let tables = guard.clone();
                Staged { guard, tables }
            }
        };

        write(&mut self.staged.insert(staged).tables)
    }

    pub(crate) fn commit(&mut self) {
        if let Some(Staged { mut guard, tables }) = self.staged.take() {
            *guard = tables;
        }
    }
}

pub(crate) fn get<E: Entity>(tables: &MemoryTables, id: &E::Id) -> Option<E> {
    E::table(tables).get(id).cloned()
}

pub(crate) fn list<E: Entity>(
    tables: &MemoryTables,
    offset: usize,
    limit: usize,
    sort: E::SortKey,
    filter: &E::Filter,
) -> Vec<E> {
    let mut rows: Vec<&E> = E::table(tables).values().filter(|row| row.matches(filter)).collect();
    rows.sort_by(|left, right| left.compare_by(right, sort));
    rows.into_iter().skip(offset).take(limit).cloned().collect()
}

pub(crate) fn count<E: Entity>(tables: &MemoryTables, filter: &E::Filter) -> i64 {
    E::table(tables).values().filter(|row| row.matches(filter)).count() as i64
}

pub(crate) fn create<E: Entity>(tables: &mut MemoryTables, new: E::New) -> Result<E, StoreError> {
    tables.sequence += 1;
    let row = E::materialize(new, tables.sequence);

    if E::table(tables).contains_key(row.id()) {
        return Err(StoreError::Conflict(format!("{} `{}` already exists", E::NAME, row.id())));
    }
    E::check_references(tables, &row)?;

    E::table_mut(tables).insert(row.id().clone(), row.clone());
    Ok(row)
}

pub(crate) fn update<E: Entity>(
    tables: &mut MemoryTables,
    id: &E::Id,
    changes: E::Changes,
) -> Result<E, StoreError> {
    let row = E::table_mut(tables).get_mut(id).ok_or_else(|| StoreError::not_found::<E>(id))?;
    row.apply(changes);
    Ok(row.clone())
}

pub(crate) fn delete<E: Entity>(tables: &mut MemoryTables, id: &E::Id) -> Result<bool, StoreError> {
    if !E::table(tables).contains_key(id) {
        return Ok(false);
    }
    E::check_dependents(tables, id)?;

    Ok(E::table_mut(tables).remove(id).is_some())
}
