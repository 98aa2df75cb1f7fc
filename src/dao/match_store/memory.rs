use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    match_store::{MatchStore, ProgressionWrite},
    models::{GoalEntity, MatchEntity, SetEntity, TimeoutEntity},
    storage::StorageResult,
};

/// Process-local store backing development runs and tests.
///
/// All tables live behind a single lock so [`MatchStore::commit`] is applied atomically.
#[derive(Clone, Default)]
pub struct InMemoryMatchStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    matches: IndexMap<Uuid, MatchEntity>,
    sets: IndexMap<Uuid, SetEntity>,
    goals: IndexMap<Uuid, GoalEntity>,
    timeouts: IndexMap<Uuid, TimeoutEntity>,
}

impl InMemoryMatchStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for InMemoryMatchStore {
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.read().await.matches.get(&id).cloned()) })
    }

    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.write().await.matches.insert(entity.id, entity);
            Ok(())
        })
    }

    fn find_set(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SetEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.read().await.sets.get(&id).cloned()) })
    }

    fn list_sets(&self, match_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<SetEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            let mut sets: Vec<SetEntity> = guard
                .sets
                .values()
                .filter(|set| set.match_id == match_id)
                .cloned()
                .collect();
            sets.sort_by_key(|set| set.set_number);
            Ok(sets)
        })
    }

    fn save_set(&self, entity: SetEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.write().await.sets.insert(entity.id, entity);
            Ok(())
        })
    }

    fn find_goal(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GoalEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.read().await.goals.get(&id).cloned()) })
    }

    fn list_goals(&self, set_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GoalEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard
                .goals
                .values()
                .filter(|goal| goal.set_id == set_id)
                .cloned()
                .collect())
        })
    }

    fn save_goal(&self, entity: GoalEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.write().await.goals.insert(entity.id, entity);
            Ok(())
        })
    }

    fn find_timeout(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TimeoutEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.read().await.timeouts.get(&id).cloned()) })
    }

    fn list_timeouts(
        &self,
        set_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TimeoutEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard
                .timeouts
                .values()
                .filter(|timeout| timeout.set_id == set_id)
                .cloned()
                .collect())
        })
    }

    fn save_timeout(&self, entity: TimeoutEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.write().await.timeouts.insert(entity.id, entity);
            Ok(())
        })
    }

    fn commit(&self, write: ProgressionWrite) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.write().await;
            for set in write.sets {
                guard.sets.insert(set.id, set);
            }
            if let Some(entity) = write.match_entity {
                guard.matches.insert(entity.id, entity);
            }
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
