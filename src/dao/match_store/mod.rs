pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{GoalEntity, MatchEntity, SetEntity, TimeoutEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use self::memory::InMemoryMatchStore;

/// Writes produced by a single progression call, applied as one batch.
///
/// Sets are written before the match so a reader never sees a match referencing a set that does
/// not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressionWrite {
    pub sets: Vec<SetEntity>,
    pub match_entity: Option<MatchEntity>,
}

impl ProgressionWrite {
    /// Nothing to persist.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.match_entity.is_none()
    }
}

/// Abstraction over the persistence layer for matches, sets and their event logs.
pub trait MatchStore: Send + Sync {
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_set(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SetEntity>>>;
    /// Every set of the match, ordered by set number.
    fn list_sets(&self, match_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<SetEntity>>>;
    fn save_set(&self, entity: SetEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_goal(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GoalEntity>>>;
    /// Every goal of the set, voided ones included.
    fn list_goals(&self, set_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GoalEntity>>>;
    fn save_goal(&self, entity: GoalEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_timeout(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TimeoutEntity>>>;
    /// Every timeout of the set, voided ones included.
    fn list_timeouts(&self, set_id: Uuid)
    -> BoxFuture<'static, StorageResult<Vec<TimeoutEntity>>>;
    fn save_timeout(&self, entity: TimeoutEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn commit(&self, write: ProgressionWrite) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
