use std::{sync::Arc, time::Duration};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, IndexModel, bson::doc, options::IndexOptions};
use tokio::{sync::RwLock, time::sleep};
use tracing::debug;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoGoalDocument, MongoMatchDocument, MongoSetDocument, MongoTimeoutDocument, doc_id,
        doc_ref,
    },
};
use crate::dao::{
    match_store::{MatchStore, ProgressionWrite},
    models::{GoalEntity, MatchEntity, SetEntity, TimeoutEntity},
    storage::StorageResult,
};

const MATCH_COLLECTION_NAME: &str = "matches";
const SET_COLLECTION_NAME: &str = "sets";
const GOAL_COLLECTION_NAME: &str = "goals";
const TIMEOUT_COLLECTION_NAME: &str = "timeouts";
const PING_BACKOFF_START: Duration = Duration::from_millis(250);
const PING_BACKOFF_MAX: Duration = Duration::from_secs(5);

/// MongoDB-backed [`MatchStore`].
#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Kept alive alongside the database handle it produced.
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoState {
    /// Build a client for `config` and wait until its database answers a ping.
    async fn open(config: &MongoConfig) -> MongoResult<Self> {
        let client = Client::with_options(config.options.clone())
            .map_err(|source| MongoDaoError::ClientConstruction { source })?;
        let database = client.database(&config.database_name);

        let mut attempt = 1;
        let mut delay = PING_BACKOFF_START;
        loop {
            match database.run_command(doc! { "ping": 1 }).await {
                Ok(_) => return Ok(Self { client, database }),
                Err(source) if attempt >= config.connect_attempts => {
                    return Err(MongoDaoError::InitialPing {
                        attempts: attempt,
                        source,
                    });
                }
                Err(err) => {
                    debug!(
                        attempt,
                        database = %config.database_name,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "match database not answering yet"
                    );
                    sleep(delay).await;
                    delay = (delay * 2).min(PING_BACKOFF_MAX);
                    attempt += 1;
                }
            }
        }
    }
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let fresh = MongoState::open(&self.config).await?;
        *self.state.write().await = fresh;
        Ok(())
    }
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let state = MongoState::open(&config).await?;
        let inner = Arc::new(MongoInner {
            state: RwLock::new(state),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        for (collection, field, name) in [
            (SET_COLLECTION_NAME, "match_id", "set_match_idx"),
            (GOAL_COLLECTION_NAME, "set_id", "goal_set_idx"),
            (TIMEOUT_COLLECTION_NAME, "set_id", "timeout_set_idx"),
        ] {
            let mut keys = mongodb::bson::Document::new();
            keys.insert(field, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(name.to_owned())).build())
                .build();

            database
                .collection::<mongodb::bson::Document>(collection)
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: field,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn matches(&self) -> Collection<MongoMatchDocument> {
        self.database().await.collection(MATCH_COLLECTION_NAME)
    }

    async fn sets(&self) -> Collection<MongoSetDocument> {
        self.database().await.collection(SET_COLLECTION_NAME)
    }

    async fn goals(&self) -> Collection<MongoGoalDocument> {
        self.database().await.collection(GOAL_COLLECTION_NAME)
    }

    async fn timeouts(&self) -> Collection<MongoTimeoutDocument> {
        self.database().await.collection(TIMEOUT_COLLECTION_NAME)
    }

    async fn find_match(&self, id: Uuid) -> MongoResult<Option<MatchEntity>> {
        let document = self
            .matches()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                kind: "match",
                id,
                source,
            })?;

        document.map(MatchEntity::try_from).transpose()
    }

    async fn save_match(&self, entity: MatchEntity) -> MongoResult<()> {
        let id = entity.id;
        let document: MongoMatchDocument = entity.into();
        self.matches()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                kind: "match",
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_set(&self, id: Uuid) -> MongoResult<Option<SetEntity>> {
        let document = self
            .sets()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                kind: "set",
                id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_sets(&self, match_id: Uuid) -> MongoResult<Vec<SetEntity>> {
        let list_error = |source| MongoDaoError::List {
            kind: "sets",
            parent: match_id,
            source,
        };
        let documents: Vec<MongoSetDocument> = self
            .sets()
            .await
            .find(doc_ref("match_id", match_id))
            .await
            .map_err(list_error)?
            .try_collect()
            .await
            .map_err(list_error)?;

        let mut sets: Vec<SetEntity> = documents.into_iter().map(Into::into).collect();
        sets.sort_by_key(|set| set.set_number);
        Ok(sets)
    }

    async fn save_set(&self, entity: SetEntity) -> MongoResult<()> {
        let id = entity.id;
        let document: MongoSetDocument = entity.into();
        self.sets()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                kind: "set",
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_goal(&self, id: Uuid) -> MongoResult<Option<GoalEntity>> {
        let document = self
            .goals()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                kind: "goal",
                id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_goals(&self, set_id: Uuid) -> MongoResult<Vec<GoalEntity>> {
        let list_error = |source| MongoDaoError::List {
            kind: "goals",
            parent: set_id,
            source,
        };
        let documents: Vec<MongoGoalDocument> = self
            .goals()
            .await
            .find(doc_ref("set_id", set_id))
            .await
            .map_err(list_error)?
            .try_collect()
            .await
            .map_err(list_error)?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_goal(&self, entity: GoalEntity) -> MongoResult<()> {
        let id = entity.id;
        let document: MongoGoalDocument = entity.into();
        self.goals()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                kind: "goal",
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_timeout(&self, id: Uuid) -> MongoResult<Option<TimeoutEntity>> {
        let document = self
            .timeouts()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                kind: "timeout",
                id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_timeouts(&self, set_id: Uuid) -> MongoResult<Vec<TimeoutEntity>> {
        let list_error = |source| MongoDaoError::List {
            kind: "timeouts",
            parent: set_id,
            source,
        };
        let documents: Vec<MongoTimeoutDocument> = self
            .timeouts()
            .await
            .find(doc_ref("set_id", set_id))
            .await
            .map_err(list_error)?
            .try_collect()
            .await
            .map_err(list_error)?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_timeout(&self, entity: TimeoutEntity) -> MongoResult<()> {
        let id = entity.id;
        let document: MongoTimeoutDocument = entity.into();
        self.timeouts()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                kind: "timeout",
                id,
                source,
            })?;
        Ok(())
    }

    // Upserts are idempotent, so a batch interrupted midway converges when the caller retries.
    async fn commit(&self, write: ProgressionWrite) -> MongoResult<()> {
        for set in write.sets {
            self.save_set(set).await?;
        }
        if let Some(entity) = write.match_entity {
            self.save_match(entity).await?;
        }
        Ok(())
    }
}

impl MatchStore for MongoMatchStore {
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match(id).await.map_err(Into::into) })
    }

    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_match(entity).await.map_err(Into::into) })
    }

    fn find_set(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SetEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_set(id).await.map_err(Into::into) })
    }

    fn list_sets(&self, match_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<SetEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_sets(match_id).await.map_err(Into::into) })
    }

    fn save_set(&self, entity: SetEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_set(entity).await.map_err(Into::into) })
    }

    fn find_goal(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GoalEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_goal(id).await.map_err(Into::into) })
    }

    fn list_goals(&self, set_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GoalEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_goals(set_id).await.map_err(Into::into) })
    }

    fn save_goal(&self, entity: GoalEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_goal(entity).await.map_err(Into::into) })
    }

    fn find_timeout(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TimeoutEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_timeout(id).await.map_err(Into::into) })
    }

    fn list_timeouts(
        &self,
        set_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TimeoutEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_timeouts(set_id).await.map_err(Into::into) })
    }

    fn save_timeout(&self, entity: TimeoutEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_timeout(entity).await.map_err(Into::into) })
    }

    fn commit(&self, write: ProgressionWrite) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.commit(write).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
