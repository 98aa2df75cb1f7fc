pub mod scoreboard;
mod sse;
pub mod state_machine;

use std::{future::Future, panic, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::{config::AppConfig, dao::match_store::MatchStore, error::ServiceError};

pub use self::scoreboard::{Scoreboard, ScoreboardCache};
pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Central application state: storage handle, match locks, caches and broadcast hubs.
pub struct AppState {
    store: RwLock<Option<Arc<dyn MatchStore>>>,
    public_sse: SseHub,
    match_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    scoreboard: ScoreboardCache,
    config: AppConfig,
    degraded: watch::Sender<bool>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_transition_timeout(config, Some(DEFAULT_TRANSITION_TIMEOUT))
    }

    /// Same as [`AppState::new`] with a custom bound on locked work, `None` disabling it.
    pub fn with_transition_timeout(config: AppConfig, limit: Option<Duration>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            public_sse: SseHub::new(config.sse_capacity()),
            match_locks: DashMap::new(),
            scoreboard: ScoreboardCache::new(),
            config,
            degraded: degraded_tx,
            transition_timeout: limit,
        })
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn MatchStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Current match store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_store(&self) -> Result<Arc<dyn MatchStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new match store implementation and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn MatchStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and notify the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }

    /// Scoreboard read models keyed by match.
    pub fn scoreboard(&self) -> &ScoreboardCache {
        &self.scoreboard
    }

    /// Loaded application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run `work` while holding the lock of `match_id`.
    ///
    /// Every mutation of a match, its sets or their events goes through here so progression calls
    /// for one match never interleave. The work runs on its own task and always finishes; the
    /// transition timeout only bounds how long the caller waits for it. When the caller gives up,
    /// the match scoreboard is dropped once the work lands.
    pub async fn run_locked<F, Fut, T>(
        self: &Arc<Self>,
        match_id: Uuid,
        work: F,
    ) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        let mut task = tokio::spawn(async move {
            let lock = state.match_lock(match_id);
            let result = {
                let _guard = lock.lock().await;
                work().await
            };
            drop(lock);
            state.release_match_lock(match_id);
            result
        });

        let joined = match self.transition_timeout {
            Some(limit) => match timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(match_id = %match_id, ?limit, "locked match operation timed out");
                    let state = Arc::clone(self);
                    tokio::spawn(async move {
                        let _ = task.await;
                        state.scoreboard.invalidate(match_id);
                    });
                    return Err(ServiceError::Timeout);
                }
            },
            None => task.await,
        };

        match joined {
            Ok(result) => result,
            Err(err) => match err.try_into_panic() {
                Ok(payload) => panic::resume_unwind(payload),
                // Cancelled: the runtime is shutting down.
                Err(_) => Err(ServiceError::Timeout),
            },
        }
    }

    fn match_lock(&self, match_id: Uuid) -> Arc<Mutex<()>> {
        self.match_locks
            .entry(match_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // Callers still waiting hold their own handle, so the count only reaches one when idle.
    fn release_match_lock(&self, match_id: Uuid) {
        self.match_locks
            .remove_if(&match_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use super::*;
    use crate::dao::match_store::InMemoryMatchStore;

    #[tokio::test]
    async fn starts_degraded_until_store_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_store().await,
            Err(ServiceError::Degraded)
        ));

        let mut watcher = state.degraded_watcher();
        state.set_store(Arc::new(InMemoryMatchStore::new())).await;
        assert!(!state.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());

        state.clear_store().await;
        assert!(state.is_degraded());
    }

    #[tokio::test]
    async fn locked_work_is_serialized_per_match() {
        let state = AppState::new(AppConfig::default());
        let match_id = Uuid::new_v4();
        let in_flight = Arc::new(AtomicU32::new(0));

        let run = |state: SharedState, in_flight: Arc<AtomicU32>| async move {
            state
                .run_locked(match_id, move || async move {
                    assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ServiceError>(())
                })
                .await
        };

        let (a, b) = tokio::join!(
            run(state.clone(), in_flight.clone()),
            run(state.clone(), in_flight.clone())
        );
        assert!(a.is_ok() && b.is_ok());
    }

    #[tokio::test]
    async fn timed_out_work_still_runs_to_completion() {
        let state =
            AppState::with_transition_timeout(AppConfig::default(), Some(Duration::from_millis(5)));
        let match_id = Uuid::new_v4();
        let finished = Arc::new(AtomicBool::new(false));

        let flag = finished.clone();
        let result = state
            .run_locked(match_id, move || async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<_, ServiceError>(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Timeout)));
        assert!(!finished.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(finished.load(Ordering::SeqCst));
        assert!(state.match_locks.is_empty());
    }

    #[tokio::test]
    async fn idle_match_locks_are_released() {
        let state = AppState::new(AppConfig::default());
        let match_id = Uuid::new_v4();
        state
            .run_locked(match_id, || async { Ok::<_, ServiceError>(()) })
            .await
            .unwrap();
        assert!(state.match_locks.is_empty());
    }
}
