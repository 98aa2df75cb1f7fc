//! Progression engine: turns goal and timeout mutations into set and match state.
//!
//! Each entry point recomputes the set's projections from its event log, re-evaluates the set
//! lifecycle, propagates set outcomes onto the match and commits every change as one batch.
//! Callers must hold the per-match lock for the whole call.

pub mod error;
pub mod match_coordinator;
pub mod score;
pub mod set_lifecycle;

use std::{sync::Arc, time::SystemTime};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::dao::{
    match_store::{MatchStore, ProgressionWrite},
    models::{GoalEntity, MatchEntity, SetEntity, SetStatus, TeamIndex, TimeoutEntity},
};

pub use self::error::{EngineResult, ProgressionError, SetAction};
use self::{
    match_coordinator::{
        MatchOutcome, ensure_match_started, evaluate_match, out_of_sync, sets_won_excluding,
    },
    score::ScoreComputationEngine,
    set_lifecycle::SetTransition,
};

/// Output of every progression entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressionResult {
    /// Post-mutation snapshot of the subject set.
    pub set: Option<SetEntity>,
    /// Post-mutation snapshot of the owning match, `None` when it could not be found.
    pub match_entity: Option<MatchEntity>,
    /// The set was completed, or re-awarded to the other team, by this call.
    pub set_completed: bool,
    /// The match holds a winner after this call.
    pub match_completed: bool,
    /// A completed match went back into play in this call.
    pub match_reopened: bool,
    /// A follow-up set was created by this call.
    pub new_set_created: bool,
}

impl ProgressionResult {
    /// Match the result belongs to, if known.
    pub fn match_id(&self) -> Option<Uuid> {
        self.match_entity
            .as_ref()
            .map(|entity| entity.id)
            .or_else(|| self.set.as_ref().map(|set| set.match_id))
    }
}

/// Entry points driving score recompute, set lifecycle and match coordination.
#[derive(Clone)]
pub struct ProgressionEngine {
    store: Arc<dyn MatchStore>,
    scores: ScoreComputationEngine,
}

impl ProgressionEngine {
    /// Build an engine over `store`.
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self {
            scores: ScoreComputationEngine::new(store.clone()),
            store,
        }
    }

    /// A goal was just recorded.
    pub async fn process_goal_progression(
        &self,
        goal: &GoalEntity,
    ) -> EngineResult<ProgressionResult> {
        debug!(goal_id = %goal.id, set_id = %goal.set_id, "goal progression");
        self.progress_goals(goal.set_id).await
    }

    /// A goal's `voided` flag was just flipped, either way.
    pub async fn process_goal_voiding_progression(
        &self,
        goal: &GoalEntity,
    ) -> EngineResult<ProgressionResult> {
        debug!(goal_id = %goal.id, voided = goal.voided, "goal voiding progression");
        self.progress_goals(goal.set_id).await
    }

    /// A timeout was just recorded.
    pub async fn process_timeout_progression(
        &self,
        timeout: &TimeoutEntity,
    ) -> EngineResult<ProgressionResult> {
        debug!(timeout_id = %timeout.id, set_id = %timeout.set_id, "timeout progression");
        self.progress_timeouts(timeout.set_id).await
    }

    /// A timeout's `voided` flag was just flipped, either way.
    pub async fn process_timeout_voiding_progression(
        &self,
        timeout: &TimeoutEntity,
    ) -> EngineResult<ProgressionResult> {
        debug!(timeout_id = %timeout.id, voided = timeout.voided, "timeout voiding progression");
        self.progress_timeouts(timeout.set_id).await
    }

    /// Operator-forced completion of an in-progress set, bypassing the winning condition.
    pub async fn process_manual_set_completion(
        &self,
        set_id: Uuid,
        winner: u8,
    ) -> EngineResult<ProgressionResult> {
        let winner = TeamIndex::new(winner).ok_or_else(|| {
            ProgressionError::InvalidArgument(format!("winner must be 0 or 1 (got {winner})"))
        })?;

        let now = SystemTime::now();
        let mut set = self.load_set(set_id).await?;
        if set.status != SetStatus::InProgress {
            return Err(ProgressionError::InvalidSetTransition {
                from: set.status,
                action: SetAction::Complete,
            });
        }
        let original = set.clone();

        self.scores
            .recompute_scores(set_id)
            .await?
            .apply_to_scores(&mut set);
        self.scores
            .recompute_timeouts(set_id)
            .await?
            .apply_to_timeouts(&mut set);
        set_lifecycle::complete_set(&mut set, winner, now)?;

        let Some(match_entity) = self.load_owning_match(&set).await? else {
            return self.commit_set_only(set, &original, true).await;
        };
        let sets = self.store.list_sets(match_entity.id).await?;
        self.cascade(set, &original, match_entity, &sets, SetTransition::Completed, now)
            .await
    }

    /// Explicit `NotStarted -> InProgress` of a set with no events yet.
    pub async fn process_set_start(&self, set_id: Uuid) -> EngineResult<ProgressionResult> {
        let now = SystemTime::now();
        let mut set = self.load_set(set_id).await?;
        let original = set.clone();
        set_lifecycle::start_set(&mut set, now)?;

        let Some(match_entity) = self.load_owning_match(&set).await? else {
            return self.commit_set_only(set, &original, false).await;
        };
        let sets = self.store.list_sets(match_entity.id).await?;
        self.cascade(set, &original, match_entity, &sets, SetTransition::Started, now)
            .await
    }

    async fn progress_goals(&self, set_id: Uuid) -> EngineResult<ProgressionResult> {
        let now = SystemTime::now();
        let mut set = self.load_set(set_id).await?;
        let original = set.clone();
        self.scores
            .recompute_scores(set_id)
            .await?
            .apply_to_scores(&mut set);

        let Some(match_entity) = self.load_owning_match(&set).await? else {
            set_lifecycle::maybe_auto_start(&mut set, now);
            return self.commit_set_only(set, &original, false).await;
        };

        let sets = self.store.list_sets(match_entity.id).await?;
        let transition = set_lifecycle::evaluate(
            &mut set,
            &match_entity.rules,
            sets_won_excluding(&sets, set_id),
            now,
        )?;
        self.cascade(set, &original, match_entity, &sets, transition, now)
            .await
    }

    // Timeouts never complete or reopen a set.
    async fn progress_timeouts(&self, set_id: Uuid) -> EngineResult<ProgressionResult> {
        let now = SystemTime::now();
        let mut set = self.load_set(set_id).await?;
        let original = set.clone();
        self.scores
            .recompute_timeouts(set_id)
            .await?
            .apply_to_timeouts(&mut set);
        let transition = if set_lifecycle::maybe_auto_start(&mut set, now) {
            SetTransition::Started
        } else {
            SetTransition::Unchanged
        };

        let Some(match_entity) = self.load_owning_match(&set).await? else {
            return self.commit_set_only(set, &original, false).await;
        };
        let sets = self.store.list_sets(match_entity.id).await?;
        self.cascade(set, &original, match_entity, &sets, transition, now)
            .await
    }

    /// Propagate the set onto its match and commit both.
    ///
    /// The match is re-evaluated when `transition` affects it, and also when it disagrees with
    /// `sets`, so retrying a call whose commit only partly landed repairs the match.
    async fn cascade(
        &self,
        set: SetEntity,
        original_set: &SetEntity,
        mut match_entity: MatchEntity,
        sets: &[SetEntity],
        transition: SetTransition,
        now: SystemTime,
    ) -> EngineResult<ProgressionResult> {
        let original_match = match_entity.clone();

        if set.status != SetStatus::NotStarted {
            ensure_match_started(&mut match_entity, now)?;
        }
        let outcome = if transition.affects_match() || out_of_sync(&match_entity, sets, &set) {
            evaluate_match(&mut match_entity, sets, &set, now)?
        } else {
            MatchOutcome::default()
        };

        let mut write = ProgressionWrite::default();
        if &set != original_set {
            write.sets.push(set.clone());
        }
        if let Some(new_set) = &outcome.new_set {
            write.sets.push(new_set.clone());
        }
        if match_entity != original_match {
            write.match_entity = Some(match_entity.clone());
        }
        if !write.is_empty() {
            self.store.commit(write).await?;
        }

        Ok(ProgressionResult {
            set: Some(set),
            match_entity: Some(match_entity),
            set_completed: transition.awarded(),
            match_completed: outcome.match_completed,
            match_reopened: outcome.match_reopened,
            new_set_created: outcome.new_set.is_some(),
        })
    }

    async fn commit_set_only(
        &self,
        set: SetEntity,
        original: &SetEntity,
        set_completed: bool,
    ) -> EngineResult<ProgressionResult> {
        if &set != original {
            self.store
                .commit(ProgressionWrite {
                    sets: vec![set.clone()],
                    match_entity: None,
                })
                .await?;
        }
        Ok(ProgressionResult {
            set: Some(set),
            set_completed,
            ..ProgressionResult::default()
        })
    }

    async fn load_set(&self, set_id: Uuid) -> EngineResult<SetEntity> {
        self.store
            .find_set(set_id)
            .await?
            .ok_or_else(|| ProgressionError::not_found("set", set_id))
    }

    // A missing match only limits the cascade; the set-level recompute still stands.
    async fn load_owning_match(&self, set: &SetEntity) -> EngineResult<Option<MatchEntity>> {
        let found = self.store.find_match(set.match_id).await?;
        if found.is_none() {
            warn!(
                set_id = %set.id,
                match_id = %set.match_id,
                "owning match not found; progression limited to the set"
            );
        }
        Ok(found)
    }
}
