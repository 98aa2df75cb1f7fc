use std::{sync::Arc, time::SystemTime};

use uuid::Uuid;

use crate::dao::{
    match_store::MatchStore,
    models::{GoalEntity, SetEntity, TeamIndex, TimeoutEntity},
    storage::StorageResult,
};

/// Per-team totals of a set's non-voided events, with their ids in timestamp order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTally {
    /// Count per team slot.
    pub counts: [u32; 2],
    /// Non-voided event ids, oldest first.
    pub ids: Vec<Uuid>,
}

impl EventTally {
    /// Fold `(id, timestamp, team)` triples into a tally.
    ///
    /// Events are ordered by timestamp, ties broken by id, so the output does not depend on the
    /// order the store returned them in.
    fn fold(mut events: Vec<(Uuid, SystemTime, TeamIndex)>) -> Self {
        events.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut tally = EventTally {
            counts: [0, 0],
            ids: Vec::with_capacity(events.len()),
        };
        for (id, _, team) in events {
            tally.counts[team.slot()] += 1;
            tally.ids.push(id);
        }
        tally
    }

    /// Tally the non-voided goals of a log.
    pub fn from_goals(goals: &[GoalEntity]) -> Self {
        Self::fold(
            goals
                .iter()
                .filter(|goal| !goal.voided)
                .map(|goal| (goal.id, goal.timestamp, goal.team_index))
                .collect(),
        )
    }

    /// Tally the non-voided timeouts of a log.
    pub fn from_timeouts(timeouts: &[TimeoutEntity]) -> Self {
        Self::fold(
            timeouts
                .iter()
                .filter(|timeout| !timeout.voided)
                .map(|timeout| (timeout.id, timeout.timestamp, timeout.team_index))
                .collect(),
        )
    }

    /// Overwrite the set's score projection.
    pub fn apply_to_scores(self, set: &mut SetEntity) {
        set.scores = self.counts;
        set.goals = self.ids;
    }

    /// Overwrite the set's timeout projection.
    pub fn apply_to_timeouts(self, set: &mut SetEntity) {
        set.timeouts_used = self.counts;
        set.timeouts = self.ids;
    }
}

/// Recomputes score and timeout projections from the stored event logs.
#[derive(Clone)]
pub struct ScoreComputationEngine {
    store: Arc<dyn MatchStore>,
}

impl ScoreComputationEngine {
    /// Build an engine reading from `store`.
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self { store }
    }

    /// Goals per team and ordered goal ids of the set.
    pub async fn recompute_scores(&self, set_id: Uuid) -> StorageResult<EventTally> {
        let goals = self.store.list_goals(set_id).await?;
        Ok(EventTally::from_goals(&goals))
    }

    /// Timeouts per team and ordered timeout ids of the set.
    pub async fn recompute_timeouts(&self, set_id: Uuid) -> StorageResult<EventTally> {
        let timeouts = self.store.list_timeouts(set_id).await?;
        Ok(EventTally::from_timeouts(&timeouts))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::match_store::InMemoryMatchStore;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn goal(set_id: Uuid, team: TeamIndex, secs: u64, voided: bool) -> GoalEntity {
        GoalEntity {
            id: Uuid::new_v4(),
            match_id: Uuid::nil(),
            set_id,
            team_index: team,
            timestamp: at(secs),
            scoring_row: None,
            voided,
        }
    }

    #[test]
    fn voided_goals_are_ignored() {
        let set_id = Uuid::new_v4();
        let goals = vec![
            goal(set_id, TeamIndex::FIRST, 10, false),
            goal(set_id, TeamIndex::SECOND, 20, true),
            goal(set_id, TeamIndex::SECOND, 30, false),
        ];

        let tally = EventTally::from_goals(&goals);
        assert_eq!(tally.counts, [1, 1]);
        assert_eq!(tally.ids, vec![goals[0].id, goals[2].id]);
    }

    #[test]
    fn ids_follow_timestamps_not_insertion_order() {
        let set_id = Uuid::new_v4();
        let late = goal(set_id, TeamIndex::FIRST, 50, false);
        let early = goal(set_id, TeamIndex::SECOND, 5, false);

        let tally = EventTally::from_goals(&[late.clone(), early.clone()]);
        assert_eq!(tally.ids, vec![early.id, late.id]);
    }

    #[test]
    fn equal_timestamps_are_ordered_by_id() {
        let set_id = Uuid::new_v4();
        let a = goal(set_id, TeamIndex::FIRST, 7, false);
        let b = goal(set_id, TeamIndex::SECOND, 7, false);

        let forward = EventTally::from_goals(&[a.clone(), b.clone()]);
        let backward = EventTally::from_goals(&[b, a]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn timeouts_tally_per_team() {
        let set_id = Uuid::new_v4();
        let timeout = |team, secs, voided| TimeoutEntity {
            id: Uuid::new_v4(),
            match_id: Uuid::nil(),
            set_id,
            team_index: team,
            timestamp: at(secs),
            voided,
        };
        let timeouts = vec![
            timeout(TeamIndex::SECOND, 1, false),
            timeout(TeamIndex::SECOND, 2, false),
            timeout(TeamIndex::FIRST, 3, true),
        ];

        let mut set = SetEntity::new(Uuid::nil(), 1);
        EventTally::from_timeouts(&timeouts).apply_to_timeouts(&mut set);
        assert_eq!(set.timeouts_used, [0, 2]);
        assert_eq!(set.timeouts.len(), 2);
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let store = InMemoryMatchStore::new();
        let set_id = Uuid::new_v4();
        for (team, secs) in [(TeamIndex::FIRST, 3), (TeamIndex::SECOND, 1), (TeamIndex::FIRST, 2)] {
            store.save_goal(goal(set_id, team, secs, false)).await.unwrap();
        }
        store
            .save_goal(goal(Uuid::new_v4(), TeamIndex::FIRST, 4, false))
            .await
            .unwrap();

        let engine = ScoreComputationEngine::new(Arc::new(store));
        let first = engine.recompute_scores(set_id).await.unwrap();
        let second = engine.recompute_scores(set_id).await.unwrap();
        assert_eq!(first.counts, [2, 1]);
        assert_eq!(first, second);
    }
}
