use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::{
    dao::models::{MatchEntity, SetEntity},
    progression::ProgressionResult,
};

/// Cached read model of one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoreboard {
    /// The match aggregate.
    pub match_entity: MatchEntity,
    /// Every set of the match, by set number.
    pub sets: Vec<SetEntity>,
}

/// Scoreboards keyed by match id.
#[derive(Default)]
pub struct ScoreboardCache {
    entries: DashMap<Uuid, Scoreboard>,
}

impl ScoreboardCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached scoreboard of the match, if any.
    pub fn get(&self, match_id: Uuid) -> Option<Scoreboard> {
        self.entries.get(&match_id).map(|entry| entry.value().clone())
    }

    /// Store a freshly loaded scoreboard.
    pub fn insert(&self, scoreboard: Scoreboard) {
        self.entries
            .insert(scoreboard.match_entity.id, scoreboard);
    }

    /// Drop the match entry. Returns whether one was cached.
    pub fn invalidate(&self, match_id: Uuid) -> bool {
        self.entries.remove(&match_id).is_some()
    }

    /// Drop the entry a progression result made stale.
    ///
    /// Stale means any result flag is set, or the result's set or match snapshot differs from the
    /// cached copy. Returns whether an entry was dropped.
    pub fn apply_progression(&self, result: &ProgressionResult) -> bool {
        let Some(match_id) = result.match_id() else {
            return false;
        };

        let stale = match self.entries.get(&match_id) {
            None => return false,
            Some(cached) => {
                result.set_completed
                    || result.match_completed
                    || result.match_reopened
                    || result.new_set_created
                    || result.match_entity.as_ref() != Some(&cached.match_entity)
                    || result.set.as_ref().is_some_and(|set| {
                        cached.sets.iter().find(|cached| cached.id == set.id) != Some(set)
                    })
            }
        };

        if stale {
            debug!(match_id = %match_id, "scoreboard invalidated");
            self.invalidate(match_id);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::{MatchRulesEntity, MatchStatus, TeamEntity};

    fn scoreboard() -> Scoreboard {
        let now = SystemTime::now();
        let id = Uuid::new_v4();
        let set = SetEntity::new(id, 1);
        let team = |name: &str| TeamEntity {
            name: name.into(),
            players: vec![],
            sets_won: 0,
        };
        Scoreboard {
            match_entity: MatchEntity {
                id,
                teams: [team("Blue"), team("Red")],
                rules: MatchRulesEntity::default(),
                status: MatchStatus::InProgress,
                start_time: Some(now),
                end_time: None,
                sets: vec![set.id],
                current_set: Some(set.id),
                created_at: now,
                updated_at: now,
            },
            sets: vec![set],
        }
    }

    #[test]
    fn unchanged_result_keeps_entry() {
        let cache = ScoreboardCache::new();
        let board = scoreboard();
        cache.insert(board.clone());

        let result = ProgressionResult {
            set: Some(board.sets[0].clone()),
            match_entity: Some(board.match_entity.clone()),
            ..ProgressionResult::default()
        };
        assert!(!cache.apply_progression(&result));
        assert_eq!(cache.get(board.match_entity.id), Some(board));
    }

    #[test]
    fn changed_set_drops_entry() {
        let cache = ScoreboardCache::new();
        let board = scoreboard();
        cache.insert(board.clone());

        let mut set = board.sets[0].clone();
        set.scores = [1, 0];
        let result = ProgressionResult {
            set: Some(set),
            match_entity: Some(board.match_entity.clone()),
            ..ProgressionResult::default()
        };
        assert!(cache.apply_progression(&result));
        assert!(cache.get(board.match_entity.id).is_none());
    }

    #[test]
    fn flags_drop_entry() {
        let cache = ScoreboardCache::new();
        let board = scoreboard();
        cache.insert(board.clone());

        let result = ProgressionResult {
            set: Some(board.sets[0].clone()),
            match_entity: Some(board.match_entity.clone()),
            new_set_created: true,
            ..ProgressionResult::default()
        };
        assert!(cache.apply_progression(&result));
    }
}
