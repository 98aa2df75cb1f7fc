//! Cross-set consistency of a match: sets-won tally, completion or reopening, next set creation.

use std::time::SystemTime;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::{MatchEntity, MatchStatus, SetEntity, SetStatus},
    progression::error::EngineResult,
    state::state_machine::{MatchEvent, MatchStateMachine},
};

/// Effect of [`evaluate_match`] on the match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// One team holds enough sets.
    pub match_completed: bool,
    /// A completed match went back into play.
    pub match_reopened: bool,
    /// Set created to continue the match, not yet persisted.
    pub new_set: Option<SetEntity>,
}

/// Sets won per team, counting completed sets with a winner.
pub fn tally_sets_won<'a>(sets: impl IntoIterator<Item = &'a SetEntity>) -> [u32; 2] {
    let mut tally = [0, 0];
    for set in sets {
        if let (SetStatus::Completed, Some(winner)) = (set.status, set.winner) {
            tally[winner.slot()] += 1;
        }
    }
    tally
}

/// Sets-won tally of every set but `set_id`.
pub fn sets_won_excluding(sets: &[SetEntity], set_id: Uuid) -> [u32; 2] {
    tally_sets_won(sets.iter().filter(|set| set.id != set_id))
}

/// Whether the match disagrees with its sets, as an interrupted commit leaves it.
///
/// `changed` supersedes its stored copy in `sets`.
pub fn out_of_sync(match_entity: &MatchEntity, sets: &[SetEntity], changed: &SetEntity) -> bool {
    let sets_won =
        tally_sets_won(sets.iter().map(|set| if set.id == changed.id { changed } else { set }));
    sets_won != match_entity.sets_won()
        || sets.iter().any(|set| !match_entity.sets.contains(&set.id))
}

/// Reset the teams' `sets_won` from the sets. Returns whether anything changed.
pub fn recompute_sets_won<'a>(
    match_entity: &mut MatchEntity,
    sets: impl IntoIterator<Item = &'a SetEntity>,
) -> bool {
    let tally = tally_sets_won(sets);
    if match_entity.sets_won() == tally {
        return false;
    }
    for (team, won) in match_entity.teams.iter_mut().zip(tally) {
        team.sets_won = won;
    }
    true
}

/// Start a match that has not started yet once one of its sets is in play.
pub fn ensure_match_started(match_entity: &mut MatchEntity, now: SystemTime) -> EngineResult<bool> {
    if match_entity.status != MatchStatus::NotStarted {
        return Ok(false);
    }
    MatchStateMachine::start_match(match_entity, now)?;
    info!(match_id = %match_entity.id, "match started by first set activity");
    Ok(true)
}

/// Propagate a set that moved to or from `Completed` onto its match.
///
/// `sets` lists every set of the match; the entry with `changed.id` is superseded by `changed`.
pub fn evaluate_match(
    match_entity: &mut MatchEntity,
    sets: &[SetEntity],
    changed: &SetEntity,
    now: SystemTime,
) -> EngineResult<MatchOutcome> {
    let before = match_entity.clone();
    let sets: Vec<&SetEntity> = sets
        .iter()
        .map(|set| if set.id == changed.id { changed } else { set })
        .collect();

    let mut by_number = sets.clone();
    by_number.sort_by_key(|set| set.set_number);
    for set in by_number {
        if !match_entity.sets.contains(&set.id) {
            match_entity.sets.push(set.id);
        }
    }
    recompute_sets_won(match_entity, sets.iter().copied());
    let tally = match_entity.sets_won();

    if match_entity.status == MatchStatus::Aborted {
        debug!(match_id = %match_entity.id, sets_won = ?tally, "aborted match re-tallied");
        touch(match_entity, &before, now);
        return Ok(MatchOutcome::default());
    }

    let rules = &match_entity.rules;
    if tally.iter().any(|won| *won >= rules.num_sets_to_win) {
        if match_entity.status != MatchStatus::Completed {
            ensure_match_started(match_entity, now)?;
            MatchStateMachine::end_match(match_entity, now)?;
            info!(match_id = %match_entity.id, sets_won = ?tally, "match completed");
        }
        touch(match_entity, &before, now);
        return Ok(MatchOutcome {
            match_completed: true,
            ..MatchOutcome::default()
        });
    }

    let mut outcome = MatchOutcome::default();
    if match_entity.status == MatchStatus::Completed {
        MatchStateMachine::apply(match_entity, MatchEvent::Reopen, now)?;
        outcome.match_reopened = true;
        info!(match_id = %match_entity.id, sets_won = ?tally, "match reopened");
    }

    if changed.status == SetStatus::Completed {
        let next_open = sets
            .iter()
            .filter(|set| set.set_number > changed.set_number && set.status != SetStatus::Completed)
            .min_by_key(|set| set.set_number);

        if let Some(next) = next_open {
            match_entity.current_set = Some(next.id);
        } else if sets.iter().all(|set| set.status == SetStatus::Completed) {
            let set_number = sets.iter().map(|set| set.set_number).max().unwrap_or(0) + 1;
            let new_set = SetEntity::new(match_entity.id, set_number);
            match_entity.sets.push(new_set.id);
            match_entity.current_set = Some(new_set.id);
            info!(match_id = %match_entity.id, set_number, "next set created");
            outcome.new_set = Some(new_set);
        }
    } else {
        // Play stays in a later set already under way, otherwise it resumes in this one.
        let later_in_play = sets
            .iter()
            .filter(|set| set.set_number > changed.set_number && set.status == SetStatus::InProgress)
            .min_by_key(|set| set.set_number);
        match_entity.current_set = Some(later_in_play.map_or(changed.id, |set| set.id));
    }

    let current_closed = sets
        .iter()
        .any(|set| Some(set.id) == match_entity.current_set && set.status == SetStatus::Completed);
    if current_closed {
        if let Some(open) = sets
            .iter()
            .filter(|set| set.status != SetStatus::Completed)
            .min_by_key(|set| set.set_number)
        {
            match_entity.current_set = Some(open.id);
        }
    }

    touch(match_entity, &before, now);
    Ok(outcome)
}

fn touch(match_entity: &mut MatchEntity, before: &MatchEntity, now: SystemTime) {
    if match_entity != before {
        match_entity.updated_at = now;
    }
}
