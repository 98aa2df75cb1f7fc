//! Set status state machine and winning rules.
//!
//! Every function here is pure: callers hand in the set, the match rules and the sets-won tally of
//! the *other* sets of the match, and persist whatever comes out.

use std::time::SystemTime;

use tracing::debug;

use crate::{
    dao::models::{MatchRulesEntity, SetEntity, SetStatus, TeamIndex},
    progression::error::{EngineResult, ProgressionError, SetAction},
};

/// What [`evaluate`] did to a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetTransition {
    /// Nothing changed.
    Unchanged,
    /// `NotStarted -> InProgress`.
    Started,
    /// The winning condition now holds; the set is completed.
    Completed,
    /// The winning condition no longer holds; the set is back in play.
    Reopened,
    /// Still completed, but a correction handed the win to the other team.
    WinnerChanged,
}

impl SetTransition {
    /// Whether the set moved to or from `Completed`, or changed winner.
    pub fn affects_match(self) -> bool {
        matches!(
            self,
            SetTransition::Completed | SetTransition::Reopened | SetTransition::WinnerChanged
        )
    }

    /// Whether the set was (re)awarded to a team in this step.
    pub fn awarded(self) -> bool {
        matches!(self, SetTransition::Completed | SetTransition::WinnerChanged)
    }
}

/// Move a `NotStarted` set with at least one event into play.
pub fn maybe_auto_start(set: &mut SetEntity, now: SystemTime) -> bool {
    if set.status != SetStatus::NotStarted || !set.has_events() {
        return false;
    }
    set.status = SetStatus::InProgress;
    set.start_time.get_or_insert(now);
    debug!(set_id = %set.id, set_number = set.set_number, "set auto-started");
    true
}

/// Explicit `NotStarted -> InProgress`, allowed with no events yet.
pub fn start_set(set: &mut SetEntity, now: SystemTime) -> EngineResult<()> {
    if set.status != SetStatus::NotStarted {
        return Err(ProgressionError::InvalidSetTransition {
            from: set.status,
            action: SetAction::Start,
        });
    }
    set.status = SetStatus::InProgress;
    set.start_time.get_or_insert(now);
    Ok(())
}

/// Either team winning this set ends the match.
pub fn is_deciding_set(rules: &MatchRulesEntity, sets_won: [u32; 2]) -> bool {
    let needed = rules.num_sets_to_win.saturating_sub(1);
    sets_won[0] == needed && sets_won[1] == needed
}

/// The two-goal margin applies only in the deciding set and only below the cap.
pub fn should_apply_two_ahead(
    rules: &MatchRulesEntity,
    sets_won: [u32; 2],
    max_score: u32,
) -> bool {
    rules.two_ahead && is_deciding_set(rules, sets_won) && max_score < rules.two_ahead_up_until
}

/// Team that has won the set with these scores, if any. A tie is never a win.
pub fn check_winning_condition(
    scores: [u32; 2],
    rules: &MatchRulesEntity,
    sets_won: [u32; 2],
) -> Option<TeamIndex> {
    let (leader, max, min) = if scores[0] > scores[1] {
        (TeamIndex::FIRST, scores[0], scores[1])
    } else if scores[1] > scores[0] {
        (TeamIndex::SECOND, scores[1], scores[0])
    } else {
        return None;
    };

    if max < rules.num_goals_to_win {
        return None;
    }
    if should_apply_two_ahead(rules, sets_won, max) && max - min < 2 {
        return None;
    }
    Some(leader)
}

/// `InProgress -> Completed`.
pub fn complete_set(set: &mut SetEntity, winner: TeamIndex, now: SystemTime) -> EngineResult<()> {
    if set.status != SetStatus::InProgress {
        return Err(ProgressionError::InvalidSetTransition {
            from: set.status,
            action: SetAction::Complete,
        });
    }
    set.status = SetStatus::Completed;
    set.winner = Some(winner);
    set.end_time = Some(now);
    Ok(())
}

/// `Completed -> InProgress`.
pub fn reopen_set(set: &mut SetEntity) -> EngineResult<()> {
    if set.status != SetStatus::Completed {
        return Err(ProgressionError::InvalidSetTransition {
            from: set.status,
            action: SetAction::Reopen,
        });
    }
    set.status = SetStatus::InProgress;
    set.winner = None;
    set.end_time = None;
    Ok(())
}

/// Drive the set toward the state its current scores call for.
///
/// Converges: calling it again with the same scores returns [`SetTransition::Unchanged`].
pub fn evaluate(
    set: &mut SetEntity,
    rules: &MatchRulesEntity,
    sets_won: [u32; 2],
    now: SystemTime,
) -> EngineResult<SetTransition> {
    let winner = check_winning_condition(set.scores, rules, sets_won);

    let transition = match (set.status, winner) {
        (SetStatus::NotStarted | SetStatus::InProgress, Some(winner)) => {
            if set.status == SetStatus::NotStarted {
                start_set(set, now)?;
            }
            complete_set(set, winner, now)?;
            SetTransition::Completed
        }
        (SetStatus::NotStarted, None) => {
            if maybe_auto_start(set, now) {
                SetTransition::Started
            } else {
                SetTransition::Unchanged
            }
        }
        (SetStatus::Completed, None) => {
            reopen_set(set)?;
            SetTransition::Reopened
        }
        (SetStatus::Completed, Some(winner)) if set.winner != Some(winner) => {
            set.winner = Some(winner);
            set.end_time = Some(now);
            SetTransition::WinnerChanged
        }
        _ => SetTransition::Unchanged,
    };

    if transition != SetTransition::Unchanged {
        debug!(
            set_id = %set.id,
            set_number = set.set_number,
            scores = ?set.scores,
            transition = ?transition,
            "set re-evaluated"
        );
    }
    Ok(transition)
}
