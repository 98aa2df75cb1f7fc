use std::time::SystemTime;

use thiserror::Error;

use crate::dao::models::{MatchEntity, MatchStatus};

/// Events that can be applied to a match lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// Operator starts play, or the first set receives an event.
    Start,
    /// A team reached the required number of sets, or the operator ends the match.
    End,
    /// Operator stops the match for good.
    Abort,
    /// A correction invalidated the result of a completed match.
    Reopen,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The status the match was in when the invalid event was received.
    pub from: MatchStatus,
    /// The event that cannot be applied from this status.
    pub event: MatchEvent,
}

/// Narrow lifecycle of a match.
///
/// `NotStarted -> InProgress -> Completed`, with `Aborted` reachable from the first two and
/// `Completed -> InProgress` reserved for progression corrections. `Aborted` is terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchStateMachine;

impl MatchStateMachine {
    /// Compute the status reached by applying `event` from `from`.
    pub fn compute_transition(
        from: MatchStatus,
        event: MatchEvent,
    ) -> Result<MatchStatus, InvalidTransition> {
        let next = match (from, event) {
            (MatchStatus::NotStarted, MatchEvent::Start) => MatchStatus::InProgress,
            (MatchStatus::InProgress, MatchEvent::End) => MatchStatus::Completed,
            (MatchStatus::NotStarted | MatchStatus::InProgress, MatchEvent::Abort) => {
                MatchStatus::Aborted
            }
            (MatchStatus::Completed, MatchEvent::Reopen) => MatchStatus::InProgress,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }

    /// Apply `event` to the match, stamping the timestamps that go with the new status.
    pub fn apply(
        entity: &mut MatchEntity,
        event: MatchEvent,
        now: SystemTime,
    ) -> Result<MatchStatus, InvalidTransition> {
        let next = Self::compute_transition(entity.status, event)?;

        match event {
            MatchEvent::Start => entity.start_time = Some(now),
            MatchEvent::End | MatchEvent::Abort => entity.end_time = Some(now),
            MatchEvent::Reopen => entity.end_time = None,
        }
        entity.status = next;
        entity.updated_at = now;

        Ok(next)
    }

    /// `NotStarted -> InProgress`.
    pub fn start_match(
        entity: &mut MatchEntity,
        now: SystemTime,
    ) -> Result<MatchStatus, InvalidTransition> {
        Self::apply(entity, MatchEvent::Start, now)
    }

    /// `InProgress -> Completed`.
    pub fn end_match(
        entity: &mut MatchEntity,
        now: SystemTime,
    ) -> Result<MatchStatus, InvalidTransition> {
        Self::apply(entity, MatchEvent::End, now)
    }

    /// `NotStarted | InProgress -> Aborted`.
    pub fn abort_match(
        entity: &mut MatchEntity,
        now: SystemTime,
    ) -> Result<MatchStatus, InvalidTransition> {
        Self::apply(entity, MatchEvent::Abort, now)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::dao::models::{MatchRulesEntity, TeamEntity};

    fn fresh_match() -> MatchEntity {
        let created = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let team = |name: &str| TeamEntity {
            name: name.into(),
            players: vec![],
            sets_won: 0,
        };
        MatchEntity {
            id: Uuid::new_v4(),
            teams: [team("Blue"), team("Red")],
            rules: MatchRulesEntity::default(),
            status: MatchStatus::NotStarted,
            start_time: None,
            end_time: None,
            sets: vec![],
            current_set: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn full_happy_path_through_match() {
        let mut entity = fresh_match();
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(2_000);
        let end = start + Duration::from_secs(600);

        assert_eq!(
            MatchStateMachine::start_match(&mut entity, start),
            Ok(MatchStatus::InProgress)
        );
        assert_eq!(entity.start_time, Some(start));

        assert_eq!(
            MatchStateMachine::end_match(&mut entity, end),
            Ok(MatchStatus::Completed)
        );
        assert_eq!(entity.end_time, Some(end));
        assert_eq!(entity.updated_at, end);
    }

    #[test]
    fn abort_is_terminal() {
        let mut entity = fresh_match();
        let now = SystemTime::now();
        MatchStateMachine::abort_match(&mut entity, now).unwrap();
        assert_eq!(entity.status, MatchStatus::Aborted);
        assert_eq!(entity.end_time, Some(now));

        for event in [
            MatchEvent::Start,
            MatchEvent::End,
            MatchEvent::Abort,
            MatchEvent::Reopen,
        ] {
            let err = MatchStateMachine::apply(&mut entity, event, now).unwrap_err();
            assert_eq!(err.from, MatchStatus::Aborted);
            assert_eq!(err.event, event);
        }
    }

    #[test]
    fn invalid_transition_leaves_match_untouched() {
        let mut entity = fresh_match();
        let before = entity.clone();
        let err = MatchStateMachine::end_match(&mut entity, SystemTime::now()).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                from: MatchStatus::NotStarted,
                event: MatchEvent::End,
            }
        );
        assert_eq!(entity, before);
    }

    #[test]
    fn completed_match_cannot_be_aborted_or_restarted() {
        assert!(
            MatchStateMachine::compute_transition(MatchStatus::Completed, MatchEvent::Abort)
                .is_err()
        );
        assert!(
            MatchStateMachine::compute_transition(MatchStatus::Completed, MatchEvent::Start)
                .is_err()
        );
    }

    #[test]
    fn reopen_clears_end_time() {
        let mut entity = fresh_match();
        let now = SystemTime::now();
        MatchStateMachine::start_match(&mut entity, now).unwrap();
        MatchStateMachine::end_match(&mut entity, now).unwrap();

        assert_eq!(
            MatchStateMachine::apply(&mut entity, MatchEvent::Reopen, now),
            Ok(MatchStatus::InProgress)
        );
        assert_eq!(entity.end_time, None);
        assert!(entity.start_time.is_some());
    }
}
