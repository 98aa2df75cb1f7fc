use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position of a team inside a match (`0` or `1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TeamIndex(u8);

impl TeamIndex {
    /// First team of the match.
    pub const FIRST: TeamIndex = TeamIndex(0);
    /// Second team of the match.
    pub const SECOND: TeamIndex = TeamIndex(1);

    /// Build an index from a raw value, rejecting anything but `0` and `1`.
    pub fn new(value: u8) -> Option<Self> {
        match value {
            0 | 1 => Some(Self(value)),
            _ => None,
        }
    }

    /// Slot to use when indexing a two-team array.
    pub fn slot(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for TeamIndex {
    type Error = InvalidTeamIndex;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidTeamIndex(value))
    }
}

impl From<TeamIndex> for u8 {
    fn from(value: TeamIndex) -> Self {
        value.0
    }
}

impl fmt::Display for TeamIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raised when a raw team index is outside `{0, 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("team index must be 0 or 1 (got {0})")]
pub struct InvalidTeamIndex(pub u8);

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Created but no play has happened yet.
    NotStarted,
    /// Sets are being played.
    InProgress,
    /// One team reached the required number of sets.
    Completed,
    /// Stopped by an operator; terminal.
    Aborted,
}

/// Lifecycle of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetStatus {
    /// No accepted event yet.
    NotStarted,
    /// Receiving events.
    InProgress,
    /// A winner has been determined.
    Completed,
}

/// Rod a goal was scored from. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRow {
    /// Goalkeeper rod.
    Goalkeeper,
    /// Two-man defence rod.
    Defense,
    /// Five-man midfield rod.
    Midfield,
    /// Three-man attack rod.
    Attack,
}

/// Scoring rules of a match. Immutable once the match exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchRulesEntity {
    /// Goals needed to win a set.
    pub num_goals_to_win: u32,
    /// Sets needed to win the match.
    pub num_sets_to_win: u32,
    /// Whether the deciding set must be won by two goals.
    pub two_ahead: bool,
    /// Score from which the two-goal margin no longer applies.
    pub two_ahead_up_until: u32,
    /// Timeouts each team may call per set.
    pub timeouts_per_set: u32,
}

impl Default for MatchRulesEntity {
    fn default() -> Self {
        Self {
            num_goals_to_win: 5,
            num_sets_to_win: 2,
            two_ahead: true,
            two_ahead_up_until: 8,
            timeouts_per_set: 2,
        }
    }
}

/// One side of a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Display name of the team.
    pub name: String,
    /// Player names.
    pub players: Vec<String>,
    /// Completed sets won by this team. Derived by the progression engine.
    pub sets_won: u32,
}

/// Aggregate match entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Primary key of the match.
    pub id: Uuid,
    /// Exactly two teams, indexed by [`TeamIndex`].
    pub teams: [TeamEntity; 2],
    /// Scoring rules.
    pub rules: MatchRulesEntity,
    /// Current lifecycle status.
    pub status: MatchStatus,
    /// Set when the match enters play.
    pub start_time: Option<SystemTime>,
    /// Set when the match completes or is aborted.
    pub end_time: Option<SystemTime>,
    /// Set identifiers in play order.
    pub sets: Vec<Uuid>,
    /// Set currently receiving events.
    pub current_set: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the match entity was updated.
    pub updated_at: SystemTime,
}

impl MatchEntity {
    /// Current sets-won tally of both teams.
    pub fn sets_won(&self) -> [u32; 2] {
        [self.teams[0].sets_won, self.teams[1].sets_won]
    }
}

/// A set of a match. Scores and timeout usage are projections of the event logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetEntity {
    /// Primary key of the set.
    pub id: Uuid,
    /// Owning match.
    pub match_id: Uuid,
    /// 1-based position in the match.
    pub set_number: u32,
    /// Non-voided goals per team.
    pub scores: [u32; 2],
    /// Non-voided timeouts per team.
    pub timeouts_used: [u32; 2],
    /// Non-voided goal ids in timestamp order.
    pub goals: Vec<Uuid>,
    /// Non-voided timeout ids in timestamp order.
    pub timeouts: Vec<Uuid>,
    /// Lifecycle status.
    pub status: SetStatus,
    /// Present iff the set is completed.
    pub winner: Option<TeamIndex>,
    /// Set on the first accepted event or explicit start.
    pub start_time: Option<SystemTime>,
    /// Present iff the set is completed.
    pub end_time: Option<SystemTime>,
}

impl SetEntity {
    /// Fresh, untouched set.
    pub fn new(match_id: Uuid, set_number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id,
            set_number,
            scores: [0, 0],
            timeouts_used: [0, 0],
            goals: Vec::new(),
            timeouts: Vec::new(),
            status: SetStatus::NotStarted,
            winner: None,
            start_time: None,
            end_time: None,
        }
    }

    /// Whether the set has at least one non-voided goal or timeout.
    pub fn has_events(&self) -> bool {
        !self.goals.is_empty() || !self.timeouts.is_empty()
    }
}

/// A goal scored during a set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoalEntity {
    /// Primary key of the goal.
    pub id: Uuid,
    /// Owning match.
    pub match_id: Uuid,
    /// Owning set.
    pub set_id: Uuid,
    /// Scoring team.
    pub team_index: TeamIndex,
    /// When the goal was scored.
    pub timestamp: SystemTime,
    /// Rod the goal was scored from.
    pub scoring_row: Option<ScoringRow>,
    /// Excluded from scoring by a referee correction.
    pub voided: bool,
}

/// A timeout called during a set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutEntity {
    /// Primary key of the timeout.
    pub id: Uuid,
    /// Owning match.
    pub match_id: Uuid,
    /// Owning set.
    pub set_id: Uuid,
    /// Team that called the timeout.
    pub team_index: TeamIndex,
    /// When the timeout was called.
    pub timestamp: SystemTime,
    /// Excluded from the tally by a referee correction.
    pub voided: bool,
}
