//! DTO definitions for goals, timeouts, set actions and the progression outcome.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{GoalEntity, ScoringRow, TimeoutEntity},
    dto::{
        format_system_time,
        matches::{MatchSummary, SetSummary},
        validation::validate_team_index,
    },
    progression::ProgressionResult,
};

/// Rod a goal was scored from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRowDto {
    Goalkeeper,
    Defense,
    Midfield,
    Attack,
}

impl From<ScoringRowDto> for ScoringRow {
    fn from(value: ScoringRowDto) -> Self {
        match value {
            ScoringRowDto::Goalkeeper => ScoringRow::Goalkeeper,
            ScoringRowDto::Defense => ScoringRow::Defense,
            ScoringRowDto::Midfield => ScoringRow::Midfield,
            ScoringRowDto::Attack => ScoringRow::Attack,
        }
    }
}

impl From<ScoringRow> for ScoringRowDto {
    fn from(value: ScoringRow) -> Self {
        match value {
            ScoringRow::Goalkeeper => ScoringRowDto::Goalkeeper,
            ScoringRow::Defense => ScoringRowDto::Defense,
            ScoringRow::Midfield => ScoringRowDto::Midfield,
            ScoringRow::Attack => ScoringRowDto::Attack,
        }
    }
}

/// Goal scored by one team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordGoalRequest {
    pub team_index: u8,
    /// Defaults to the match's current set.
    #[serde(default)]
    pub set_id: Option<Uuid>,
    #[serde(default)]
    pub scoring_row: Option<ScoringRowDto>,
}

impl Validate for RecordGoalRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_team_index(self.team_index) {
            errors.add("team_index", e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Timeout called by one team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordTimeoutRequest {
    pub team_index: u8,
    /// Defaults to the match's current set.
    #[serde(default)]
    pub set_id: Option<Uuid>,
}

impl Validate for RecordTimeoutRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_team_index(self.team_index) {
            errors.add("team_index", e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Referee correction flipping an event in or out of the tally.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetVoidedRequest {
    pub voided: bool,
}

/// Operator-forced completion of a set.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CompleteSetRequest {
    #[validate(range(max = 1))]
    pub winner: u8,
}

/// Public view of a goal.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GoalSummary {
    pub id: Uuid,
    pub match_id: Uuid,
    pub set_id: Uuid,
    pub team_index: u8,
    pub timestamp: String,
    pub scoring_row: Option<ScoringRowDto>,
    pub voided: bool,
}

impl From<GoalEntity> for GoalSummary {
    fn from(value: GoalEntity) -> Self {
        Self {
            id: value.id,
            match_id: value.match_id,
            set_id: value.set_id,
            team_index: value.team_index.into(),
            timestamp: format_system_time(value.timestamp),
            scoring_row: value.scoring_row.map(Into::into),
            voided: value.voided,
        }
    }
}

/// Public view of a timeout.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimeoutSummary {
    pub id: Uuid,
    pub match_id: Uuid,
    pub set_id: Uuid,
    pub team_index: u8,
    pub timestamp: String,
    pub voided: bool,
}

impl From<TimeoutEntity> for TimeoutSummary {
    fn from(value: TimeoutEntity) -> Self {
        Self {
            id: value.id,
            match_id: value.match_id,
            set_id: value.set_id,
            team_index: value.team_index.into(),
            timestamp: format_system_time(value.timestamp),
            voided: value.voided,
        }
    }
}

/// Set and match state after a scoring mutation.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProgressionSummary {
    pub set: Option<SetSummary>,
    #[serde(rename = "match")]
    pub match_summary: Option<MatchSummary>,
    pub set_completed: bool,
    pub match_completed: bool,
    pub match_reopened: bool,
    pub new_set_created: bool,
}

impl From<ProgressionResult> for ProgressionSummary {
    fn from(value: ProgressionResult) -> Self {
        Self {
            set: value.set.map(Into::into),
            match_summary: value.match_entity.map(Into::into),
            set_completed: value.set_completed,
            match_completed: value.match_completed,
            match_reopened: value.match_reopened,
            new_set_created: value.new_set_created,
        }
    }
}

/// Response to recording or correcting a goal.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GoalResponse {
    pub goal: GoalSummary,
    pub progression: ProgressionSummary,
}

/// Response to recording or correcting a timeout.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimeoutResponse {
    pub timeout: TimeoutSummary,
    pub progression: ProgressionSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_index_is_bounded() {
        let ok: RecordGoalRequest = serde_json::from_str(r#"{ "team_index": 1 }"#).unwrap();
        assert!(ok.validate().is_ok());
        assert!(ok.set_id.is_none());

        let bad: RecordTimeoutRequest = serde_json::from_str(r#"{ "team_index": 2 }"#).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn winner_is_bounded() {
        let bad: CompleteSetRequest = serde_json::from_str(r#"{ "winner": 3 }"#).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn scoring_row_is_snake_case() {
        let req: RecordGoalRequest =
            serde_json::from_str(r#"{ "team_index": 0, "scoring_row": "midfield" }"#).unwrap();
        assert_eq!(req.scoring_row, Some(ScoringRowDto::Midfield));
    }

    #[test]
    fn summary_omits_missing_match() {
        let summary = ProgressionSummary::from(ProgressionResult::default());
        let json = serde_json::to_value(summary).unwrap();
        assert!(json.get("match").is_none());
        assert_eq!(json["set_completed"], false);
    }
}
