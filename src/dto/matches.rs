//! DTO definitions for match setup and the scoreboard read model.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{
        MatchEntity, MatchRulesEntity, MatchStatus, SetEntity, SetStatus, TeamEntity,
    },
    dto::{format_system_time, validation::validate_display_name},
    state::Scoreboard,
};

/// Payload used to set up a new match and its first set.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateMatchRequest {
    #[validate(length(equal = 2))]
    #[validate(nested)]
    pub teams: Vec<TeamInput>,
    /// Rules left out fall back to the configured defaults.
    #[serde(default)]
    #[validate(nested)]
    pub rules: Option<MatchRulesInput>,
}

/// Incoming team definition.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TeamInput {
    pub name: String,
    #[serde(default)]
    pub players: Vec<String>,
}

impl Validate for TeamInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_display_name(&self.name) {
            errors.add("name", e);
        }

        if let Some(e) = self
            .players
            .iter()
            .find_map(|player| validate_display_name(player).err())
        {
            errors.add("players", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Optional per-match overrides of the configured rules.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct MatchRulesInput {
    #[validate(range(min = 1))]
    pub num_goals_to_win: Option<u32>,
    #[validate(range(min = 1))]
    pub num_sets_to_win: Option<u32>,
    pub two_ahead: Option<bool>,
    pub two_ahead_up_until: Option<u32>,
    pub timeouts_per_set: Option<u32>,
}

impl MatchRulesInput {
    /// Fill every missing field from `defaults`.
    pub fn resolve(self, defaults: &MatchRulesEntity) -> MatchRulesEntity {
        MatchRulesEntity {
            num_goals_to_win: self.num_goals_to_win.unwrap_or(defaults.num_goals_to_win),
            num_sets_to_win: self.num_sets_to_win.unwrap_or(defaults.num_sets_to_win),
            two_ahead: self.two_ahead.unwrap_or(defaults.two_ahead),
            two_ahead_up_until: self
                .two_ahead_up_until
                .unwrap_or(defaults.two_ahead_up_until),
            timeouts_per_set: self.timeouts_per_set.unwrap_or(defaults.timeouts_per_set),
        }
    }
}

/// Match lifecycle as exposed over the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatusDto {
    NotStarted,
    InProgress,
    Completed,
    Aborted,
}

impl From<MatchStatus> for MatchStatusDto {
    fn from(value: MatchStatus) -> Self {
        match value {
            MatchStatus::NotStarted => MatchStatusDto::NotStarted,
            MatchStatus::InProgress => MatchStatusDto::InProgress,
            MatchStatus::Completed => MatchStatusDto::Completed,
            MatchStatus::Aborted => MatchStatusDto::Aborted,
        }
    }
}

/// Set lifecycle as exposed over the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SetStatusDto {
    NotStarted,
    InProgress,
    Completed,
}

impl From<SetStatus> for SetStatusDto {
    fn from(value: SetStatus) -> Self {
        match value {
            SetStatus::NotStarted => SetStatusDto::NotStarted,
            SetStatus::InProgress => SetStatusDto::InProgress,
            SetStatus::Completed => SetStatusDto::Completed,
        }
    }
}

/// Public view of one team.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamSummary {
    pub name: String,
    pub players: Vec<String>,
    pub sets_won: u32,
}

impl From<TeamEntity> for TeamSummary {
    fn from(value: TeamEntity) -> Self {
        Self {
            name: value.name,
            players: value.players,
            sets_won: value.sets_won,
        }
    }
}

/// Rules a match is played under.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchRulesSummary {
    pub num_goals_to_win: u32,
    pub num_sets_to_win: u32,
    pub two_ahead: bool,
    pub two_ahead_up_until: u32,
    pub timeouts_per_set: u32,
}

impl From<MatchRulesEntity> for MatchRulesSummary {
    fn from(value: MatchRulesEntity) -> Self {
        Self {
            num_goals_to_win: value.num_goals_to_win,
            num_sets_to_win: value.num_sets_to_win,
            two_ahead: value.two_ahead,
            two_ahead_up_until: value.two_ahead_up_until,
            timeouts_per_set: value.timeouts_per_set,
        }
    }
}

/// Public view of a match. Timestamps are RFC 3339.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchSummary {
    pub id: Uuid,
    pub teams: Vec<TeamSummary>,
    pub rules: MatchRulesSummary,
    pub status: MatchStatusDto,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub sets: Vec<Uuid>,
    pub current_set: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<MatchEntity> for MatchSummary {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id,
            teams: value.teams.into_iter().map(Into::into).collect(),
            rules: value.rules.into(),
            status: value.status.into(),
            start_time: value.start_time.map(format_system_time),
            end_time: value.end_time.map(format_system_time),
            sets: value.sets,
            current_set: value.current_set,
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// Public view of a set.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SetSummary {
    pub id: Uuid,
    pub match_id: Uuid,
    pub set_number: u32,
    #[schema(value_type = Vec<u32>)]
    pub scores: [u32; 2],
    #[schema(value_type = Vec<u32>)]
    pub timeouts_used: [u32; 2],
    pub goals: Vec<Uuid>,
    pub timeouts: Vec<Uuid>,
    pub status: SetStatusDto,
    pub winner: Option<u8>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl From<SetEntity> for SetSummary {
    fn from(value: SetEntity) -> Self {
        Self {
            id: value.id,
            match_id: value.match_id,
            set_number: value.set_number,
            scores: value.scores,
            timeouts_used: value.timeouts_used,
            goals: value.goals,
            timeouts: value.timeouts,
            status: value.status.into(),
            winner: value.winner.map(Into::into),
            start_time: value.start_time.map(format_system_time),
            end_time: value.end_time.map(format_system_time),
        }
    }
}

/// Read model of a match with every set in play order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoreboardResponse {
    #[serde(rename = "match")]
    pub match_summary: MatchSummary,
    pub sets: Vec<SetSummary>,
}

impl From<Scoreboard> for ScoreboardResponse {
    fn from(value: Scoreboard) -> Self {
        Self {
            match_summary: value.match_entity.into(),
            sets: value.sets.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> CreateMatchRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn exactly_two_teams_are_required() {
        let one = request(r#"{ "teams": [{ "name": "Blue" }] }"#);
        assert!(one.validate().is_err());

        let two = request(r#"{ "teams": [{ "name": "Blue" }, { "name": "Red" }] }"#);
        assert!(two.validate().is_ok());
    }

    #[test]
    fn blank_names_are_rejected() {
        let blank_team = request(r#"{ "teams": [{ "name": " " }, { "name": "Red" }] }"#);
        assert!(blank_team.validate().is_err());

        let blank_player =
            request(r#"{ "teams": [{ "name": "Blue", "players": [""] }, { "name": "Red" }] }"#);
        assert!(blank_player.validate().is_err());
    }

    #[test]
    fn zero_goal_threshold_is_rejected() {
        let req = request(
            r#"{ "teams": [{ "name": "Blue" }, { "name": "Red" }], "rules": { "num_goals_to_win": 0 } }"#,
        );
        assert!(req.validate().is_err());
    }

    #[test]
    fn missing_rules_take_defaults() {
        let input = MatchRulesInput {
            num_goals_to_win: Some(10),
            ..MatchRulesInput::default()
        };
        let rules = input.resolve(&MatchRulesEntity::default());
        assert_eq!(rules.num_goals_to_win, 10);
        assert_eq!(rules.num_sets_to_win, 2);
        assert!(rules.two_ahead);
    }

    #[test]
    fn open_set_omits_absent_fields() {
        let set = SetEntity::new(Uuid::new_v4(), 1);
        let json = serde_json::to_value(SetSummary::from(set)).unwrap();
        assert!(json.get("winner").is_none());
        assert!(json.get("end_time").is_none());
        assert_eq!(json["status"], "not_started");
    }
}
