use mongodb::bson::{self, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    GoalEntity, MatchEntity, MatchRulesEntity, MatchStatus, ScoringRow, SetEntity, SetStatus,
    TeamEntity, TeamIndex, TimeoutEntity,
};

use super::error::MongoDaoError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    teams: Vec<TeamEntity>,
    rules: MatchRulesEntity,
    status: MatchStatus,
    start_time: Option<DateTime>,
    end_time: Option<DateTime>,
    sets: Vec<bson::Uuid>,
    current_set: Option<bson::Uuid>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: to_bson_uuid(value.id),
            teams: value.teams.into(),
            rules: value.rules,
            status: value.status,
            start_time: value.start_time.map(DateTime::from_system_time),
            end_time: value.end_time.map(DateTime::from_system_time),
            sets: value.sets.into_iter().map(to_bson_uuid).collect(),
            current_set: value.current_set.map(to_bson_uuid),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoMatchDocument> for MatchEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoMatchDocument) -> Result<Self, Self::Error> {
        let id = from_bson_uuid(value.id);
        let count = value.teams.len();
        let teams: [TeamEntity; 2] =
            value
                .teams
                .try_into()
                .map_err(|_| MongoDaoError::InvalidDocument {
                    id,
                    reason: format!("expected 2 teams, found {count}"),
                })?;

        Ok(Self {
            id,
            teams,
            rules: value.rules,
            status: value.status,
            start_time: value.start_time.map(DateTime::to_system_time),
            end_time: value.end_time.map(DateTime::to_system_time),
            sets: value.sets.into_iter().map(from_bson_uuid).collect(),
            current_set: value.current_set.map(from_bson_uuid),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSetDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    match_id: bson::Uuid,
    set_number: u32,
    scores: [u32; 2],
    timeouts_used: [u32; 2],
    goals: Vec<bson::Uuid>,
    timeouts: Vec<bson::Uuid>,
    status: SetStatus,
    winner: Option<TeamIndex>,
    start_time: Option<DateTime>,
    end_time: Option<DateTime>,
}

impl From<SetEntity> for MongoSetDocument {
    fn from(value: SetEntity) -> Self {
        Self {
            id: to_bson_uuid(value.id),
            match_id: to_bson_uuid(value.match_id),
            set_number: value.set_number,
            scores: value.scores,
            timeouts_used: value.timeouts_used,
            goals: value.goals.into_iter().map(to_bson_uuid).collect(),
            timeouts: value.timeouts.into_iter().map(to_bson_uuid).collect(),
            status: value.status,
            winner: value.winner,
            start_time: value.start_time.map(DateTime::from_system_time),
            end_time: value.end_time.map(DateTime::from_system_time),
        }
    }
}

impl From<MongoSetDocument> for SetEntity {
    fn from(value: MongoSetDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            match_id: from_bson_uuid(value.match_id),
            set_number: value.set_number,
            scores: value.scores,
            timeouts_used: value.timeouts_used,
            goals: value.goals.into_iter().map(from_bson_uuid).collect(),
            timeouts: value.timeouts.into_iter().map(from_bson_uuid).collect(),
            status: value.status,
            winner: value.winner,
            start_time: value.start_time.map(DateTime::to_system_time),
            end_time: value.end_time.map(DateTime::to_system_time),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGoalDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    match_id: bson::Uuid,
    set_id: bson::Uuid,
    team_index: TeamIndex,
    timestamp: DateTime,
    scoring_row: Option<ScoringRow>,
    #[serde(default)]
    voided: bool,
}

impl From<GoalEntity> for MongoGoalDocument {
    fn from(value: GoalEntity) -> Self {
        Self {
            id: to_bson_uuid(value.id),
            match_id: to_bson_uuid(value.match_id),
            set_id: to_bson_uuid(value.set_id),
            team_index: value.team_index,
            timestamp: DateTime::from_system_time(value.timestamp),
            scoring_row: value.scoring_row,
            voided: value.voided,
        }
    }
}

impl From<MongoGoalDocument> for GoalEntity {
    fn from(value: MongoGoalDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            match_id: from_bson_uuid(value.match_id),
            set_id: from_bson_uuid(value.set_id),
            team_index: value.team_index,
            timestamp: value.timestamp.to_system_time(),
            scoring_row: value.scoring_row,
            voided: value.voided,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTimeoutDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    match_id: bson::Uuid,
    set_id: bson::Uuid,
    team_index: TeamIndex,
    timestamp: DateTime,
    #[serde(default)]
    voided: bool,
}

impl From<TimeoutEntity> for MongoTimeoutDocument {
    fn from(value: TimeoutEntity) -> Self {
        Self {
            id: to_bson_uuid(value.id),
            match_id: to_bson_uuid(value.match_id),
            set_id: to_bson_uuid(value.set_id),
            team_index: value.team_index,
            timestamp: DateTime::from_system_time(value.timestamp),
            voided: value.voided,
        }
    }
}

impl From<MongoTimeoutDocument> for TimeoutEntity {
    fn from(value: MongoTimeoutDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            match_id: from_bson_uuid(value.match_id),
            set_id: from_bson_uuid(value.set_id),
            team_index: value.team_index,
            timestamp: value.timestamp.to_system_time(),
            voided: value.voided,
        }
    }
}

pub fn to_bson_uuid(id: Uuid) -> bson::Uuid {
    bson::Uuid::from_bytes(id.into_bytes())
}

fn from_bson_uuid(id: bson::Uuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": to_bson_uuid(id)}
}

/// Filter matching every document whose `field` references `id`.
pub fn doc_ref(field: &str, id: Uuid) -> Document {
    let mut filter = Document::new();
    filter.insert(field, to_bson_uuid(id));
    filter
}
