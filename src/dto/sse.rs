use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{events::ProgressionSummary, matches::MatchStatusDto};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Raw event with pre-rendered data.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after every scoring mutation that went through the progression engine.
pub struct ProgressionEvent {
    pub match_id: Uuid,
    #[serde(flatten)]
    pub progression: ProgressionSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an operator starts, ends or aborts a match.
pub struct MatchStatusEvent {
    pub match_id: Uuid,
    pub status: MatchStatusDto,
}
