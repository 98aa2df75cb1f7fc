use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::MatchStatus,
    dto::{
        events::ProgressionSummary,
        sse::{MatchStatusEvent, ProgressionEvent, ServerEvent, SystemStatus},
    },
    state::SharedState,
};

const EVENT_PROGRESSION: &str = "progression";
const EVENT_MATCH_STATUS: &str = "match.status";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Broadcast the set and match state reached after a scoring mutation.
pub fn broadcast_progression(state: &SharedState, match_id: Uuid, progression: ProgressionSummary) {
    let payload = ProgressionEvent {
        match_id,
        progression,
    };
    send_public_event(state, EVENT_PROGRESSION, &payload);
}

/// Broadcast a manual match lifecycle change.
pub fn broadcast_match_status(state: &SharedState, match_id: Uuid, status: MatchStatus) {
    let payload = MatchStatusEvent {
        match_id,
        status: status.into(),
    };
    send_public_event(state, EVENT_MATCH_STATUS, &payload);
}

/// Broadcast the degraded flag after it changed.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_public_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn match_status_is_sent_as_named_event() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = state.public_sse().subscribe();
        let match_id = Uuid::new_v4();

        broadcast_match_status(&state, match_id, MatchStatus::Aborted);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some(EVENT_MATCH_STATUS));
        let body: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(body["status"], "aborted");
        assert_eq!(body["match_id"], match_id.to_string());
    }
}
