use serde::Serialize;
use utoipa::ToSchema;

/// Storage-backed availability reported by `/healthcheck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The match store answers.
    Ok,
    /// No usable match store; writes are refused.
    Degraded,
}

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status (`ok` or `degraded`).
    pub status: HealthStatus,
}

impl HealthResponse {
    /// The system is operational.
    pub fn ok() -> Self {
        Self {
            status: HealthStatus::Ok,
        }
    }

    /// The system runs without a reachable store.
    pub fn degraded() -> Self {
        Self {
            status: HealthStatus::Degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(HealthResponse::degraded()).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "degraded" }));
    }
}
