use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Overall service status.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Storage reachable.
    Ok,
    /// Running without storage; changes stay in memory until it comes back.
    Degraded,
}

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Game currently tracked, if any.
    pub game_id: Option<Uuid>,
    /// Whether changes of the tracked game are waiting for storage.
    pub unsaved_changes: bool,
}
