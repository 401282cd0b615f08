/// Background clock ticker.
pub mod clock_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game creation, loading and storage management.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Public service for read-only game information.
pub mod public_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor with backoff and outbox recovery.
pub mod storage_supervisor;
/// Scorer operations on the loaded game.
pub mod tracking_service;
