use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for courtside-back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::sse::scorer_stream,
        crate::routes::public::get_game,
        crate::routes::public::get_box_score,
        crate::routes::public::get_plays,
        crate::routes::public::get_phase,
        crate::routes::scorer::list_games,
        crate::routes::scorer::create_game,
        crate::routes::scorer::get_game,
        crate::routes::scorer::delete_game,
        crate::routes::scorer::load_game,
        crate::routes::scorer::unload_game,
        crate::routes::scorer::tip_off,
        crate::routes::scorer::start_clock,
        crate::routes::scorer::stop_clock,
        crate::routes::scorer::set_clock,
        crate::routes::scorer::reset_shot_clock,
        crate::routes::scorer::call_timeout,
        crate::routes::scorer::end_timeout,
        crate::routes::scorer::end_period,
        crate::routes::scorer::start_period,
        crate::routes::scorer::end_game,
        crate::routes::scorer::record_stat,
        crate::routes::scorer::undo_last,
        crate::routes::scorer::resolve_prompt,
        crate::routes::scorer::skip_prompt,
        crate::routes::scorer::cancel_free_throws,
        crate::routes::scorer::substitute,
        crate::routes::scorer::set_possession,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::PhaseChangedEvent,
            crate::dto::sse::GameUpdatedEvent,
            crate::dto::sse::ClockTickEvent,
            crate::dto::sse::ShotClockExpiredEvent,
            crate::dto::sse::PlayRecordedEvent,
            crate::dto::sse::StatsUndoneEvent,
            crate::dto::public::GameView,
            crate::dto::public::BoxScoreResponse,
            crate::dto::public::PlaysResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::GameDetails,
            crate::dto::game::GameSummary,
            crate::dto::stat::RecordStatRequest,
            crate::dto::stat::PlayOutcomeResponse,
            crate::engine::StatType,
            crate::engine::StatModifier,
            crate::config::RulesPreset,
            crate::config::GameRules,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "public", description = "Read-only views of the loaded game"),
        (name = "scorer", description = "Scorer operations, guarded by the scorer token"),
    )
)]
pub struct ApiDoc;
