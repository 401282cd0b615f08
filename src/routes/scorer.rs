use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        game::{CreateGameRequest, GameDetails, GameSummary, ListGamesQuery},
        stat::{
            CancelFreeThrowsResponse, PlayOutcomeResponse, RecordStatRequest,
            ResolvePromptRequest, UndoResponse,
        },
        tracking::{
            ClockResponse, PossessionRequest, PossessionResponse, SetClockRequest,
            ShotClockResetRequest, SubstitutionRequest, SubstitutionResponse, TimeoutRequest,
            TimeoutResponse, TipOffRequest,
        },
    },
    error::AppError,
    services::{game_service, tracking_service},
    state::{SeatCheck, SharedState},
};

const SCORER_TOKEN_HEADER: &str = "x-scorer-token";

/// Scorer-only endpoints, guarded by the token of the scorer SSE stream.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/scorer/games", get(list_games).post(create_game))
        .route("/scorer/games/{id}", get(get_game).delete(delete_game))
        .route("/scorer/games/{id}/load", post(load_game))
        .route("/scorer/game/unload", post(unload_game))
        .route("/scorer/game/tip-off", post(tip_off))
        .route("/scorer/game/clock/start", post(start_clock))
        .route("/scorer/game/clock/stop", post(stop_clock))
        .route("/scorer/game/clock", put(set_clock))
        .route("/scorer/game/shot-clock/reset", post(reset_shot_clock))
        .route("/scorer/game/timeout", post(call_timeout))
        .route("/scorer/game/timeout/end", post(end_timeout))
        .route("/scorer/game/period/end", post(end_period))
        .route("/scorer/game/period/start", post(start_period))
        .route("/scorer/game/end", post(end_game))
        .route("/scorer/stats", post(record_stat))
        .route("/scorer/stats/undo", post(undo_last))
        .route("/scorer/prompts/{id}/resolve", post(resolve_prompt))
        .route("/scorer/prompts/{id}/skip", post(skip_prompt))
        .route("/scorer/free-throws/cancel", post(cancel_free_throws))
        .route("/scorer/substitutions", post(substitute))
        .route("/scorer/possession", put(set_possession))
        .route_layer(middleware::from_fn_with_state(state, require_scorer_token))
}

// ---------------------------------------------------------------------------
// Stored games
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/scorer/games",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream"),
        ListGamesQuery
    ),
    responses((status = 200, description = "Stored games", body = [GameSummary]))
)]
pub async fn list_games(
    State(state): State<SharedState>,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<Vec<GameSummary>>, AppError> {
    Ok(Json(game_service::list_games(&state, query).await?))
}

/// Create a scheduled game from two rosters.
#[utoipa::path(
    post,
    path = "/scorer/games",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game created", body = GameDetails),
        (status = 400, description = "Invalid roster or rules")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<(StatusCode, Json<GameDetails>), AppError> {
    let game = game_service::create_game(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

#[utoipa::path(
    get,
    path = "/scorer/games/{id}",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream"),
        ("id" = String, Path, description = "Identifier of the game to retrieve")
    ),
    responses(
        (status = 200, description = "Game", body = GameDetails),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameDetails>, AppError> {
    Ok(Json(game_service::get_game(&state, id).await?))
}

/// Delete a stored game with its play log.
#[utoipa::path(
    delete,
    path = "/scorer/games/{id}",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream"),
        ("id" = String, Path, description = "Identifier of the game to delete")
    ),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 409, description = "Game is loaded")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    game_service::delete_game(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Load a stored game for tracking.
#[utoipa::path(
    post,
    path = "/scorer/games/{id}/load",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream"),
        ("id" = String, Path, description = "Identifier of the game to load")
    ),
    responses(
        (status = 200, description = "Game loaded", body = GameDetails),
        (status = 409, description = "Another game is loaded")
    )
)]
pub async fn load_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameDetails>, AppError> {
    Ok(Json(game_service::load_game(&state, id).await?))
}

/// Unload the current game once its changes are stored.
#[utoipa::path(
    post,
    path = "/scorer/game/unload",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    responses(
        (status = 204, description = "Game unloaded"),
        (status = 409, description = "Game is live"),
        (status = 503, description = "Unsaved changes could not be written")
    )
)]
pub async fn unload_game(State(state): State<SharedState>) -> Result<StatusCode, AppError> {
    game_service::unload_game(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Clock and periods
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/scorer/game/tip-off",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    request_body = TipOffRequest,
    responses((status = 200, description = "Game started", body = ClockResponse))
)]
pub async fn tip_off(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<TipOffRequest>>,
) -> Result<Json<ClockResponse>, AppError> {
    Ok(Json(
        tracking_service::tip_off(&state, payload.jump_ball_winner).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/scorer/game/clock/start",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    responses((status = 200, description = "Clock running", body = ClockResponse))
)]
pub async fn start_clock(State(state): State<SharedState>) -> Result<Json<ClockResponse>, AppError> {
    Ok(Json(tracking_service::start_clock(&state).await?))
}

#[utoipa::path(
    post,
    path = "/scorer/game/clock/stop",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    responses((status = 200, description = "Clock stopped", body = ClockResponse))
)]
pub async fn stop_clock(State(state): State<SharedState>) -> Result<Json<ClockResponse>, AppError> {
    Ok(Json(tracking_service::stop_clock(&state).await?))
}

/// Correct the game clock. The clock must be stopped.
#[utoipa::path(
    put,
    path = "/scorer/game/clock",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    request_body = SetClockRequest,
    responses(
        (status = 200, description = "Clock corrected", body = ClockResponse),
        (status = 409, description = "Clock is running")
    )
)]
pub async fn set_clock(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SetClockRequest>>,
) -> Result<Json<ClockResponse>, AppError> {
    Ok(Json(
        tracking_service::set_clock(&state, payload.remaining_ms).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/scorer/game/shot-clock/reset",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    request_body = ShotClockResetRequest,
    responses((status = 200, description = "Shot clock reset", body = ClockResponse))
)]
pub async fn reset_shot_clock(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ShotClockResetRequest>>,
) -> Result<Json<ClockResponse>, AppError> {
    Ok(Json(
        tracking_service::reset_shot_clock(&state, payload.short).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/scorer/game/timeout",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    request_body = TimeoutRequest,
    responses(
        (status = 200, description = "Timeout charged", body = TimeoutResponse),
        (status = 409, description = "No timeouts left")
    )
)]
pub async fn call_timeout(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<TimeoutRequest>>,
) -> Result<Json<TimeoutResponse>, AppError> {
    Ok(Json(
        tracking_service::call_timeout(&state, payload.team_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/scorer/game/timeout/end",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    responses((status = 200, description = "Timeout over", body = ClockResponse))
)]
pub async fn end_timeout(State(state): State<SharedState>) -> Result<Json<ClockResponse>, AppError> {
    Ok(Json(tracking_service::end_timeout(&state).await?))
}

/// End the period; after regulation this either finishes the game or leads to overtime.
#[utoipa::path(
    post,
    path = "/scorer/game/period/end",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    responses((status = 200, description = "Period ended", body = ClockResponse))
)]
pub async fn end_period(State(state): State<SharedState>) -> Result<Json<ClockResponse>, AppError> {
    Ok(Json(tracking_service::end_period(&state).await?))
}

#[utoipa::path(
    post,
    path = "/scorer/game/period/start",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    responses((status = 200, description = "Next period ready", body = ClockResponse))
)]
pub async fn start_period(State(state): State<SharedState>) -> Result<Json<ClockResponse>, AppError> {
    Ok(Json(tracking_service::start_period(&state).await?))
}

#[utoipa::path(
    post,
    path = "/scorer/game/end",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    responses((status = 200, description = "Game final", body = ClockResponse))
)]
pub async fn end_game(State(state): State<SharedState>) -> Result<Json<ClockResponse>, AppError> {
    Ok(Json(tracking_service::end_game(&state).await?))
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Record a stat and let the play engine sequence it.
#[utoipa::path(
    post,
    path = "/scorer/stats",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    request_body = RecordStatRequest,
    responses(
        (status = 200, description = "Stat sequenced", body = PlayOutcomeResponse),
        (status = 400, description = "Invalid stat"),
        (status = 409, description = "Game not live or free throws pending")
    )
)]
pub async fn record_stat(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RecordStatRequest>>,
) -> Result<Json<PlayOutcomeResponse>, AppError> {
    Ok(Json(
        tracking_service::record_stat(&state, payload.into()).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/scorer/stats/undo",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    responses(
        (status = 200, description = "Stats removed", body = UndoResponse),
        (status = 409, description = "Nothing to undo")
    )
)]
pub async fn undo_last(State(state): State<SharedState>) -> Result<Json<UndoResponse>, AppError> {
    Ok(Json(tracking_service::undo_last(&state).await?))
}

#[utoipa::path(
    post,
    path = "/scorer/prompts/{id}/resolve",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream"),
        ("id" = String, Path, description = "Identifier of the pending prompt")
    ),
    request_body = ResolvePromptRequest,
    responses((status = 200, description = "Prompt answered", body = PlayOutcomeResponse))
)]
pub async fn resolve_prompt(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ResolvePromptRequest>>,
) -> Result<Json<PlayOutcomeResponse>, AppError> {
    Ok(Json(
        tracking_service::resolve_prompt(&state, id, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/scorer/prompts/{id}/skip",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream"),
        ("id" = String, Path, description = "Identifier of the pending prompt")
    ),
    responses((status = 200, description = "Prompt skipped", body = PlayOutcomeResponse))
)]
pub async fn skip_prompt(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayOutcomeResponse>, AppError> {
    Ok(Json(tracking_service::skip_prompt(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/scorer/free-throws/cancel",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    responses((status = 200, description = "Free-throw set abandoned", body = CancelFreeThrowsResponse))
)]
pub async fn cancel_free_throws(
    State(state): State<SharedState>,
) -> Result<Json<CancelFreeThrowsResponse>, AppError> {
    Ok(Json(tracking_service::cancel_free_throws(&state).await?))
}

// ---------------------------------------------------------------------------
// Roster and possession
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/scorer/substitutions",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    request_body = SubstitutionRequest,
    responses(
        (status = 200, description = "Substitution recorded", body = SubstitutionResponse),
        (status = 400, description = "Player not on court or fouled out")
    )
)]
pub async fn substitute(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SubstitutionRequest>>,
) -> Result<Json<SubstitutionResponse>, AppError> {
    Ok(Json(
        tracking_service::substitute(
            &state,
            payload.team_id,
            payload.player_out,
            payload.player_in,
        )
        .await?,
    ))
}

#[utoipa::path(
    put,
    path = "/scorer/possession",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by the /sse/scorer stream")),
    request_body = PossessionRequest,
    responses((status = 200, description = "Possession set", body = PossessionResponse))
)]
pub async fn set_possession(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<PossessionRequest>>,
) -> Result<Json<PossessionResponse>, AppError> {
    Ok(Json(
        tracking_service::set_possession(&state, payload.team_id).await?,
    ))
}

async fn require_scorer_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(SCORER_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing scorer token header `X-Scorer-Token`".into())
        })?;

    match state.scorer_seat().check(&provided).await {
        SeatCheck::Granted => Ok(next.run(req).await),
        SeatCheck::WrongToken => Err(AppError::Unauthorized("invalid scorer token".into())),
        SeatCheck::Vacant => Err(AppError::Unauthorized("no scorer SSE stream is open".into())),
    }
}
