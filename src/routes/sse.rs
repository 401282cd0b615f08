use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/public",
    tag = "sse",
    responses((status = 200, description = "Public SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream live game updates to spectators.
pub async fn public_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (receiver, handshake) = sse_service::subscribe_public(&state).await;
    info!("new public SSE connection");
    sse_service::to_sse_stream(receiver, handshake, StreamKind::Public)
}

#[utoipa::path(
    get,
    path = "/sse/scorer",
    tag = "sse",
    responses(
        (status = 200, description = "Scorer SSE stream; the handshake carries the scorer token", content_type = "text/event-stream", body = String),
        (status = 401, description = "Another scorer stream is open")
    )
)]
/// Open the exclusive scorer stream and hand out the scorer token.
pub async fn scorer_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (receiver, handshake) = sse_service::subscribe_scorer(&state).await?;
    info!("new scorer SSE connection");
    Ok(sse_service::to_sse_stream(
        receiver,
        handshake,
        StreamKind::Scorer(state),
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/public", get(public_stream))
        .route("/sse/scorer", get(scorer_stream))
}
