use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

pub mod health;
pub mod public;
pub mod scorer;
pub mod sse;

/// Compose the spectator, scorer and stream routes with the Swagger UI at `/docs`.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(public::router())
        .merge(scorer::router(state.clone()));

    api_router.with_state(state).merge(
        SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()),
    )
}
