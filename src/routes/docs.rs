use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::status,
        crate::routes::public::game_status,
        crate::routes::admin::start_game,
        crate::routes::admin::end_game,
        crate::routes::websocket::ws_handler,
    ),
    components(schemas(
        crate::dto::health::HealthResponse,
        crate::dto::http::StatusResponse,
        crate::dto::http::GameLookupStatus,
        crate::dto::http::GameStatusResponse,
        crate::dto::http::StartGameRequest,
        crate::dto::http::StartGameResponse,
        crate::dto::http::ActionResponse,
        crate::playlist::loader::PlaylistSummary,
        crate::game::ChallengeOptions,
        crate::game::state_machine::GamePhase,
        crate::media_player::Platform,
        crate::scoring::Difficulty,
    )),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "public", description = "Read-only game lookup endpoints"),
        (name = "admin", description = "Admin controls for starting and ending a game"),
    )
)]
/// Aggregated OpenAPI specification for the Beatify game core.
pub struct ApiDoc;

/// Serve the Swagger UI backed by the generated OpenAPI document.
pub fn router(state: SharedState) -> Router<SharedState> {
    let ui: Router<SharedState> = SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", ApiDoc::openapi())
        .into();

    ui.with_state(state)
}
