use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::http::{ActionResponse, StartGameRequest, StartGameResponse},
    error::{AppError, ServiceError},
    playlist::loader::load_selected_pool,
    state::SharedState,
};

#[utoipa::path(
    post,
    path = "/api/game/start",
    tag = "admin",
    request_body = StartGameRequest,
    responses((status = 200, description = "Game started", body = StartGameResponse))
)]
/// Load the selected playlists into a pool, configure the game, and begin
/// the first round. The routed media player platform is fixed at boot;
/// `media_player` in the payload only selects among already-configured
/// platforms the host exposes, so it's accepted but not switched here.
pub async fn start_game(
    State(state): State<SharedState>,
    Json(payload): Json<StartGameRequest>,
) -> Result<Json<StartGameResponse>, AppError> {
    let pool = load_selected_pool(&state.config().playlists_dir, &payload.playlists)
        .await
        .map_err(ServiceError::InvalidInput)?;
    if pool.is_empty() {
        return Err(ServiceError::InvalidInput("selected playlists contain no songs".into()).into());
    }

    state
        .configure_game(pool, payload.difficulty, payload.round_duration, payload.playlists.clone(), payload.challenges)
        .await
        .map_err(|code| ServiceError::InvalidState(code.message().to_string()))?;

    state.begin_round().await;

    let game_id = state.with_game(|g| g.game_id.clone()).await;
    Ok(Json(StartGameResponse { game_id }))
}

#[utoipa::path(
    post,
    path = "/api/game/end",
    tag = "admin",
    responses((status = 200, description = "Game ended", body = ActionResponse))
)]
/// Force the running game to END and reset back to LOBBY for the next one.
pub async fn end_game(State(state): State<SharedState>) -> Json<ActionResponse> {
    state.end_game().await;
    state.reset_to_lobby().await;
    Json(ActionResponse { ok: true })
}

/// Configure the admin-only game control routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/game/start", post(start_game))
        .route("/api/game/end", post(end_game))
}
