use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::{
    dto::http::{GameLookupStatus, GameStatusResponse, StatusResponse},
    game::state_machine::GamePhase,
    media_player::Platform,
    playlist::loader::discover_playlists,
    state::SharedState,
};

#[derive(Debug, Deserialize)]
pub struct GameStatusQuery {
    game: String,
}

#[utoipa::path(
    get,
    path = "/api/status",
    tag = "public",
    responses((status = 200, description = "Available media players and playlists", body = StatusResponse))
)]
/// Inventory the admin picks from before starting a game: configured
/// media player platforms and discovered playlist files.
pub async fn status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let playlists = discover_playlists(&state.config().playlists_dir).await;
    let available = state.media_player_available().await;
    Json(StatusResponse {
        media_players: vec![Platform::MusicAssistant, Platform::Sonos, Platform::AlexaMedia],
        playlists,
        playlist_dir: state.config().playlists_dir.display().to_string(),
        ma_configured: available,
        ma_setup_url: None,
    })
}

#[utoipa::path(
    get,
    path = "/api/game/status",
    tag = "public",
    params(("game" = String, Query, description = "Game id the player page last saw")),
    responses((status = 200, description = "Whether the given game id is still valid", body = GameStatusResponse))
)]
/// Tell the player page whether its bookmarked game id is still the
/// active one, already ended, or unknown (e.g. the server restarted).
pub async fn game_status(
    State(state): State<SharedState>,
    Query(query): Query<GameStatusQuery>,
) -> Json<GameStatusResponse> {
    let (current_id, phase) = state.with_game(|g| (g.game_id.clone(), g.phase)).await;

    let response = if current_id != query.game {
        GameStatusResponse { status: GameLookupStatus::NotFound, game_id: None, phase: None }
    } else if phase == GamePhase::End {
        GameStatusResponse { status: GameLookupStatus::Ended, game_id: Some(current_id), phase: Some(phase) }
    } else {
        GameStatusResponse { status: GameLookupStatus::Valid, game_id: Some(current_id), phase: Some(phase) }
    };

    Json(response)
}

/// Configure the public read-only route subtree.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/game/status", get(game_status))
}
