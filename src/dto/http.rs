//! Request/response bodies for `/api/status`, `/api/game/status`, and the
//! admin `/api/game/start` + `/api/game/end` pair.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::game::ChallengeOptions;
use crate::game::state_machine::GamePhase;
use crate::media_player::Platform;
use crate::playlist::loader::PlaylistSummary;
use crate::scoring::Difficulty;

/// Answer to `GET /api/status`: what's available for the admin to pick
/// from before starting a game.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub media_players: Vec<Platform>,
    pub playlists: Vec<PlaylistSummary>,
    pub playlist_dir: String,
    pub ma_configured: bool,
    pub ma_setup_url: Option<String>,
}

/// Coarse lookup result for `GET /api/game/status`, used by the player
/// page to decide whether to render the lobby, an ended screen, or a
/// not-found page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameLookupStatus {
    Valid,
    Ended,
    NotFound,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GameStatusResponse {
    pub status: GameLookupStatus,
    pub game_id: Option<String>,
    pub phase: Option<GamePhase>,
}

fn default_round_duration() -> u64 {
    30
}

/// Body of `POST /api/game/start`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartGameRequest {
    pub playlists: Vec<String>,
    #[serde(default)]
    pub media_player: Option<Platform>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_round_duration")]
    pub round_duration: u64,
    #[serde(default)]
    pub challenges: ChallengeOptions,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StartGameResponse {
    pub game_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub ok: bool,
}
