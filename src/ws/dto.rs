//! Wire message catalog for the `/ws` protocol: inbound client messages,
//! outbound server messages, and the authoritative `state` snapshot.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::error::GameErrorCode;
use crate::game::state_machine::GamePhase;
use crate::highlights::GameHighlight;
use crate::scoring::{BetOutcome, RoundAnalytics, Superlative};

/// Messages accepted from game clients, discriminated by `type`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Join {
        name: String,
        #[serde(default)]
        is_admin: bool,
    },
    Submit {
        year: i32,
        #[serde(default)]
        bet: bool,
    },
    SubmitArtist {
        artist: String,
    },
    Admin {
        action: AdminAction,
        #[serde(default)]
        direction: Option<VolumeDirection>,
    },
    GetState,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    StartGame,
    NextRound,
    StopSong,
    SetVolume,
    EndGame,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VolumeDirection {
    Up,
    Down,
}

/// Messages sent to game clients, discriminated by `type`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    State(Box<StateSnapshot>),
    SubmitAck { year: i32 },
    SongStopped,
    VolumeChanged { level: f64 },
    GameEnded,
    Error { code: GameErrorCode, message: String },
}

impl OutboundMessage {
    pub fn error(code: GameErrorCode) -> Self {
        OutboundMessage::Error {
            code,
            message: code.message().to_string(),
        }
    }
}

/// Per-player view embedded in `state`. Round-local fields are only
/// populated in REVEAL (`skip_serializing_none` drops them otherwise).
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerView {
    pub name: String,
    pub score: i32,
    pub connected: bool,
    pub streak: u32,
    pub is_admin: bool,
    pub guess: Option<i32>,
    pub round_score: Option<i32>,
    pub years_off: Option<i32>,
    pub missed_round: Option<bool>,
    pub bet: Option<bool>,
    pub bet_outcome: Option<BetOutcome>,
    pub speed_multiplier: Option<f64>,
}

/// The phase-conditional `year` projection of the current song: present
/// only once the round has reached REVEAL.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SongView {
    pub artist: String,
    pub title: String,
    pub album_art: Option<String>,
    pub year: Option<i32>,
    pub fun_fact: Option<String>,
    pub chart_info: Option<serde_json::Value>,
    pub certifications: Option<serde_json::Value>,
    pub awards: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WinnerView {
    pub name: String,
    pub score: i32,
}

/// The authoritative `state` frame broadcast to every connection. Field
/// presence tracks the game phase exactly as documented for the wire
/// protocol; absent fields are omitted rather than sent as `null`.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct StateSnapshot {
    pub game_id: String,
    pub phase: GamePhase,
    pub player_count: usize,
    pub players: Vec<PlayerView>,
    pub join_url: Option<String>,
    pub round: Option<u32>,
    pub total_rounds: Option<usize>,
    pub deadline: Option<i64>,
    pub song: Option<SongView>,
    pub last_round: Option<bool>,
    pub early_reveal: Option<bool>,
    pub winner: Option<WinnerView>,
    pub highlights: Option<Vec<GameHighlight>>,
    pub superlatives: Option<Vec<Superlative>>,
    pub analytics: Option<RoundAnalytics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_view_drops_absent_round_local_fields() {
        let view = PlayerView {
            name: "Alice".into(),
            score: 10,
            connected: true,
            streak: 1,
            is_admin: false,
            guess: None,
            round_score: None,
            years_off: None,
            missed_round: None,
            bet: None,
            bet_outcome: None,
            speed_multiplier: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("guess").is_none());
        assert!(json.get("name").is_some());
    }

    #[test]
    fn inbound_join_parses_optional_is_admin() {
        let msg: InboundMessage = serde_json::from_str(r#"{"type":"join","name":"Alice"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::Join { is_admin: false, .. }));
    }
}
