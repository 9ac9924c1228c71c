//! The authoritative phase machine (C7): LOBBY → PLAYING → REVEAL → END,
//! plus PAUSED. `compute_transition` is the single source of truth for
//! which events are legal from which phase; `GameState` calls it and
//! never mutates `phase` directly.

use serde::Serialize;
use utoipa::ToSchema;

/// The five phases a game can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum GamePhase {
    Lobby,
    Playing,
    Reveal,
    End,
    Paused,
}

/// Events that drive phase transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    StartGame,
    TimerExpiry,
    AllSubmittersDone,
    AdminEarlyAdvance,
    NextRound,
    EndGame,
    AdminDisconnectGraceElapsed,
    AdminReconnect,
}

/// A transition was attempted from a phase that doesn't support the given
/// event.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cannot handle {event:?} while in {from:?}")]
pub struct InvalidTransition {
    pub from: GamePhase,
    pub event: GameEvent,
}

/// Extra facts the guard needs beyond `(from, event)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionGuards {
    pub pool_exhausted: bool,
    pub last_round: bool,
    pub has_players: bool,
}

/// Validate and compute the next phase for `(from, event)` under `guards`.
/// Pure: never touches a `GameState`.
pub fn compute_transition(
    from: GamePhase,
    event: GameEvent,
    guards: TransitionGuards,
) -> Result<GamePhase, InvalidTransition> {
    use GameEvent::*;
    use GamePhase::*;

    match (from, event) {
        (Lobby, StartGame) if guards.has_players && !guards.pool_exhausted => Ok(Playing),
        (Playing, TimerExpiry) | (Playing, AllSubmittersDone) | (Playing, AdminEarlyAdvance) => {
            Ok(Reveal)
        }
        (Reveal, NextRound) if !guards.pool_exhausted && !guards.last_round => Ok(Playing),
        (Reveal, NextRound) if guards.last_round || guards.pool_exhausted => Ok(End),
        (Playing, EndGame) | (Reveal, EndGame) => Ok(End),
        (Playing, AdminDisconnectGraceElapsed) => Ok(Paused),
        (Paused, AdminReconnect) => Ok(Playing),
        (End, NextRound) => Ok(Lobby),
        _ => Err(InvalidTransition { from, event }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lobby_to_playing_requires_players_and_unexhausted_pool() {
        let guards = TransitionGuards {
            has_players: true,
            pool_exhausted: false,
            last_round: false,
        };
        assert_eq!(
            compute_transition(GamePhase::Lobby, GameEvent::StartGame, guards).unwrap(),
            GamePhase::Playing
        );

        let empty_guards = TransitionGuards::default();
        assert!(compute_transition(GamePhase::Lobby, GameEvent::StartGame, empty_guards).is_err());
    }

    #[test]
    fn playing_always_reveals_regardless_of_trigger() {
        let guards = TransitionGuards::default();
        for event in [
            GameEvent::TimerExpiry,
            GameEvent::AllSubmittersDone,
            GameEvent::AdminEarlyAdvance,
        ] {
            assert_eq!(
                compute_transition(GamePhase::Playing, event, guards).unwrap(),
                GamePhase::Reveal
            );
        }
    }

    #[test]
    fn reveal_to_playing_blocked_at_last_round_or_exhaustion() {
        let guards = TransitionGuards {
            last_round: true,
            ..Default::default()
        };
        assert_eq!(
            compute_transition(GamePhase::Reveal, GameEvent::NextRound, guards).unwrap(),
            GamePhase::End
        );
    }

    #[test]
    fn admin_disconnect_and_reconnect_round_trip_through_paused() {
        let guards = TransitionGuards::default();
        assert_eq!(
            compute_transition(GamePhase::Playing, GameEvent::AdminDisconnectGraceElapsed, guards)
                .unwrap(),
            GamePhase::Paused
        );
        assert_eq!(
            compute_transition(GamePhase::Paused, GameEvent::AdminReconnect, guards).unwrap(),
            GamePhase::Playing
        );
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let guards = TransitionGuards::default();
        assert!(compute_transition(GamePhase::Lobby, GameEvent::TimerExpiry, guards).is_err());
        assert!(compute_transition(GamePhase::End, GameEvent::StartGame, guards).is_err());
    }
}
