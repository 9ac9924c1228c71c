//! Player sessions and the registry that enforces join rules, admin
//! designation, and connection bookkeeping.

use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{MAX_NAME_LENGTH, MAX_PLAYERS, MIN_NAME_LENGTH};
use crate::error::GameErrorCode;
use crate::scoring::BetOutcome;

/// A connected (or gracefully-disconnected) player.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSession {
    pub session_id: Uuid,
    pub name: String,
    pub is_admin: bool,
    pub connected: bool,
    pub joined_at_ms: i64,
    pub joined_late: bool,

    // Cumulative totals, never reset mid-game.
    pub score: i32,
    pub streak: u32,
    pub best_streak: u32,
    pub rounds_played: u32,
    pub bets_placed: u32,
    pub bets_won: u32,
    pub close_calls: u32,
    pub movie_bonus_total: i32,
    pub intro_speed_bonuses: u32,
    #[serde(skip)]
    pub round_scores: Vec<i32>,
    #[serde(skip)]
    pub submission_times: Vec<f64>,

    // Round-local state, reset every round.
    pub submitted: bool,
    pub current_guess: Option<i32>,
    pub submission_time_ms: Option<i64>,
    pub bet: bool,
    pub has_artist_guess: bool,
    pub round_score: i32,
    pub base_score: i32,
    pub speed_multiplier: f64,
    pub years_off: Option<i32>,
    pub streak_bonus: i32,
    pub artist_bonus: i32,
    pub movie_bonus: i32,
    pub intro_bonus: i32,
    pub missed_round: bool,
    pub bet_outcome: BetOutcome,
    pub previous_streak: u32,
}

impl PlayerSession {
    fn new(name: String, is_admin: bool, joined_at_ms: i64, joined_late: bool) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            name,
            is_admin,
            connected: true,
            joined_at_ms,
            joined_late,
            score: 0,
            streak: 0,
            best_streak: 0,
            rounds_played: 0,
            bets_placed: 0,
            bets_won: 0,
            close_calls: 0,
            movie_bonus_total: 0,
            intro_speed_bonuses: 0,
            round_scores: Vec::new(),
            submission_times: Vec::new(),
            submitted: false,
            current_guess: None,
            submission_time_ms: None,
            bet: false,
            has_artist_guess: false,
            round_score: 0,
            base_score: 0,
            speed_multiplier: 1.0,
            years_off: None,
            streak_bonus: 0,
            artist_bonus: 0,
            movie_bonus: 0,
            intro_bonus: 0,
            missed_round: false,
            bet_outcome: BetOutcome::None,
            previous_streak: 0,
        }
    }

    /// Reset everything round-local ahead of a new round. Cumulative
    /// totals are untouched.
    pub fn reset_round(&mut self) {
        self.submitted = false;
        self.current_guess = None;
        self.submission_time_ms = None;
        self.bet = false;
        self.has_artist_guess = false;
        self.round_score = 0;
        self.base_score = 0;
        self.speed_multiplier = 1.0;
        self.years_off = None;
        self.streak_bonus = 0;
        self.artist_bonus = 0;
        self.movie_bonus = 0;
        self.intro_bonus = 0;
        self.missed_round = false;
        self.bet_outcome = BetOutcome::None;
        self.previous_streak = 0;
    }

    /// Record a guess submission for the current round.
    pub fn submit_guess(&mut self, year: i32, bet: bool, now_ms: i64) {
        self.submitted = true;
        self.current_guess = Some(year);
        self.submission_time_ms = Some(now_ms);
        self.bet = bet;
    }
}

/// Reason a join attempt was rejected, without mutating the registry.
pub type JoinError = GameErrorCode;

/// Whether the joining phase is LOBBY (admits normally) or anything else
/// (admits but marks `joined_late`), mirrors the GameState phase without
/// creating a dependency from `player` back to `game`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPhase {
    Lobby,
    Ended,
    Other,
}

/// Registry of all player sessions in the current game, keyed by
/// case-insensitive name. Join order is preserved.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: IndexMap<String, PlayerSession>,
    disconnected_admin_name: Option<String>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to add a new player, enforcing name/length/uniqueness/
    /// capacity rules in the order the original implementation checks them.
    pub fn add_player(
        &mut self,
        raw_name: &str,
        is_admin: bool,
        phase: JoinPhase,
        now_ms: i64,
    ) -> Result<&PlayerSession, JoinError> {
        let name = raw_name.trim().to_string();
        if name.chars().count() < MIN_NAME_LENGTH || name.chars().count() > MAX_NAME_LENGTH {
            return Err(GameErrorCode::NameInvalid);
        }
        if phase == JoinPhase::Ended {
            return Err(GameErrorCode::GameEnded);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameErrorCode::GameFull);
        }
        let lower = name.to_lowercase();
        if self.players.keys().any(|existing| existing.to_lowercase() == lower) {
            return Err(GameErrorCode::NameTaken);
        }

        let joined_late = phase != JoinPhase::Lobby;
        let session = PlayerSession::new(name.clone(), is_admin, now_ms, joined_late);
        self.players.insert(name.clone(), session);
        Ok(self.players.get(&name).expect("just inserted"))
    }

    /// Whether a different party may claim admin right now: true unless
    /// someone else already holds it.
    pub fn admin_slot_available(&self, candidate: &str) -> bool {
        !self
            .players
            .values()
            .any(|p| p.is_admin && !p.name.eq_ignore_ascii_case(candidate))
    }

    /// Mark the given player as admin.
    pub fn set_admin(&mut self, name: &str) {
        if let Some(player) = self.players.get_mut(name) {
            player.is_admin = true;
        }
    }

    /// Record that the admin disconnected, remembering their name for the
    /// reconnect grace window.
    pub fn mark_admin_disconnected(&mut self, name: String) {
        self.disconnected_admin_name = Some(name);
    }

    /// The remembered disconnected admin name, if any.
    pub fn disconnected_admin_name(&self) -> Option<&str> {
        self.disconnected_admin_name.as_deref()
    }

    /// Clear the remembered disconnected admin (on reconnect or teardown).
    pub fn clear_disconnected_admin(&mut self) {
        self.disconnected_admin_name = None;
    }

    pub fn get(&self, name: &str) -> Option<&PlayerSession> {
        self.players.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PlayerSession> {
        self.players.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PlayerSession> {
        self.players.shift_remove(name)
    }

    pub fn set_connected(&mut self, name: &str, connected: bool) {
        if let Some(player) = self.players.get_mut(name) {
            player.connected = connected;
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PlayerSession)> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut PlayerSession)> {
        self.players.iter_mut()
    }

    pub fn connected_players(&self) -> impl Iterator<Item = &PlayerSession> {
        self.players.values().filter(|p| p.connected)
    }

    /// Reset every player's round-local fields for a new round.
    pub fn reset_all_rounds(&mut self) {
        for player in self.players.values_mut() {
            player.reset_round();
        }
    }

    /// Clear the entire registry (full game reset on `end_game`).
    pub fn clear(&mut self) {
        self.players.clear();
        self.disconnected_admin_name = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_player_trims_and_validates_length() {
        let mut registry = PlayerRegistry::new();
        assert!(registry.add_player("  Alice  ", false, JoinPhase::Lobby, 0).is_ok());
        assert_eq!(registry.get("Alice").unwrap().name, "Alice");

        let mut empty = PlayerRegistry::new();
        assert_eq!(
            empty.add_player("   ", false, JoinPhase::Lobby, 0).unwrap_err(),
            GameErrorCode::NameInvalid
        );

        let mut too_long = PlayerRegistry::new();
        let long_name = "a".repeat(MAX_NAME_LENGTH + 1);
        assert_eq!(
            too_long.add_player(&long_name, false, JoinPhase::Lobby, 0).unwrap_err(),
            GameErrorCode::NameInvalid
        );
    }

    #[test]
    fn boundary_name_lengths_accepted() {
        let mut registry = PlayerRegistry::new();
        let min_name = "a".repeat(MIN_NAME_LENGTH);
        let max_name = "b".repeat(MAX_NAME_LENGTH);
        assert!(registry.add_player(&min_name, false, JoinPhase::Lobby, 0).is_ok());
        assert!(registry.add_player(&max_name, false, JoinPhase::Lobby, 0).is_ok());
    }

    #[test]
    fn name_collision_is_case_insensitive() {
        let mut registry = PlayerRegistry::new();
        registry.add_player("Alice", false, JoinPhase::Lobby, 0).unwrap();
        assert_eq!(
            registry.add_player("alice", false, JoinPhase::Lobby, 0).unwrap_err(),
            GameErrorCode::NameTaken
        );
    }

    #[test]
    fn ended_phase_rejects_join() {
        let mut registry = PlayerRegistry::new();
        assert_eq!(
            registry.add_player("Alice", false, JoinPhase::Ended, 0).unwrap_err(),
            GameErrorCode::GameEnded
        );
    }

    #[test]
    fn joining_outside_lobby_marks_joined_late() {
        let mut registry = PlayerRegistry::new();
        registry.add_player("Alice", false, JoinPhase::Other, 0).unwrap();
        assert!(registry.get("Alice").unwrap().joined_late);
    }

    #[test]
    fn game_full_rejects_additional_players() {
        let mut registry = PlayerRegistry::new();
        for i in 0..MAX_PLAYERS {
            registry.add_player(&format!("p{i}"), false, JoinPhase::Lobby, 0).unwrap();
        }
        assert_eq!(
            registry.add_player("one_more", false, JoinPhase::Lobby, 0).unwrap_err(),
            GameErrorCode::GameFull
        );
    }
}
