//! GameState (C7): the authoritative game model and round procedures.
//! Pure/synchronous — all I/O (media player calls, timers, persistence)
//! is orchestrated by the caller (see `crate::state`), which holds this
//! behind a single lock for the duration of a handler.

pub mod challenges;
pub mod state_machine;

use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::clock::SharedClock;
use crate::error::GameErrorCode;
use crate::player::{JoinPhase, PlayerRegistry};
use crate::playlist::Song;
use crate::playlist::manager::PlaylistManager;
use crate::scoring::{
    self, Difficulty, PlayerGuessSample, PlayerSuperlativeInputs, RoundAnalytics, Superlative,
};

use challenges::{ArtistChallenge, IntroRound, MovieChallenge};
use state_machine::{GameEvent, GamePhase, TransitionGuards, compute_transition};

/// Outcome of a reveal: who scored what, plus round-level analytics.
#[derive(Debug, Clone)]
pub struct RevealSummary {
    pub analytics: RoundAnalytics,
    pub early_reveal: bool,
}

/// Which side-challenge kinds the admin opted into for this game, sent as
/// part of `/api/game/start`. A song's own data (`alt_artists`, `movie`)
/// still gates whether a challenge actually fires each round; this only
/// controls whether it's allowed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct ChallengeOptions {
    pub artist: bool,
    pub movie: bool,
    pub intro: bool,
}

impl Default for ChallengeOptions {
    fn default() -> Self {
        Self { artist: true, movie: true, intro: true }
    }
}

/// Game-wide cumulative counters carried into the end-of-game
/// `AnalyticsRecord`.
#[derive(Debug, Clone, Default)]
pub struct GameAggregates {
    pub streak_3_count: u32,
    pub streak_5_count: u32,
    pub streak_7_count: u32,
    pub total_bets: u32,
    pub bets_won: u32,
    pub error_count: u32,
}

/// The authoritative, in-memory game model.
pub struct GameState {
    pub game_id: String,
    pub phase: GamePhase,
    pub players: PlayerRegistry,
    pub difficulty: Difficulty,
    pub round: u32,
    pub round_duration_secs: u64,
    pub current_song: Option<Song>,
    pub round_start_ms: Option<i64>,
    pub deadline_ms: Option<i64>,
    pub last_round: bool,
    pub early_reveal: bool,
    pub song_stopped: bool,
    pub volume: f64,
    pub created_at_ms: i64,
    pub ended_at_ms: Option<i64>,
    /// Playlist filenames selected at `configure` time, carried through to
    /// the end-of-game analytics/stats records.
    pub playlist_names: Vec<String>,

    pub artist_challenge: Option<ArtistChallenge>,
    pub movie_challenge: Option<MovieChallenge>,
    pub intro_round: Option<IntroRound>,
    pub intro_round_chance: f64,
    pub intro_window_secs: u64,
    pub artist_bonus_points: i32,
    pub challenges: ChallengeOptions,

    pub aggregates: GameAggregates,

    playlist_manager: Option<PlaylistManager>,
    clock: SharedClock,
}

impl GameState {
    pub fn new(clock: SharedClock, intro_round_chance: f64, intro_window_secs: u64, artist_bonus_points: i32) -> Self {
        let now = clock.now_ms();
        Self {
            game_id: new_game_id(),
            phase: GamePhase::Lobby,
            players: PlayerRegistry::new(),
            difficulty: Difficulty::default(),
            round: 0,
            round_duration_secs: 30,
            current_song: None,
            round_start_ms: None,
            deadline_ms: None,
            last_round: false,
            early_reveal: false,
            song_stopped: false,
            volume: 0.5,
            created_at_ms: now,
            ended_at_ms: None,
            playlist_names: Vec::new(),
            artist_challenge: None,
            movie_challenge: None,
            intro_round: None,
            intro_round_chance,
            intro_window_secs,
            artist_bonus_points,
            challenges: ChallengeOptions::default(),
            aggregates: GameAggregates::default(),
            playlist_manager: None,
            clock,
        }
    }

    /// Configure the song pool and options for a new game. Must be called
    /// while in LOBBY.
    pub fn configure(
        &mut self,
        pool: Vec<Song>,
        difficulty: Difficulty,
        round_duration_secs: u64,
        playlist_names: Vec<String>,
        challenges: ChallengeOptions,
    ) -> Result<(), GameErrorCode> {
        if self.phase != GamePhase::Lobby {
            return Err(GameErrorCode::GameAlreadyStarted);
        }
        self.playlist_manager = Some(PlaylistManager::new(pool));
        self.difficulty = difficulty;
        self.round_duration_secs = round_duration_secs;
        self.playlist_names = playlist_names;
        self.challenges = challenges;
        Ok(())
    }

    fn join_phase(&self) -> JoinPhase {
        match self.phase {
            GamePhase::Lobby => JoinPhase::Lobby,
            GamePhase::End => JoinPhase::Ended,
            _ => JoinPhase::Other,
        }
    }

    /// Join (or reconnect) a player. A disconnected player rejoining under
    /// the same case-insensitive name resumes their existing session
    /// instead of failing with `NAME_TAKEN`.
    pub fn join(&mut self, raw_name: &str, is_admin: bool) -> Result<bool, GameErrorCode> {
        let name = raw_name.trim();
        let existing_key = self
            .players
            .iter()
            .find(|(key, p)| !p.connected && key.eq_ignore_ascii_case(name))
            .map(|(key, _)| key.clone());

        if let Some(key) = existing_key {
            self.players.set_connected(&key, true);
            return Ok(true);
        }

        let now = self.clock.now_ms();
        let phase = self.join_phase();
        self.players.add_player(name, is_admin, phase, now)?;

        if is_admin && !self.players.admin_slot_available(name) {
            self.players.remove(name);
            return Err(GameErrorCode::AdminExists);
        }

        Ok(false)
    }

    /// Record a player disconnect, marking them unavailable for
    /// broadcasts/submitter-completion checks. Does not remove them —
    /// removal (or pause, for admin) happens after the grace period.
    pub fn mark_disconnected(&mut self, name: &str) {
        let is_admin = self.players.get(name).map(|p| p.is_admin).unwrap_or(false);
        self.players.set_connected(name, false);
        if is_admin {
            self.players.mark_admin_disconnected(name.to_string());
        }
    }

    pub fn remove_player(&mut self, name: &str) {
        self.players.remove(name);
    }

    /// Begin a new round: draw a song, reset round-local player state, arm
    /// the deadline. Returns the song to hand to the media player, or
    /// `None` if the pool is exhausted (caller should then `end_game`).
    pub fn begin_round(&mut self) -> Result<Option<Song>, GameErrorCode> {
        let event = if self.phase == GamePhase::Lobby {
            GameEvent::StartGame
        } else {
            GameEvent::NextRound
        };
        let guards = TransitionGuards {
            has_players: !self.players.is_empty(),
            pool_exhausted: self.pool_exhausted(),
            last_round: self.last_round,
        };
        let next_phase = compute_transition(self.phase, event, guards)
            .map_err(|_| GameErrorCode::InvalidAction)?;

        let Some(manager) = self.playlist_manager.as_mut() else {
            return Err(GameErrorCode::GameNotStarted);
        };
        let Some(song) = manager.next() else {
            self.phase = GamePhase::End;
            self.ended_at_ms = Some(self.clock.now_ms());
            return Ok(None);
        };

        self.round += 1;
        self.players.reset_all_rounds();
        self.artist_challenge = None;
        self.movie_challenge = None;
        self.intro_round = None;
        self.song_stopped = false;
        self.early_reveal = false;

        let now = self.clock.now_ms();
        self.round_start_ms = Some(now);
        self.deadline_ms = Some(now + self.round_duration_secs as i64 * 1000);
        self.last_round = manager.is_exhausted();

        if self.challenges.intro && rand::rng().random_bool(self.intro_round_chance.clamp(0.0, 1.0)) {
            self.intro_round = Some(IntroRound::new(now, self.intro_window_secs));
        }

        if self.challenges.artist && !song.alt_artists.is_empty() {
            self.artist_challenge = Some(ArtistChallenge::new(song.artist.clone(), song.alt_artists.clone()));
        }
        if self.challenges.movie {
            if let Some(movie) = song.movie.clone().filter(|_| !song.movie_choices.is_empty()) {
                self.movie_challenge = Some(MovieChallenge::new(movie, song.movie_choices.clone(), self.artist_bonus_points));
            }
        }

        self.current_song = Some(song.clone());
        self.phase = next_phase;
        Ok(Some(song))
    }

    fn pool_exhausted(&self) -> bool {
        self.playlist_manager
            .as_ref()
            .map(|m| m.is_exhausted())
            .unwrap_or(true)
    }

    pub fn is_deadline_passed(&self) -> bool {
        match self.deadline_ms {
            Some(deadline) => self.clock.now_ms() > deadline,
            None => true,
        }
    }

    /// Record a year guess. Validates phase, submission state, deadline,
    /// and range before mutating.
    pub fn submit_guess(&mut self, name: &str, year: i32, bet: bool) -> Result<(), GameErrorCode> {
        if self.phase != GamePhase::Playing {
            return Err(GameErrorCode::InvalidAction);
        }
        let now = self.clock.now_ms();
        let deadline_passed = self.is_deadline_passed();
        let Some(player) = self.players.get_mut(name) else {
            return Err(GameErrorCode::NotInGame);
        };
        if player.submitted {
            return Err(GameErrorCode::AlreadySubmitted);
        }
        if deadline_passed {
            return Err(GameErrorCode::RoundExpired);
        }
        if !(crate::config::YEAR_MIN..=crate::config::YEAR_MAX).contains(&year) {
            return Err(GameErrorCode::InvalidAction);
        }

        player.submit_guess(year, bet, now);
        if bet {
            self.aggregates.total_bets += 1;
        }

        if let Some(intro) = self.intro_round.as_mut() {
            if let Some(rank) = intro.record_submission(name, now) {
                if let Some(player) = self.players.get_mut(name) {
                    player.intro_bonus = scoring::intro_rank_bonus(rank);
                    if player.intro_bonus > 0 {
                        player.intro_speed_bonuses += 1;
                    }
                }
            }
        }

        Ok(())
    }

    /// Record an artist-challenge guess for the active challenge.
    pub fn submit_artist(&mut self, name: &str, guess: &str) -> Result<(), GameErrorCode> {
        if self.phase != GamePhase::Playing {
            return Err(GameErrorCode::InvalidAction);
        }
        let Some(challenge) = self.artist_challenge.as_mut() else {
            return Err(GameErrorCode::InvalidAction);
        };
        if challenge.has_guessed(name) {
            return Err(GameErrorCode::AlreadySubmitted);
        }
        challenge.submit_guess(name, guess);
        if let Some(player) = self.players.get_mut(name) {
            player.has_artist_guess = true;
        }
        Ok(())
    }

    /// "Complete" means every connected player has submitted, and if an
    /// artist challenge is active, also guessed it.
    pub fn all_connected_submitters_complete(&self) -> bool {
        let artist_required = self.artist_challenge.is_some();
        self.players
            .connected_players()
            .all(|p| p.submitted && (!artist_required || p.has_artist_guess))
    }

    /// Cancel the current round early (all connected submitters are done,
    /// or the admin forced it) and transition to REVEAL.
    pub fn force_reveal(&mut self, early: bool) -> Result<(), GameErrorCode> {
        let event = if early {
            GameEvent::AdminEarlyAdvance
        } else {
            GameEvent::TimerExpiry
        };
        let guards = TransitionGuards::default();
        self.phase = compute_transition(self.phase, event, guards)
            .map_err(|_| GameErrorCode::InvalidAction)?;
        self.early_reveal = early;
        Ok(())
    }

    /// Run the scoring pass for every player and compute round analytics.
    /// Must be called once the phase is already REVEAL.
    pub fn finalize_reveal(&mut self) -> RevealSummary {
        let Some(song) = self.current_song.clone() else {
            return RevealSummary {
                analytics: scoring::compute_round_analytics(&[], 0),
                early_reveal: self.early_reveal,
            };
        };
        let round_duration = self.round_duration_secs as f64;
        let round_start_ms = self.round_start_ms.unwrap_or(0);

        let mut samples = Vec::new();
        let names: Vec<String> = self.players.iter().map(|(name, _)| name.clone()).collect();

        for name in &names {
            let artist_bonus = self
                .artist_challenge
                .as_ref()
                .map(|c| if c.winner.as_deref() == Some(name.as_str()) { self.artist_bonus_points } else { 0 })
                .unwrap_or(0);
            let movie_bonus = self
                .movie_challenge
                .as_ref()
                .map(|c| c.player_bonus(name))
                .unwrap_or(0);

            let player = self.players.get_mut(name).expect("name came from iter");
            let outcome = if player.submitted {
                let guess = player.current_guess.expect("submitted implies guess set");
                let submitted_ms = player.submission_time_ms.unwrap_or(round_start_ms);
                let elapsed = (submitted_ms - round_start_ms).max(0) as f64 / 1000.0;
                let intro_bonus = player.intro_bonus;
                scoring::score_submitted_round(
                    guess,
                    song.year,
                    elapsed,
                    round_duration,
                    self.difficulty,
                    player.bet,
                    player.streak,
                    artist_bonus,
                    movie_bonus,
                    intro_bonus,
                )
            } else {
                scoring::score_missed_round(player.streak, artist_bonus, movie_bonus)
            };

            player.previous_streak = outcome.previous_streak;
            player.base_score = outcome.base_score;
            player.speed_multiplier = outcome.speed_multiplier;
            player.round_score = outcome.round_score;
            player.years_off = outcome.years_off;
            player.streak_bonus = outcome.streak_bonus;
            player.artist_bonus = outcome.artist_bonus;
            player.movie_bonus = outcome.movie_bonus;
            player.missed_round = outcome.missed_round;
            player.bet_outcome = outcome.bet_outcome;
            player.streak = outcome.new_streak;
            player.best_streak = player.best_streak.max(player.streak);
            player.score += outcome.total_gain();
            player.round_scores.push(outcome.round_score);
            if !outcome.missed_round {
                player.rounds_played += 1;
                if let Some(elapsed) = player.submission_time_ms {
                    player.submission_times.push((elapsed - round_start_ms).max(0) as f64 / 1000.0);
                }
                if let Some(off) = outcome.years_off {
                    if off > 0 && off <= 1 {
                        player.close_calls += 1;
                    }
                }
            }
            if matches!(outcome.bet_outcome, scoring::BetOutcome::Won) {
                player.bets_placed += 1;
                player.bets_won += 1;
                self.aggregates.bets_won += 1;
            } else if matches!(outcome.bet_outcome, scoring::BetOutcome::Lost) {
                player.bets_placed += 1;
            }
            if outcome.movie_bonus > 0 {
                player.movie_bonus_total += outcome.movie_bonus;
            }

            match player.streak {
                3 => self.aggregates.streak_3_count += 1,
                5 => self.aggregates.streak_5_count += 1,
                7 => self.aggregates.streak_7_count += 1,
                _ => {}
            }

            if let Some(off) = outcome.years_off {
                samples.push(PlayerGuessSample {
                    name: name.clone(),
                    guess: player.current_guess.unwrap_or(song.year),
                    years_off: off,
                    submission_elapsed: player.submission_times.last().copied().unwrap_or(f64::MAX),
                });
            }
        }

        RevealSummary {
            analytics: scoring::compute_round_analytics(&samples, song.year),
            early_reveal: self.early_reveal,
        }
    }

    /// Superlatives computed from current cumulative player tallies.
    /// Safe to call at any phase; meaningful once at least one round has
    /// completed.
    pub fn superlatives(&self) -> Vec<Superlative> {
        let inputs: Vec<PlayerSuperlativeInputs> = self
            .players
            .iter()
            .map(|(name, p)| PlayerSuperlativeInputs {
                name: name.clone(),
                best_streak: p.best_streak,
                bets_placed: p.bets_placed,
                bets_won: p.bets_won,
                rounds_played: p.rounds_played,
                round_scores: p.round_scores.clone(),
                close_calls: p.close_calls,
                movie_bonus_total: p.movie_bonus_total,
                intro_speed_bonuses: p.intro_speed_bonuses,
                submission_times: p.submission_times.clone(),
            })
            .collect();
        scoring::calculate_superlatives(&inputs)
    }

    /// Advance from REVEAL back to PLAYING (next round) or to END, per the
    /// documented transition table. Caller draws the next song afterward
    /// via `begin_round` if this returns `Playing`.
    pub fn advance_from_reveal(&mut self) -> Result<GamePhase, GameErrorCode> {
        let guards = TransitionGuards {
            has_players: !self.players.is_empty(),
            pool_exhausted: self.pool_exhausted(),
            last_round: self.last_round,
        };
        let next = compute_transition(self.phase, GameEvent::NextRound, guards)
            .map_err(|_| GameErrorCode::InvalidAction)?;
        self.phase = next;
        if next == GamePhase::End {
            self.ended_at_ms = Some(self.clock.now_ms());
        }
        Ok(next)
    }

    /// Admin-forced end, from PLAYING or REVEAL.
    pub fn end_game(&mut self) -> Result<(), GameErrorCode> {
        let guards = TransitionGuards::default();
        self.phase = compute_transition(self.phase, GameEvent::EndGame, guards)
            .map_err(|_| GameErrorCode::InvalidAction)?;
        self.ended_at_ms = Some(self.clock.now_ms());
        Ok(())
    }

    /// Full reset back to LOBBY, clearing all per-game state.
    pub fn reset_to_lobby(&mut self) {
        self.game_id = new_game_id();
        self.phase = GamePhase::Lobby;
        self.players.clear();
        self.round = 0;
        self.current_song = None;
        self.round_start_ms = None;
        self.deadline_ms = None;
        self.last_round = false;
        self.early_reveal = false;
        self.song_stopped = false;
        self.artist_challenge = None;
        self.movie_challenge = None;
        self.intro_round = None;
        self.aggregates = GameAggregates::default();
        self.playlist_manager = None;
        self.ended_at_ms = None;
        self.playlist_names = Vec::new();
        self.challenges = ChallengeOptions::default();
    }

    pub fn admin_disconnect_grace_elapsed(&mut self) -> Result<(), GameErrorCode> {
        let guards = TransitionGuards::default();
        self.phase = compute_transition(self.phase, GameEvent::AdminDisconnectGraceElapsed, guards)
            .map_err(|_| GameErrorCode::InvalidAction)?;
        Ok(())
    }

    pub fn admin_reconnect(&mut self) -> Result<(), GameErrorCode> {
        let guards = TransitionGuards::default();
        self.phase = compute_transition(self.phase, GameEvent::AdminReconnect, guards)
            .map_err(|_| GameErrorCode::InvalidAction)?;
        self.players.clear_disconnected_admin();
        Ok(())
    }

    /// Stop the current round's song playback. Idempotent: returns
    /// `Ok(false)` without reacting a second time if already stopped.
    /// Only valid while PLAYING.
    pub fn stop_song(&mut self) -> Result<bool, GameErrorCode> {
        if self.phase != GamePhase::Playing {
            return Err(GameErrorCode::InvalidAction);
        }
        if self.song_stopped {
            return Ok(false);
        }
        self.song_stopped = true;
        Ok(true)
    }

    /// Adjust the media player volume one step in the given direction,
    /// clamped to [0, 1].
    pub fn adjust_volume(&mut self, up: bool) -> f64 {
        let delta = if up { 0.1 } else { -0.1 };
        self.volume = (self.volume + delta).clamp(0.0, 1.0);
        self.volume
    }

    pub fn remaining_song_count(&self) -> usize {
        self.playlist_manager
            .as_ref()
            .map(|m| m.get_remaining_count())
            .unwrap_or(0)
    }
}

fn new_game_id() -> String {
    Uuid::new_v4().simple().to_string()[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use std::sync::Arc;

    fn song(year: i32, uri: &str) -> Song {
        Song {
            year,
            uri: uri.to_string(),
            uri_apple_music: None,
            uri_youtube_music: None,
            title: "Title".into(),
            artist: "Artist".into(),
            album_art: None,
            fun_fact: None,
            fun_fact_de: None,
            fun_fact_es: None,
            alt_artists: Vec::new(),
            movie: None,
            movie_choices: Vec::new(),
            chart_info: None,
            certifications: None,
            awards: None,
        }
    }

    fn new_game() -> GameState {
        let clock = Arc::new(TestClock::new(0));
        GameState::new(clock, 0.0, 5, 15)
    }

    #[test]
    fn full_round_lifecycle_scores_exact_guess() {
        let mut game = new_game();
        game.configure(vec![song(1985, "a")], Difficulty::Normal, 30, vec!["test".to_string()], ChallengeOptions::default()).unwrap();
        game.join("Alice", false).unwrap();
        game.begin_round().unwrap();
        assert_eq!(game.phase, GamePhase::Playing);

        game.submit_guess("Alice", 1985, false).unwrap();
        assert!(game.all_connected_submitters_complete());

        game.force_reveal(true).unwrap();
        assert_eq!(game.phase, GamePhase::Reveal);
        let summary = game.finalize_reveal();
        assert!(summary.early_reveal);
        assert_eq!(game.players.get("Alice").unwrap().round_score, 10);
        assert_eq!(game.players.get("Alice").unwrap().score, 10);
    }

    #[test]
    fn reconnect_preserves_cumulative_state() {
        let mut game = new_game();
        game.configure(vec![song(1985, "a")], Difficulty::Normal, 30, vec!["test".to_string()], ChallengeOptions::default()).unwrap();
        game.join("Alice", false).unwrap();
        game.players.get_mut("Alice").unwrap().score = 42;
        game.mark_disconnected("Alice");

        let reconnected = game.join("Alice", false).unwrap();
        assert!(reconnected);
        assert_eq!(game.players.get("Alice").unwrap().score, 42);
        assert!(game.players.get("Alice").unwrap().connected);
    }

    #[test]
    fn submit_rejects_after_deadline() {
        let mut game = new_game();
        game.configure(vec![song(1985, "a")], Difficulty::Normal, 30, vec!["test".to_string()], ChallengeOptions::default()).unwrap();
        game.join("Alice", false).unwrap();
        game.begin_round().unwrap();

        // advance past deadline
        let clock = Arc::new(TestClock::new(31_000));
        game.clock = clock;
        let err = game.submit_guess("Alice", 1985, false).unwrap_err();
        assert_eq!(err, GameErrorCode::RoundExpired);
    }

    #[test]
    fn exhausted_pool_ends_game_on_next_round() {
        let mut game = new_game();
        game.configure(vec![song(1985, "a")], Difficulty::Normal, 30, vec!["test".to_string()], ChallengeOptions::default()).unwrap();
        game.join("Alice", false).unwrap();
        game.begin_round().unwrap();
        game.force_reveal(false).unwrap();
        game.finalize_reveal();
        assert!(game.last_round);
        let next = game.advance_from_reveal().unwrap();
        assert_eq!(next, GamePhase::End);
    }
}
