//! Central application state: the single in-memory `GameState` behind a
//! lock, the live connection registry, and round-timer / disconnect-grace
//! task management. Mirrors the teacher's `AppState` shape (locked,
//! closure-based access helpers) with persistence-coordinator logic
//! replaced by game orchestration.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analytics::{AnalyticsStore, GameRecord};
use crate::config::AppConfig;
use crate::error::GameErrorCode;
use crate::game::GameState;
use crate::game::state_machine::GamePhase;
use crate::highlights::HighlightsTracker;
use crate::media_player::MediaPlayer;
use crate::scoring::BetOutcome;
use crate::stats::{PlayerRoundResult, StatsStore};
use crate::ws::dto::{OutboundMessage, PlayerView, SongView, StateSnapshot, WinnerView};

/// Shared reference to application state, safe to clone across tasks.
pub type SharedState = Arc<AppState>;

/// A single live `/ws` connection: its outbound writer channel, keyed by a
/// server-generated id rather than player name so a reconnect can rebind
/// the name without tearing down unrelated bookkeeping.
pub struct Connection {
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state coordinating the game model, live
/// connections, and background timer/grace tasks.
pub struct AppState {
    config: Arc<AppConfig>,
    game: Mutex<GameState>,
    media_player: Arc<dyn MediaPlayer>,
    analytics: Arc<AnalyticsStore>,
    stats: Arc<StatsStore>,
    highlights: Mutex<HighlightsTracker>,
    /// Each player's leaderboard rank as of the last reveal, keyed by
    /// name; compared against the current rank to detect comebacks.
    rank_history: Mutex<HashMap<String, usize>>,

    connections: DashMap<Uuid, Connection>,
    /// Player name (as stored in the registry) to the connection currently
    /// speaking for them. Looked up for targeted sends; never the other
    /// direction, so a dropped connection doesn't need to know its player.
    player_conns: DashMap<String, Uuid>,

    /// Bumped on every transition out of PLAYING; a stale round-timer fire
    /// compares its captured generation before acting.
    round_generation: AtomicU64,
    round_timer: Mutex<Option<JoinHandle<()>>>,
    disconnect_tasks: DashMap<String, JoinHandle<()>>,
    admin_task: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        clock: crate::clock::SharedClock,
        media_player: Arc<dyn MediaPlayer>,
        analytics: Arc<AnalyticsStore>,
        stats: Arc<StatsStore>,
    ) -> SharedState {
        let game = GameState::new(
            clock,
            config.intro_round_chance,
            config.intro_duration_secs,
            config.artist_bonus_points,
        );
        Arc::new(Self {
            config,
            game: Mutex::new(game),
            media_player,
            analytics,
            stats,
            highlights: Mutex::new(HighlightsTracker::new()),
            rank_history: Mutex::new(HashMap::new()),
            connections: DashMap::new(),
            player_conns: DashMap::new(),
            round_generation: AtomicU64::new(0),
            round_timer: Mutex::new(None),
            disconnect_tasks: DashMap::new(),
            admin_task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn analytics(&self) -> &Arc<AnalyticsStore> {
        &self.analytics
    }

    pub fn stats(&self) -> &Arc<StatsStore> {
        &self.stats
    }

    pub async fn media_player_available(&self) -> bool {
        self.media_player.is_available().await
    }

    /// Load a song pool and game options ahead of the admin's `start_game`
    /// action. Must be called while in LOBBY.
    pub async fn configure_game(
        &self,
        pool: Vec<crate::playlist::Song>,
        difficulty: crate::scoring::Difficulty,
        round_duration_secs: u64,
        playlist_names: Vec<String>,
        challenges: crate::game::ChallengeOptions,
    ) -> Result<(), GameErrorCode> {
        self.with_game_mut(|game| game.configure(pool, difficulty, round_duration_secs, playlist_names, challenges)).await
    }

    /// Stop the current round's song for real: guards on phase, actually
    /// stops the media player, and only broadcasts once.
    pub async fn stop_song(self: &Arc<Self>) -> Result<bool, GameErrorCode> {
        let newly_stopped = self.with_game_mut(|g| g.stop_song()).await?;
        if newly_stopped {
            if let Err(err) = self.media_player.stop().await {
                warn!(error = %err, "media player failed to stop song");
            }
        }
        Ok(newly_stopped)
    }

    /// Reset the whole game back to LOBBY, cancelling any pending
    /// round/grace tasks so nothing from the old game leaks into the next.
    pub async fn reset_to_lobby(&self) {
        self.cancel_all_pending_tasks().await;
        self.with_game_mut(|g| g.reset_to_lobby()).await;
        self.player_conns.clear();
        self.highlights.lock().await.reset();
        self.rank_history.lock().await.clear();
    }

    /// Mutate the game model under lock. The closure stays synchronous so
    /// the lock never spans an `.await`.
    pub async fn with_game_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut GameState) -> R,
    {
        let mut guard = self.game.lock().await;
        f(&mut guard)
    }

    pub async fn with_game<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&GameState) -> R,
    {
        let guard = self.game.lock().await;
        f(&guard)
    }

    // -- connection registry -------------------------------------------

    pub fn register_connection(&self, id: Uuid, tx: mpsc::UnboundedSender<Message>) {
        self.connections.insert(id, Connection { tx });
    }

    pub fn unregister_connection(&self, id: Uuid) {
        self.connections.remove(&id);
    }

    pub fn bind_player(&self, name: &str, conn_id: Uuid) {
        self.player_conns.insert(name.to_string(), conn_id);
    }

    pub fn unbind_player(&self, name: &str) {
        self.player_conns.remove(name);
    }

    fn send_raw(&self, conn_id: Uuid, message: &Message) {
        if let Some(conn) = self.connections.get(&conn_id) {
            let _ = conn.tx.send(message.clone());
        }
    }

    fn encode(message: &OutboundMessage) -> Message {
        match serde_json::to_string(message) {
            Ok(payload) => Message::Text(payload.into()),
            Err(err) => {
                warn!(error = %err, "failed to serialize outbound message");
                Message::Text("{}".into())
            }
        }
    }

    /// Send a message to one connection only (join replies, submit_ack,
    /// get_state, errors).
    pub fn send_to(&self, conn_id: Uuid, message: &OutboundMessage) {
        self.send_raw(conn_id, &Self::encode(message));
    }

    pub fn send_to_player(&self, name: &str, message: &OutboundMessage) {
        if let Some(conn_id) = self.player_conns.get(name).map(|e| *e) {
            self.send_to(conn_id, message);
        }
    }

    /// Broadcast to every connected socket. A send failure on one
    /// connection never stops delivery to the others — `send` on an
    /// unbounded channel only fails if the receiver is already gone, which
    /// the writer task's own teardown handles.
    pub fn broadcast(&self, message: &OutboundMessage) {
        let encoded = Self::encode(message);
        for entry in self.connections.iter() {
            let _ = entry.value().tx.send(encoded.clone());
        }
    }

    /// Build the authoritative `state` snapshot for the current phase.
    pub async fn snapshot(&self) -> StateSnapshot {
        let highlights_top = self.highlights.lock().await.top_highlights();
        self.with_game(|game| build_snapshot(game, &highlights_top)).await
    }

    pub async fn broadcast_state(&self) {
        let snapshot = self.snapshot().await;
        self.broadcast(&OutboundMessage::State(Box::new(snapshot)));
    }

    // -- round timer -----------------------------------------------------

    /// Arm a timer that fires `end_round` when the round's deadline passes.
    /// Captures the current generation so a stale fire (round already
    /// ended some other way) is a cheap no-op.
    pub async fn arm_round_timer(self: &Arc<Self>, duration: Duration) {
        self.cancel_round_timer().await;
        let generation = self.round_generation.load(Ordering::SeqCst);
        let state = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            state.on_round_timeout(generation).await;
        });
        *self.round_timer.lock().await = Some(handle);
    }

    pub async fn cancel_round_timer(&self) {
        if let Some(handle) = self.round_timer.lock().await.take() {
            handle.abort();
        }
    }

    fn bump_generation(&self) -> u64 {
        self.round_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn on_round_timeout(self: Arc<Self>, generation: u64) {
        if self.round_generation.load(Ordering::SeqCst) != generation {
            return;
        }
        let in_playing = self.with_game(|g| g.phase == GamePhase::Playing).await;
        if !in_playing {
            return;
        }
        self.reveal_round(false).await;
    }

    // -- round lifecycle orchestration -----------------------------------

    /// Begin a round (from LOBBY or REVEAL): draw a song, tell the media
    /// player to play it, arm the timer, broadcast.
    pub async fn begin_round(self: &Arc<Self>) {
        self.cancel_round_timer().await;
        self.bump_generation();

        let outcome = self.with_game_mut(|game| game.begin_round()).await;
        match outcome {
            Ok(Some(song)) => {
                if let Err(err) = self.media_player.play_song(song).await {
                    warn!(error = %err, "media player failed to start song");
                    self.with_game_mut(|g| g.aggregates.error_count += 1).await;
                    self.analytics.record_error("media_player", err.to_string()).await;
                }
                let duration = self.with_game(|g| Duration::from_secs(g.round_duration_secs)).await;
                self.arm_round_timer(duration).await;
                self.broadcast_state().await;
            }
            Ok(None) => {
                self.finish_game().await;
            }
            Err(err) => {
                warn!(?err, "begin_round rejected");
            }
        }
    }

    /// End the current round (timer expiry, all-submitted, or admin
    /// `next_round` early) and move to REVEAL.
    pub async fn reveal_round(self: &Arc<Self>, early: bool) {
        self.cancel_round_timer().await;
        self.bump_generation();

        let transitioned = self
            .with_game_mut(|game| game.force_reveal(early).is_ok())
            .await;
        if !transitioned {
            return;
        }

        let _ = self.media_player.stop().await;

        let (summary, song_title, song_artist, song_year, player_results, difficulty, song_uri) = self
            .with_game_mut(|game| {
                let song = game.current_song.clone();
                let summary = game.finalize_reveal();
                let results: Vec<PlayerRoundResult> = game
                    .players
                    .iter()
                    .map(|(_, p)| PlayerRoundResult { submitted: p.submitted, years_off: p.years_off.unwrap_or(-1) })
                    .collect();
                (
                    summary,
                    song.as_ref().map(|s| s.title.clone()).unwrap_or_default(),
                    song.as_ref().map(|s| s.artist.clone()).unwrap_or_default(),
                    song.as_ref().map(|s| s.year).unwrap_or(0),
                    results,
                    game.difficulty,
                    song.as_ref().map(|s| s.uri.clone()).unwrap_or_default(),
                )
            })
            .await;

        self.record_reveal_highlights(&summary, &song_title, song_year).await;

        if !song_uri.is_empty() {
            let stats = Arc::clone(&self.stats);
            tokio::spawn(async move {
                stats
                    .record_song_result(&song_uri, &song_title, &song_artist, song_year, &player_results, difficulty)
                    .await;
            });
        }

        self.broadcast_state().await;
    }

    async fn record_reveal_highlights(&self, summary: &crate::game::RevealSummary, song_title: &str, song_year: i32) {
        let round = self.with_game(|g| g.round).await;

        for name in &summary.analytics.exact_match_players {
            self.highlights.lock().await.record_exact_match(name, song_title, song_year, round);
        }

        let snapshot: Vec<PlayerRevealSnapshot> = self
            .with_game(|g| {
                g.players
                    .iter()
                    .map(|(_, p)| PlayerRevealSnapshot {
                        name: p.name.clone(),
                        years_off: p.years_off,
                        bet_outcome: p.bet_outcome,
                        round_score: p.round_score,
                        score: p.score,
                        streak: p.streak,
                        last_submission_secs: p.submission_times.last().copied(),
                    })
                    .collect()
            })
            .await;

        let mut tracker = self.highlights.lock().await;

        if let Some(champion) = &summary.analytics.speed_champion {
            let elapsed = snapshot.iter().find(|p| &p.name == champion).and_then(|p| p.last_submission_secs).unwrap_or(0.0);
            tracker.record_speed_record(champion, elapsed, round);
        }

        for p in &snapshot {
            if p.streak >= 3 {
                tracker.record_streak(&p.name, p.streak, round);
            }
            if p.bet_outcome == BetOutcome::Won {
                tracker.record_bet_win(&p.name, p.round_score, round);
            }
            if let Some(years_off) = p.years_off {
                if years_off.abs() == 1 {
                    tracker.record_heartbreaker(&p.name, song_title, years_off.abs(), round);
                }
            }
        }

        if let Some(max_round_score) = snapshot.iter().map(|p| p.round_score).filter(|&s| s > 0).max() {
            let tied: Vec<String> = snapshot.iter().filter(|p| p.round_score == max_round_score).map(|p| p.name.clone()).collect();
            if tied.len() >= 2 {
                tracker.record_photo_finish(&tied, round);
            }
        }
        drop(tracker);

        self.record_comeback_highlights(&snapshot, round).await;
    }

    /// Compare this reveal's leaderboard rank against the last one on
    /// record for each player; a jump of two or more spots is a comeback.
    async fn record_comeback_highlights(&self, snapshot: &[PlayerRevealSnapshot], round: u32) {
        let mut ranked: Vec<&PlayerRevealSnapshot> = snapshot.iter().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

        let mut rank_history = self.rank_history.lock().await;
        let mut tracker = self.highlights.lock().await;
        for (idx, p) in ranked.iter().enumerate() {
            let rank = idx + 1;
            if let Some(&previous_rank) = rank_history.get(&p.name) {
                if previous_rank > rank {
                    let gained = previous_rank - rank;
                    if gained >= 2 {
                        tracker.record_comeback(&p.name, gained as u32, round);
                    }
                }
            }
            rank_history.insert(p.name.clone(), rank);
        }
    }

    /// Advance from REVEAL: either begin the next round or finish the game.
    pub async fn advance_from_reveal(self: &Arc<Self>) {
        let next = self.with_game_mut(|game| game.advance_from_reveal()).await;
        match next {
            Ok(GamePhase::End) => self.finish_game().await,
            Ok(_) => self.begin_round().await,
            Err(err) => warn!(?err, "advance_from_reveal rejected"),
        }
    }

    /// Admin-forced end, from PLAYING or REVEAL.
    pub async fn end_game(self: &Arc<Self>) {
        self.cancel_round_timer().await;
        self.bump_generation();
        let ok = self.with_game_mut(|game| game.end_game().is_ok()).await;
        if ok {
            self.finish_game().await;
        }
    }

    async fn finish_game(self: &Arc<Self>) {
        let _ = self.media_player.stop().await;

        let record = self
            .with_game(|game| {
                let total_points: i32 = game.players.iter().map(|(_, p)| p.score).sum();
                let winner = game
                    .players
                    .iter()
                    .max_by_key(|(_, p)| p.score)
                    .map(|(name, p)| (name.clone(), p.score));
                (
                    game.game_id.clone(),
                    game.round,
                    game.players.len(),
                    winner,
                    total_points,
                    game.aggregates.clone(),
                    game.created_at_ms,
                    game.ended_at_ms.unwrap_or(game.created_at_ms),
                    difficulty_label(game.difficulty),
                    game.playlist_names.clone(),
                )
            })
            .await;
        let (game_id, rounds, player_count, winner, total_points, aggregates, created_at_ms, ended_at_ms, difficulty, playlist_names) =
            record;
        let playlist_names = if playlist_names.is_empty() { vec!["default".to_string()] } else { playlist_names };

        let average_score = if player_count > 0 { total_points as f64 / player_count as f64 } else { 0.0 };

        if let Some((winner_name, winner_score)) = &winner {
            let playlist_label = playlist_names.join(",");
            let comparison = self
                .stats
                .record_game(&playlist_label, rounds, player_count, winner_name, *winner_score, total_points)
                .await;
            info!(?comparison, "game finished");
        }

        self.analytics
            .add_game(GameRecord {
                game_id,
                started_at: created_at_ms / 1000,
                ended_at: ended_at_ms / 1000,
                duration_seconds: (ended_at_ms - created_at_ms) / 1000,
                player_count,
                playlist_names,
                rounds_played: rounds,
                average_score,
                difficulty: difficulty.to_string(),
                error_count: aggregates.error_count,
                streak_3_count: aggregates.streak_3_count,
                streak_5_count: aggregates.streak_5_count,
                streak_7_count: aggregates.streak_7_count,
                total_bets: aggregates.total_bets,
                bets_won: aggregates.bets_won,
            })
            .await;

        self.broadcast(&OutboundMessage::GameEnded);
        self.broadcast_state().await;
        self.highlights.lock().await.reset();
    }

    // -- disconnect grace ------------------------------------------------

    pub fn cancel_disconnect_task(&self, name: &str) {
        if let Some((_, handle)) = self.disconnect_tasks.remove(name) {
            handle.abort();
        }
    }

    /// Mark a regular player disconnected and schedule their removal after
    /// the grace period unless they reconnect first.
    pub async fn schedule_player_removal(self: &Arc<Self>, name: String) {
        self.with_game_mut(|g| g.mark_disconnected(&name)).await;
        self.unbind_player(&name);
        self.cancel_disconnect_task(&name);

        let grace = Duration::from_secs(self.config.disconnect_grace_period_secs);
        let state = Arc::clone(self);
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let still_disconnected = state
                .with_game(|g| g.players.get(&task_name).map(|p| !p.connected).unwrap_or(false))
                .await;
            if still_disconnected {
                state.with_game_mut(|g| g.remove_player(&task_name)).await;
                state.broadcast_state().await;
            }
        });
        self.disconnect_tasks.insert(name, handle);
    }

    /// Mark the admin disconnected and schedule a pause after the grace
    /// period unless they reconnect first (same name).
    pub async fn schedule_admin_pause(self: &Arc<Self>, name: String) {
        self.with_game_mut(|g| g.mark_disconnected(&name)).await;
        self.unbind_player(&name);
        if let Some(handle) = self.admin_task.lock().await.take() {
            handle.abort();
        }

        let grace = Duration::from_secs(self.config.disconnect_grace_period_secs);
        let state = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let still_disconnected = state
                .with_game(|g| g.players.disconnected_admin_name().is_some())
                .await;
            if still_disconnected {
                let paused = state.with_game_mut(|g| g.admin_disconnect_grace_elapsed().is_ok()).await;
                if paused {
                    let _ = state.media_player.stop().await;
                    state.cancel_round_timer().await;
                    state.broadcast_state().await;
                }
            }
        });
        *self.admin_task.lock().await = Some(handle);
    }

    pub async fn cancel_admin_pause_task(&self) {
        if let Some(handle) = self.admin_task.lock().await.take() {
            handle.abort();
        }
    }

    /// Teardown of all pending background tasks — called when a game ends
    /// or resets, so no stale task leaks into the next game.
    pub async fn cancel_all_pending_tasks(&self) {
        self.cancel_round_timer().await;
        self.cancel_admin_pause_task().await;
        for entry in self.disconnect_tasks.iter() {
            entry.value().abort();
        }
        self.disconnect_tasks.clear();
    }

    /// Adjust volume and push it to the media player.
    pub async fn adjust_volume(self: &Arc<Self>, up: bool) -> Result<f64, GameErrorCode> {
        let level = self.with_game_mut(|g| g.adjust_volume(up)).await;
        if let Err(err) = self.media_player.set_volume(level).await {
            warn!(error = %err, "media player set_volume failed");
            return Err(GameErrorCode::MaUnavailable);
        }
        Ok(level)
    }
}

/// Per-player data pulled out of the lock once per reveal so the
/// highlight checks below don't each need their own `with_game` call.
struct PlayerRevealSnapshot {
    name: String,
    years_off: Option<i32>,
    bet_outcome: BetOutcome,
    round_score: i32,
    score: i32,
    streak: u32,
    last_submission_secs: Option<f64>,
}

fn build_snapshot(game: &GameState, highlights: &[crate::highlights::GameHighlight]) -> StateSnapshot {
    let players: Vec<PlayerView> = game
        .players
        .iter()
        .map(|(_, p)| {
            let reveal = game.phase == GamePhase::Reveal || game.phase == GamePhase::End;
            PlayerView {
                name: p.name.clone(),
                score: p.score,
                connected: p.connected,
                streak: p.streak,
                is_admin: p.is_admin,
                guess: reveal.then_some(p.current_guess).flatten(),
                round_score: reveal.then_some(p.round_score),
                years_off: reveal.then(|| p.years_off).flatten(),
                missed_round: reveal.then_some(p.missed_round),
                bet: reveal.then_some(p.bet),
                bet_outcome: reveal.then_some(p.bet_outcome),
                speed_multiplier: reveal.then_some(p.speed_multiplier),
            }
        })
        .collect();

    let in_round = matches!(game.phase, GamePhase::Playing | GamePhase::Reveal);
    let in_reveal_or_end = matches!(game.phase, GamePhase::Reveal | GamePhase::End);

    let song = game.current_song.as_ref().map(|song| SongView {
        artist: song.artist.clone(),
        title: song.title.clone(),
        album_art: song.album_art.clone(),
        year: (game.phase == GamePhase::Reveal || game.phase == GamePhase::End).then_some(song.year),
        fun_fact: (game.phase == GamePhase::Reveal).then(|| song.fun_fact_for("en").map(str::to_string)).flatten(),
        chart_info: (game.phase == GamePhase::Reveal).then(|| song.chart_info.clone()).flatten(),
        certifications: (game.phase == GamePhase::Reveal).then(|| song.certifications.clone()).flatten(),
        awards: (game.phase == GamePhase::Reveal).then(|| song.awards.clone()).flatten(),
    });

    let winner = (game.phase == GamePhase::End)
        .then(|| game.players.iter().max_by_key(|(_, p)| p.score).map(|(name, p)| WinnerView { name: name.clone(), score: p.score }))
        .flatten();

    StateSnapshot {
        game_id: game.game_id.clone(),
        phase: game.phase,
        player_count: game.players.len(),
        players,
        join_url: matches!(game.phase, GamePhase::Lobby | GamePhase::Playing).then(|| format!("/play?game={}", game.game_id)),
        round: in_round.then_some(game.round),
        total_rounds: in_round.then(|| Some(game.round as usize + game.remaining_song_count())).flatten(),
        deadline: (game.phase == GamePhase::Playing).then_some(game.deadline_ms).flatten(),
        song,
        last_round: in_round.then_some(game.last_round),
        early_reveal: in_round.then_some(game.early_reveal),
        winner,
        highlights: in_reveal_or_end.then(|| highlights.to_vec()),
        superlatives: (game.phase == GamePhase::End).then(|| game.superlatives()),
        analytics: None,
    }
}

fn difficulty_label(difficulty: crate::scoring::Difficulty) -> &'static str {
    match difficulty {
        crate::scoring::Difficulty::Easy => "easy",
        crate::scoring::Difficulty::Normal => "normal",
        crate::scoring::Difficulty::Hard => "hard",
    }
}
