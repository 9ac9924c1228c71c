//! StatsStore (C10): per-game history, all-time weighted averages, and
//! per-song difficulty tracking, persisted to a single JSON file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::scoring::Difficulty;

const MIN_PLAYS_FOR_DIFFICULTY: u32 = 3;
const CORRECT_GUESS_THRESHOLD: i32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GameHistoryEntry {
    pub id: String,
    pub playlist: String,
    pub rounds: u32,
    pub player_count: usize,
    pub winner: String,
    pub winner_score: i32,
    pub avg_score_per_round: f64,
    pub total_points: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PlaylistStats {
    times_played: u64,
    total_rounds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AllTimeStats {
    games_played: u64,
    highest_avg_score: f64,
    highest_avg_game_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SongStats {
    times_played: u64,
    correct_guesses: u64,
    total_guesses: u64,
    total_years_off: i64,
    exact_matches: u64,
    close_matches: u64,
    title: String,
    artist: String,
    year: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StatsData {
    version: u32,
    games: Vec<GameHistoryEntry>,
    playlists: HashMap<String, PlaylistStats>,
    all_time: AllTimeStats,
    songs: HashMap<String, SongStats>,
}

/// Summary of a single player's submission for a completed round, used by
/// `record_song_result` to update per-song difficulty tallies.
#[derive(Debug, Clone, Copy)]
pub struct PlayerRoundResult {
    pub submitted: bool,
    pub years_off: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameComparison {
    pub avg_score: f64,
    pub all_time_avg: f64,
    pub difference: f64,
    pub is_new_record: bool,
    pub is_first_game: bool,
    pub is_above_average: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SongDifficulty {
    pub stars: u8,
    pub label: &'static str,
    pub accuracy: f64,
    pub times_played: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NamedSongStat {
    pub title: String,
    pub artist: String,
    pub year: i32,
    pub play_count: u64,
    pub accuracy: f64,
    pub avg_year_diff: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SongStatsSummary {
    pub most_played: Option<NamedSongStat>,
    pub hardest: Option<NamedSongStat>,
    pub easiest: Option<NamedSongStat>,
}

pub struct StatsStore {
    path: PathBuf,
    data: Mutex<StatsData>,
}

impl StatsStore {
    pub async fn load(path: PathBuf) -> Arc<Self> {
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "stats file corrupted, recreating");
                    StatsData { version: 1, ..Default::default() }
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "no stats file found, starting fresh");
                StatsData { version: 1, ..Default::default() }
            }
        };
        Arc::new(Self { path, data: Mutex::new(data) })
    }

    async fn save(&self) {
        let data = self.data.lock().await.clone();
        if let Err(err) = write_atomic(&self.path, &data).await {
            warn!(error = %err, "failed to save stats");
        }
    }

    fn all_time_avg(data: &StatsData) -> f64 {
        if data.games.is_empty() {
            return 0.0;
        }
        let mut total_weighted = 0.0;
        let mut total_weight: u64 = 0;
        for game in &data.games {
            let weight = game.rounds as u64 * game.player_count as u64;
            total_weighted += game.avg_score_per_round * weight as f64;
            total_weight += weight;
        }
        if total_weight == 0 { 0.0 } else { total_weighted / total_weight as f64 }
    }

    fn comparison(data: &StatsData, avg_score: f64) -> GameComparison {
        let is_first_game = data.all_time.games_played == 0;
        let all_time_avg = Self::all_time_avg(data);
        let is_new_record = !is_first_game && avg_score > data.all_time.highest_avg_score;
        let difference = if is_first_game { 0.0 } else { avg_score - all_time_avg };
        GameComparison {
            avg_score: round2(avg_score),
            all_time_avg: round2(all_time_avg),
            difference: round2(difference),
            is_new_record,
            is_first_game,
            is_above_average: !is_first_game && difference > 0.0,
        }
    }

    /// Record a completed game. Games with zero players are skipped per
    /// the documented invariant; callers should still call this so the
    /// comparison (vs. a flat `0.0`) is returned consistently.
    pub async fn record_game(
        &self,
        playlist: &str,
        rounds: u32,
        player_count: usize,
        winner: &str,
        winner_score: i32,
        total_points: i32,
    ) -> GameComparison {
        if player_count == 0 {
            let data = self.data.lock().await;
            return Self::comparison(&data, 0.0);
        }

        let avg_score_per_round = if rounds == 0 {
            0.0
        } else {
            total_points as f64 / (rounds as f64 * player_count as f64)
        };

        let mut data = self.data.lock().await;
        let comparison = Self::comparison(&data, avg_score_per_round);

        let game_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        data.games.push(GameHistoryEntry {
            id: game_id.clone(),
            playlist: playlist.to_string(),
            rounds,
            player_count,
            winner: winner.to_string(),
            winner_score,
            avg_score_per_round: round2(avg_score_per_round),
            total_points,
        });

        let playlist_stats = data.playlists.entry(playlist.to_string()).or_default();
        playlist_stats.times_played += 1;
        playlist_stats.total_rounds += rounds as u64;

        data.all_time.games_played += 1;
        let mut comparison = comparison;
        if avg_score_per_round > data.all_time.highest_avg_score {
            data.all_time.highest_avg_score = round2(avg_score_per_round);
            data.all_time.highest_avg_game_id = Some(game_id.clone());
            comparison.is_new_record = true;
        }
        drop(data);

        info!(game_id = %game_id, avg_score_per_round, player_count, rounds, "recorded game stats");
        self.save().await;
        comparison
    }

    /// Record per-player results for a completed round against a song,
    /// updating difficulty tracking. `close_range` is the active
    /// difficulty's close-match tolerance.
    pub async fn record_song_result(
        &self,
        song_uri: &str,
        title: &str,
        artist: &str,
        year: i32,
        results: &[PlayerRoundResult],
        difficulty: Difficulty,
    ) {
        let close_range = match difficulty {
            Difficulty::Easy => 7,
            Difficulty::Normal => 3,
            Difficulty::Hard => 2,
        };
        let key = uri_to_key(song_uri);

        let mut data = self.data.lock().await;
        let song = data.songs.entry(key).or_default();
        song.times_played += 1;
        song.title = title.to_string();
        song.artist = artist.to_string();
        song.year = year;

        for result in results {
            if !result.submitted {
                continue;
            }
            song.total_guesses += 1;
            song.total_years_off += result.years_off as i64;
            if result.years_off == 0 {
                song.exact_matches += 1;
                song.correct_guesses += 1;
            } else if result.years_off <= close_range {
                song.close_matches += 1;
                song.correct_guesses += 1;
            } else if result.years_off <= CORRECT_GUESS_THRESHOLD {
                song.correct_guesses += 1;
            }
        }
        drop(data);
        self.save().await;
    }

    pub async fn get_song_difficulty(&self, song_uri: &str) -> Option<SongDifficulty> {
        let data = self.data.lock().await;
        let song = data.songs.get(&uri_to_key(song_uri))?;
        if song.times_played < MIN_PLAYS_FOR_DIFFICULTY as u64 || song.total_guesses == 0 {
            return None;
        }
        let accuracy = song.correct_guesses as f64 / song.total_guesses as f64 * 100.0;
        let (stars, label) = star_rating(accuracy);
        Some(SongDifficulty {
            stars,
            label,
            accuracy: round1(accuracy),
            times_played: song.times_played,
        })
    }

    pub async fn compute_song_stats(&self) -> SongStatsSummary {
        let data = self.data.lock().await;
        let mut entries: Vec<NamedSongStat> = data
            .songs
            .values()
            .filter(|s| s.total_guesses > 0 && !s.title.is_empty())
            .map(|s| NamedSongStat {
                title: s.title.clone(),
                artist: s.artist.clone(),
                year: s.year,
                play_count: s.times_played,
                accuracy: round2((s.exact_matches as f64 + s.close_matches as f64 * 0.5) / s.total_guesses as f64),
                avg_year_diff: round1(s.total_years_off as f64 / s.total_guesses as f64),
            })
            .collect();

        if entries.is_empty() {
            return SongStatsSummary { most_played: None, hardest: None, easiest: None };
        }

        let most_played = entries.iter().max_by_key(|s| s.play_count).cloned();
        let max_play_count = entries.iter().map(|s| s.play_count).max().unwrap_or(0);
        let threshold = max_play_count.min(3);
        entries.retain(|s| s.play_count >= threshold);

        let hardest = entries
            .iter()
            .min_by(|a, b| a.accuracy.total_cmp(&b.accuracy))
            .cloned();
        let easiest = entries
            .iter()
            .max_by(|a, b| a.accuracy.total_cmp(&b.accuracy))
            .cloned();

        SongStatsSummary { most_played, hardest, easiest }
    }

    pub async fn games_played(&self) -> u64 {
        self.data.lock().await.all_time.games_played
    }
}

fn star_rating(accuracy: f64) -> (u8, &'static str) {
    if accuracy >= 80.0 {
        (1, "Easy")
    } else if accuracy >= 60.0 {
        (2, "Medium")
    } else if accuracy >= 35.0 {
        (3, "Hard")
    } else {
        (4, "Extreme")
    }
}

fn uri_to_key(uri: &str) -> String {
    uri.replace(':', "_").replace('/', "_")
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

async fn write_atomic(path: &Path, data: &StatsData) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension("tmp");
    let contents = serde_json::to_string_pretty(data)?;
    tokio::fs::write(&tmp_path, contents).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_players_is_skipped_but_comparison_returned() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::load(dir.path().join("stats.json")).await;
        let comparison = store.record_game("90s", 5, 0, "Alice", 0, 0).await;
        assert!(comparison.is_first_game);
        assert_eq!(store.games_played().await, 0);
    }

    #[tokio::test]
    async fn first_game_is_always_a_record_but_not_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::load(dir.path().join("stats.json")).await;
        let comparison = store.record_game("90s", 5, 2, "Alice", 50, 100).await;
        assert!(comparison.is_first_game);
        assert!(!comparison.is_new_record);
        assert_eq!(store.games_played().await, 1);
    }

    #[tokio::test]
    async fn song_difficulty_requires_minimum_plays() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::load(dir.path().join("stats.json")).await;
        let results = vec![PlayerRoundResult { submitted: true, years_off: 0 }];
        store.record_song_result("spotify:1", "Song", "Artist", 1999, &results, Difficulty::Normal).await;
        assert!(store.get_song_difficulty("spotify:1").await.is_none());

        for _ in 0..(MIN_PLAYS_FOR_DIFFICULTY - 1) {
            store.record_song_result("spotify:1", "Song", "Artist", 1999, &results, Difficulty::Normal).await;
        }
        let difficulty = store.get_song_difficulty("spotify:1").await.unwrap();
        assert_eq!(difficulty.stars, 1);
    }
}
