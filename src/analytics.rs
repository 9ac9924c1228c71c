//! AnalyticsStore (C9): append-only game/error history with atomic JSON
//! persistence, periodic pruning into monthly summaries, and derived
//! dashboard metrics.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

const RETENTION_DAYS: i64 = 90;
const PRUNE_INTERVAL: u32 = 10;
const MAX_DETAILED_RECORDS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GameRecord {
    pub game_id: String,
    pub started_at: i64,
    pub ended_at: i64,
    pub duration_seconds: i64,
    pub player_count: usize,
    pub playlist_names: Vec<String>,
    pub rounds_played: u32,
    pub average_score: f64,
    pub difficulty: String,
    pub error_count: u32,
    pub streak_3_count: u32,
    pub streak_5_count: u32,
    pub streak_7_count: u32,
    pub total_bets: u32,
    pub bets_won: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorEvent {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlySummary {
    pub month: String,
    pub games_count: u64,
    pub total_players: u64,
    pub avg_players_per_game: f64,
    pub total_rounds: u64,
    pub avg_rounds_per_game: f64,
    pub error_rate: f64,
    /// Cumulative error count backing `error_rate`, so a later prune cycle
    /// touching the same month can recompute the ratio rather than
    /// overwrite it with only that cycle's count.
    pub total_errors: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AnalyticsData {
    version: u32,
    games: Vec<GameRecord>,
    errors: Vec<ErrorEvent>,
    monthly_summaries: Vec<MonthlySummary>,
}

impl AnalyticsData {
    fn empty() -> Self {
        Self {
            version: 1,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Trends {
    pub games: f64,
    pub players: f64,
    pub score: f64,
    pub errors: f64,
    pub rounds: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlaylistStat {
    pub name: String,
    pub play_count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<u64>,
    pub granularity: &'static str,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorStats {
    pub error_rate: f64,
    pub error_count: usize,
    pub total_events: u64,
    pub status: &'static str,
    pub recent_errors: Vec<ErrorEvent>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameMetrics {
    pub period: String,
    pub total_games: usize,
    pub avg_players_per_game: f64,
    pub avg_score: f64,
    pub error_rate: f64,
    pub peak_players: usize,
    pub avg_rounds: f64,
    pub trends: Trends,
    pub playlists: Vec<PlaylistStat>,
    pub chart_data: ChartData,
    pub error_stats: ErrorStats,
    pub streak_3_count: u32,
    pub streak_5_count: u32,
    pub streak_7_count: u32,
    pub total_bets: u32,
    pub bets_won: u32,
}

/// Persistent store for completed-game records and error events. Writes
/// are serialized by an internal lock and go through a temp-file-then-
/// rename swap so a crash mid-write never corrupts the file on disk.
pub struct AnalyticsStore {
    path: PathBuf,
    data: Mutex<AnalyticsData>,
    games_since_prune: Mutex<u32>,
}

impl AnalyticsStore {
    pub async fn load(path: PathBuf) -> Arc<Self> {
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "analytics file corrupted, recreating");
                    AnalyticsData::empty()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "no analytics file found, starting fresh");
                AnalyticsData::empty()
            }
        };
        let store = Arc::new(Self {
            path,
            data: Mutex::new(data),
            games_since_prune: Mutex::new(0),
        });
        store.prune().await;
        store
    }

    async fn save(&self) {
        let data = self.data.lock().await.clone();
        if let Err(err) = write_atomic(&self.path, &data).await {
            warn!(error = %err, "failed to save analytics");
        }
    }

    /// Fire-and-forget save: returns immediately, persists in the background.
    pub fn schedule_save(self: &Arc<Self>) {
        let store = Arc::clone(self);
        tokio::spawn(async move { store.save().await });
    }

    pub async fn add_game(self: &Arc<Self>, record: GameRecord) {
        info!(
            game_id = %record.game_id,
            players = record.player_count,
            rounds = record.rounds_played,
            "recording analytics for completed game"
        );
        let mut data = self.data.lock().await;
        data.games.push(record);
        drop(data);

        let mut since_prune = self.games_since_prune.lock().await;
        *since_prune += 1;
        let should_prune = *since_prune >= PRUNE_INTERVAL;
        if should_prune {
            *since_prune = 0;
        }
        drop(since_prune);

        if should_prune {
            self.prune().await;
        }
        self.schedule_save();
    }

    pub async fn record_error(self: &Arc<Self>, kind: impl Into<String>, message: impl Into<String>) {
        let mut message = message.into();
        message.truncate(500);
        let event = ErrorEvent {
            timestamp: now_unix(),
            kind: kind.into(),
            message,
        };
        self.data.lock().await.errors.push(event);
        self.schedule_save();
    }

    async fn prune(&self) {
        let now = now_unix();
        let cutoff = now - RETENTION_DAYS * 86_400;
        let mut data = self.data.lock().await;
        if data.games.len() <= MAX_DETAILED_RECORDS {
            return;
        }

        let (old_games, recent_games): (Vec<_>, Vec<_>) =
            data.games.drain(..).partition(|g| g.ended_at < cutoff);
        data.games = recent_games;
        if old_games.is_empty() {
            return;
        }

        let mut by_month: HashMap<String, Vec<GameRecord>> = HashMap::new();
        for game in old_games {
            let month = month_key(game.ended_at);
            by_month.entry(month).or_default().push(game);
        }

        let monthly_count = by_month.len();
        for (month, games) in by_month {
            let total_players: u64 = games.iter().map(|g| g.player_count as u64).sum();
            let total_rounds: u64 = games.iter().map(|g| g.rounds_played as u64).sum();
            let total_errors: u64 = games.iter().map(|g| g.error_count as u64).sum();
            let count = games.len() as u64;

            if let Some(existing) = data.monthly_summaries.iter_mut().find(|s| s.month == month) {
                existing.games_count += count;
                existing.total_players += total_players;
                existing.total_rounds += total_rounds;
                existing.total_errors += total_errors;
                existing.avg_players_per_game = existing.total_players as f64 / existing.games_count as f64;
                existing.avg_rounds_per_game = existing.total_rounds as f64 / existing.games_count as f64;
                existing.error_rate = existing.total_errors as f64 / existing.games_count as f64;
            } else {
                data.monthly_summaries.push(MonthlySummary {
                    month,
                    games_count: count,
                    total_players,
                    avg_players_per_game: total_players as f64 / count as f64,
                    total_rounds,
                    avg_rounds_per_game: total_rounds as f64 / count as f64,
                    error_rate: total_errors as f64 / count as f64,
                    total_errors,
                });
            }
        }
        data.errors.retain(|e| e.timestamp >= cutoff);
        info!(monthly_groups = monthly_count, "pruned old games into monthly summaries");
    }

    fn period_days(period: &str) -> i64 {
        match period {
            "7d" => 7,
            "90d" => 90,
            "all" => 3650,
            _ => 30,
        }
    }

    async fn games_between(&self, start: i64, end: i64) -> Vec<GameRecord> {
        self.data
            .lock()
            .await
            .games
            .iter()
            .filter(|g| g.ended_at >= start && g.ended_at <= end)
            .cloned()
            .collect()
    }

    /// Compute dashboard metrics for the requested window, with a
    /// trailing-period comparison for trend percentages.
    pub async fn compute_metrics(&self, period: &str) -> GameMetrics {
        let now = now_unix();
        let days = Self::period_days(period);
        let current_start = now - days * 86_400;
        let previous_start = current_start - days * 86_400;

        let current_games = self.games_between(current_start, now).await;
        let previous_games = self.games_between(previous_start, current_start - 1).await;
        let all_errors = self.data.lock().await.errors.clone();
        let current_errors: Vec<_> = all_errors
            .iter()
            .filter(|e| e.timestamp >= current_start)
            .cloned()
            .collect();

        let total_games = current_games.len();
        let total_players: usize = current_games.iter().map(|g| g.player_count).sum();
        let total_rounds: u64 = current_games.iter().map(|g| g.rounds_played as u64).sum();
        let total_score: f64 = current_games.iter().map(|g| g.average_score * g.player_count as f64).sum();

        let avg_players = ratio(total_players as f64, total_games as f64);
        let avg_score = ratio(total_score, total_players as f64);
        let error_rate = ratio(current_errors.len() as f64, total_rounds as f64);
        let avg_rounds = ratio(total_rounds as f64, total_games as f64);

        let prev_total_games = previous_games.len();
        let prev_total_players: usize = previous_games.iter().map(|g| g.player_count).sum();
        let prev_total_rounds: u64 = previous_games.iter().map(|g| g.rounds_played as u64).sum();
        let prev_total_score: f64 = previous_games.iter().map(|g| g.average_score * g.player_count as f64).sum();
        let prev_errors = all_errors
            .iter()
            .filter(|e| e.timestamp >= previous_start && e.timestamp < current_start)
            .count();

        let prev_avg_players = ratio(prev_total_players as f64, prev_total_games as f64);
        let prev_avg_score = ratio(prev_total_score, prev_total_players as f64);
        let prev_error_rate = ratio(prev_errors as f64, prev_total_rounds as f64);
        let prev_avg_rounds = ratio(prev_total_rounds as f64, prev_total_games as f64);

        let peak_players = current_games.iter().map(|g| g.player_count).max().unwrap_or(0);

        GameMetrics {
            period: period.to_string(),
            total_games,
            avg_players_per_game: avg_players,
            avg_score,
            error_rate,
            peak_players,
            avg_rounds,
            trends: Trends {
                games: trend(total_games as f64, prev_total_games as f64),
                players: trend(avg_players, prev_avg_players),
                score: trend(avg_score, prev_avg_score),
                errors: trend(error_rate, prev_error_rate),
                rounds: trend(avg_rounds, prev_avg_rounds),
            },
            playlists: compute_playlist_stats(&current_games),
            chart_data: compute_chart_data(&current_games, period),
            error_stats: compute_error_stats(&current_games, &current_errors),
            streak_3_count: current_games.iter().map(|g| g.streak_3_count).sum(),
            streak_5_count: current_games.iter().map(|g| g.streak_5_count).sum(),
            streak_7_count: current_games.iter().map(|g| g.streak_7_count).sum(),
            total_bets: current_games.iter().map(|g| g.total_bets).sum(),
            bets_won: current_games.iter().map(|g| g.bets_won).sum(),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 { numerator / denominator } else { 0.0 }
}

fn trend(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 { 1.0 } else { 0.0 }
    } else {
        (current - previous) / previous
    }
}

fn compute_playlist_stats(games: &[GameRecord]) -> Vec<PlaylistStat> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for game in games {
        for name in &game.playlist_names {
            *counts.entry(name.clone()).or_insert(0) += 1;
        }
    }
    let mut sorted: Vec<(String, u64)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(5);
    let total: u64 = sorted.iter().map(|(_, count)| count).sum();
    sorted
        .into_iter()
        .map(|(name, play_count)| PlaylistStat {
            name,
            play_count,
            percentage: if total > 0 { (play_count as f64 / total as f64 * 100.0 * 10.0).round() / 10.0 } else { 0.0 },
        })
        .collect()
}

fn compute_chart_data(games: &[GameRecord], period: &str) -> ChartData {
    match period {
        "7d" => {
            let mut buckets = [0u64; 7];
            let now = now_unix();
            for game in games {
                let days_ago = (now - game.ended_at) / 86_400;
                if (0..7).contains(&days_ago) {
                    buckets[days_ago as usize] += 1;
                }
            }
            buckets.reverse();
            ChartData {
                labels: (0..7).map(|i| format!("D-{}", 6 - i)).collect(),
                values: buckets.to_vec(),
                granularity: "day",
            }
        }
        "30d" | "90d" => {
            let weeks = if period == "30d" { 4 } else { 13 };
            let mut buckets = vec![0u64; weeks];
            let now = now_unix();
            for game in games {
                let weeks_ago = (now - game.ended_at) / (7 * 86_400);
                if (weeks_ago as usize) < weeks {
                    buckets[weeks_ago as usize] += 1;
                }
            }
            buckets.reverse();
            ChartData {
                labels: (1..=weeks).map(|i| format!("W{i}")).collect(),
                values: buckets,
                granularity: "week",
            }
        }
        _ => {
            let mut by_month: HashMap<String, u64> = HashMap::new();
            for game in games {
                *by_month.entry(month_key(game.ended_at)).or_insert(0) += 1;
            }
            let mut keys: Vec<String> = by_month.keys().cloned().collect();
            keys.sort();
            keys.truncate(12);
            ChartData {
                values: keys.iter().map(|k| by_month[k]).collect(),
                labels: keys,
                granularity: "month",
            }
        }
    }
}

fn compute_error_stats(games: &[GameRecord], errors: &[ErrorEvent]) -> ErrorStats {
    let total_events: u64 = games.iter().map(|g| g.rounds_played as u64).sum();
    let error_count = errors.len();
    let error_rate = ratio(error_count as f64, total_events as f64);
    let status = if error_rate < 0.01 {
        "healthy"
    } else if error_rate < 0.05 {
        "warning"
    } else {
        "critical"
    };
    let mut recent: Vec<ErrorEvent> = errors.to_vec();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(10);
    ErrorStats {
        error_rate,
        error_count,
        total_events,
        status,
        recent_errors: recent,
    }
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn month_key(unix_ts: i64) -> String {
    OffsetDateTime::from_unix_timestamp(unix_ts)
        .map(|dt| format!("{:04}-{:02}", dt.year(), u8::from(dt.month())))
        .unwrap_or_else(|_| "unknown".to_string())
}

async fn write_atomic(path: &Path, data: &AnalyticsData) -> std::io::Result<()> {
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

    fn record(game_id: &str, ended_at: i64, players: usize, rounds: u32) -> GameRecord {
        GameRecord {
            game_id: game_id.to_string(),
            started_at: ended_at - 100,
            ended_at,
            duration_seconds: 100,
            player_count: players,
            playlist_names: vec!["90s hits".to_string()],
            rounds_played: rounds,
            average_score: 10.0,
            difficulty: "normal".to_string(),
            error_count: 0,
            streak_3_count: 1,
            streak_5_count: 0,
            streak_7_count: 0,
            total_bets: 2,
            bets_won: 1,
        }
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.json");
        let store = AnalyticsStore::load(path.clone()).await;
        store.add_game(record("g1", now_unix(), 3, 5)).await;
        store.save().await;

        let reloaded = AnalyticsStore::load(path).await;
        let metrics = reloaded.compute_metrics("all").await;
        assert_eq!(metrics.total_games, 1);
    }

    #[tokio::test]
    async fn metrics_handle_zero_games_without_division_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnalyticsStore::load(dir.path().join("analytics.json")).await;
        let metrics = store.compute_metrics("30d").await;
        assert_eq!(metrics.total_games, 0);
        assert_eq!(metrics.avg_score, 0.0);
        assert_eq!(metrics.error_stats.status, "healthy");
    }

    #[test]
    fn playlist_stats_sort_by_count_then_name() {
        let games = vec![
            record("g1", 0, 1, 1),
            record("g2", 0, 1, 1),
        ];
        let stats = compute_playlist_stats(&games);
        assert_eq!(stats[0].name, "90s hits");
        assert_eq!(stats[0].play_count, 2);
    }
}
