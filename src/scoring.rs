//! Pure scoring functions. No I/O, no shared state — every function takes
//! its inputs explicitly and is deterministic, so it can be exercised
//! directly by tests without spinning up a game.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Difficulty level selected for a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

struct AccuracyTiers {
    close_range: i32,
    close_points: i32,
    near_range: i32,
    near_points: i32,
}

const EXACT_POINTS: i32 = 10;

fn tiers_for(difficulty: Difficulty) -> AccuracyTiers {
    match difficulty {
        Difficulty::Easy => AccuracyTiers {
            close_range: 7,
            close_points: 5,
            near_range: 10,
            near_points: 1,
        },
        Difficulty::Normal => AccuracyTiers {
            close_range: 3,
            close_points: 5,
            near_range: 5,
            near_points: 1,
        },
        Difficulty::Hard => AccuracyTiers {
            close_range: 2,
            close_points: 3,
            near_range: 0,
            near_points: 0,
        },
    }
}

/// Accuracy points for a single guess against the actual year.
pub fn calculate_accuracy_score(guess: i32, actual: i32, difficulty: Difficulty) -> i32 {
    let diff = (guess - actual).abs();
    let tiers = tiers_for(difficulty);

    if diff == 0 {
        EXACT_POINTS
    } else if tiers.close_range > 0 && diff <= tiers.close_range {
        tiers.close_points
    } else if tiers.near_range > 0 && diff <= tiers.near_range {
        tiers.near_points
    } else {
        0
    }
}

/// Linear speed multiplier: 2.0 at submission time zero, 1.0 at the
/// deadline, clamped to [1.0, 2.0].
pub fn calculate_speed_multiplier(elapsed: f64, round_duration: f64) -> f64 {
    if round_duration <= 0.0 {
        return 1.0;
    }
    let ratio = (elapsed / round_duration).clamp(0.0, 1.0);
    2.0 - ratio
}

/// Truncating accuracy × speed score. The cast, not a round, is load-bearing:
/// see the open question in DESIGN.md.
pub fn calculate_round_score(
    guess: i32,
    actual: i32,
    elapsed: f64,
    round_duration: f64,
    difficulty: Difficulty,
) -> (i32, i32, f64) {
    let base_score = calculate_accuracy_score(guess, actual, difficulty);
    let speed_multiplier = calculate_speed_multiplier(elapsed, round_duration);
    let final_score = (base_score as f64 * speed_multiplier) as i32;
    (final_score, base_score, speed_multiplier)
}

/// Outcome of a double-or-nothing bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BetOutcome {
    Won,
    Lost,
    None,
}

/// Apply the double-or-nothing bet modifier to a round score.
pub fn apply_bet_multiplier(round_score: i32, bet_placed: bool) -> (i32, BetOutcome) {
    if !bet_placed {
        return (round_score, BetOutcome::None);
    }
    if round_score > 0 {
        (round_score * 2, BetOutcome::Won)
    } else {
        (0, BetOutcome::Lost)
    }
}

/// Bonus awarded for reaching an exact streak milestone, on top of the
/// round score.
pub fn calculate_streak_bonus(streak: u32) -> i32 {
    match streak {
        3 => 20,
        5 => 50,
        10 => 100,
        _ => 0,
    }
}

/// Submission-rank bonus for an intro round, tiered by how early the
/// player submitted.
pub const INTRO_BONUS_TIERS: [i32; 3] = [30, 20, 10];

/// Bonus for the `rank`-th (0-indexed) player to submit within the intro
/// window, or `0` once the tiers are exhausted.
pub fn intro_rank_bonus(rank: usize) -> i32 {
    INTRO_BONUS_TIERS.get(rank).copied().unwrap_or(0)
}

/// Per-round outcome for a single player, consumed by `GameState` to update
/// cumulative aggregates.
#[derive(Debug, Clone, Default)]
pub struct RoundOutcome {
    pub base_score: i32,
    pub speed_multiplier: f64,
    pub round_score: i32,
    pub years_off: Option<i32>,
    pub bet_outcome: BetOutcome,
    pub streak_bonus: i32,
    pub artist_bonus: i32,
    pub movie_bonus: i32,
    pub intro_bonus: i32,
    pub missed_round: bool,
    pub new_streak: u32,
    pub previous_streak: u32,
}

impl RoundOutcome {
    /// Total points added to the player's cumulative score this round.
    pub fn total_gain(&self) -> i32 {
        self.round_score + self.streak_bonus + self.artist_bonus + self.movie_bonus + self.intro_bonus
    }
}

/// Score a single submitted guess. `previous_streak` is the streak going
/// into this round; the caller is responsible for persisting the returned
/// `new_streak` back onto the player.
#[allow(clippy::too_many_arguments)]
pub fn score_submitted_round(
    guess: i32,
    actual: i32,
    elapsed: f64,
    round_duration: f64,
    difficulty: Difficulty,
    bet_placed: bool,
    previous_streak: u32,
    artist_bonus: i32,
    movie_bonus: i32,
    intro_bonus: i32,
) -> RoundOutcome {
    let (speed_score, base_score, speed_multiplier) =
        calculate_round_score(guess, actual, elapsed, round_duration, difficulty);
    let (round_score, bet_outcome) = apply_bet_multiplier(speed_score, bet_placed);

    // Streak continuation is decided on the pre-bet speed score, matching
    // the observed behavior of the system this was distilled from.
    let new_streak = if speed_score > 0 { previous_streak + 1 } else { 0 };
    let streak_bonus = calculate_streak_bonus(new_streak);

    RoundOutcome {
        base_score,
        speed_multiplier,
        round_score,
        years_off: Some((guess - actual).abs()),
        bet_outcome,
        streak_bonus,
        artist_bonus,
        movie_bonus,
        intro_bonus,
        missed_round: false,
        new_streak,
        previous_streak,
    }
}

/// Score a player who never submitted. Artist/movie bonuses still apply if
/// the relevant challenge's winner was determined independent of timing.
pub fn score_missed_round(previous_streak: u32, artist_bonus: i32, movie_bonus: i32) -> RoundOutcome {
    RoundOutcome {
        base_score: 0,
        speed_multiplier: 0.0,
        round_score: 0,
        years_off: None,
        bet_outcome: BetOutcome::None,
        streak_bonus: 0,
        artist_bonus,
        movie_bonus,
        intro_bonus: 0,
        missed_round: true,
        new_streak: 0,
        previous_streak,
    }
}

/// Per-round submission used to build `RoundAnalytics`.
#[derive(Debug, Clone)]
pub struct PlayerGuessSample {
    pub name: String,
    pub guess: i32,
    pub years_off: i32,
    pub submission_elapsed: f64,
}

/// Aggregate analytics for a single revealed round, computed from the set
/// of connected players' submissions.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundAnalytics {
    pub scored_count: usize,
    pub average_years_off: f64,
    pub median_years_off: f64,
    pub closest_players: Vec<String>,
    pub furthest_players: Vec<String>,
    pub exact_match_players: Vec<String>,
    pub accuracy_percentage: f64,
    pub speed_champion: Option<String>,
    pub decade_distribution: Vec<(i32, u32)>,
    pub correct_decade: i32,
}

/// Compute round analytics from the connected players' samples and the
/// actual year.
pub fn compute_round_analytics(samples: &[PlayerGuessSample], actual_year: i32) -> RoundAnalytics {
    let scored_count = samples.len();
    if scored_count == 0 {
        return RoundAnalytics {
            scored_count: 0,
            average_years_off: 0.0,
            median_years_off: 0.0,
            closest_players: Vec::new(),
            furthest_players: Vec::new(),
            exact_match_players: Vec::new(),
            accuracy_percentage: 0.0,
            speed_champion: None,
            decade_distribution: Vec::new(),
            correct_decade: decade_of(actual_year),
        };
    }

    let mut sorted: Vec<&PlayerGuessSample> = samples.iter().collect();
    sorted.sort_by_key(|s| s.years_off);

    let total_off: i32 = sorted.iter().map(|s| s.years_off).sum();
    let average_years_off = total_off as f64 / scored_count as f64;
    let median_years_off = median_of(&sorted.iter().map(|s| s.years_off).collect::<Vec<_>>());

    let min_off = sorted.first().map(|s| s.years_off).unwrap_or(0);
    let max_off = sorted.last().map(|s| s.years_off).unwrap_or(0);

    let closest_players = sorted
        .iter()
        .filter(|s| s.years_off == min_off)
        .map(|s| s.name.clone())
        .collect();
    let furthest_players = sorted
        .iter()
        .filter(|s| s.years_off == max_off)
        .map(|s| s.name.clone())
        .collect();
    let exact_match_players = sorted
        .iter()
        .filter(|s| s.years_off == 0)
        .map(|s| s.name.clone())
        .collect::<Vec<_>>();

    let accuracy_percentage = exact_match_players.len() as f64 / scored_count as f64 * 100.0;

    let speed_champion = samples
        .iter()
        .min_by(|a, b| a.submission_elapsed.total_cmp(&b.submission_elapsed))
        .map(|s| s.name.clone());

    let mut decade_counts: Vec<(i32, u32)> = Vec::new();
    for sample in samples {
        let decade = decade_of(sample.guess);
        match decade_counts.iter_mut().find(|(d, _)| *d == decade) {
            Some((_, count)) => *count += 1,
            None => decade_counts.push((decade, 1)),
        }
    }
    decade_counts.sort_by_key(|(decade, _)| *decade);

    RoundAnalytics {
        scored_count,
        average_years_off,
        median_years_off,
        closest_players,
        furthest_players,
        exact_match_players,
        accuracy_percentage,
        speed_champion,
        decade_distribution: decade_counts,
        correct_decade: decade_of(actual_year),
    }
}

fn decade_of(year: i32) -> i32 {
    (year / 10) * 10
}

fn median_of(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

/// A single end-of-game superlative award.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Superlative {
    pub kind: &'static str,
    pub player: String,
    pub detail: String,
}

/// Per-player cumulative inputs used to compute end-of-game superlatives.
#[derive(Debug, Clone, Default)]
pub struct PlayerSuperlativeInputs {
    pub name: String,
    pub best_streak: u32,
    pub bets_placed: u32,
    pub bets_won: u32,
    pub rounds_played: u32,
    pub round_scores: Vec<i32>,
    pub close_calls: u32,
    pub movie_bonus_total: i32,
    pub intro_speed_bonuses: u32,
    pub submission_times: Vec<f64>,
}

const MIN_STREAK_FOR_AWARD: u32 = 3;
const MIN_BETS_FOR_AWARD: u32 = 3;
const MIN_ROUNDS_FOR_CLUTCH: usize = 3;
const MIN_CLOSE_CALLS: u32 = 2;
const MIN_MOVIE_WINS_FOR_AWARD: i32 = 2;
const MIN_INTRO_BONUSES_FOR_AWARD: u32 = 2;
const MIN_ROUNDS_FOR_SPEED_DEMON: usize = 3;
const MIN_ROUNDS_FOR_COMEBACK: usize = 4;
const MAX_SUPERLATIVES: usize = 5;

fn average(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sum of the second half of `round_scores` minus the sum of the first
/// half. Positive means the player finished stronger than they started.
fn second_half_improvement(round_scores: &[i32]) -> i32 {
    let mid = round_scores.len() / 2;
    let first_half: i32 = round_scores[..mid].iter().sum();
    let second_half: i32 = round_scores[mid..].iter().sum();
    second_half - first_half
}

/// Compute the top-N end-of-game superlatives from cumulative per-player
/// tallies. Awards that have no qualifying candidate are simply absent.
pub fn calculate_superlatives(players: &[PlayerSuperlativeInputs]) -> Vec<Superlative> {
    let mut awards = Vec::new();

    if let Some(p) = players
        .iter()
        .filter(|p| p.best_streak >= MIN_STREAK_FOR_AWARD)
        .max_by_key(|p| p.best_streak)
    {
        awards.push(Superlative {
            kind: "lucky_streak",
            player: p.name.clone(),
            detail: format!("{}-round streak", p.best_streak),
        });
    }

    if let Some(p) = players
        .iter()
        .filter(|p| p.bets_placed >= MIN_BETS_FOR_AWARD)
        .max_by_key(|p| p.bets_won)
    {
        awards.push(Superlative {
            kind: "risk_taker",
            player: p.name.clone(),
            detail: format!("{}/{} bets won", p.bets_won, p.bets_placed),
        });
    }

    if let Some(p) = players
        .iter()
        .filter(|p| p.rounds_played >= MIN_ROUNDS_FOR_CLUTCH as u32 && p.round_scores.len() >= MIN_ROUNDS_FOR_CLUTCH)
        .max_by_key(|p| p.round_scores.iter().rev().take(MIN_ROUNDS_FOR_CLUTCH).sum::<i32>())
    {
        awards.push(Superlative {
            kind: "clutch_player",
            player: p.name.clone(),
            detail: "strong finish".to_string(),
        });
    }

    if let Some(p) = players
        .iter()
        .filter(|p| p.close_calls >= MIN_CLOSE_CALLS)
        .max_by_key(|p| p.close_calls)
    {
        awards.push(Superlative {
            kind: "close_calls",
            player: p.name.clone(),
            detail: format!("{} near misses", p.close_calls),
        });
    }

    if let Some(p) = players
        .iter()
        .filter(|p| p.movie_bonus_total >= MIN_MOVIE_WINS_FOR_AWARD)
        .max_by_key(|p| p.movie_bonus_total)
    {
        awards.push(Superlative {
            kind: "film_buff",
            player: p.name.clone(),
            detail: format!("{} movie bonus points", p.movie_bonus_total),
        });
    }

    if let Some(p) = players
        .iter()
        .filter(|p| p.intro_speed_bonuses >= MIN_INTRO_BONUSES_FOR_AWARD)
        .max_by_key(|p| p.intro_speed_bonuses)
    {
        awards.push(Superlative {
            kind: "intro_master",
            player: p.name.clone(),
            detail: format!("{} intro bonuses", p.intro_speed_bonuses),
        });
    }

    if let Some(p) = players
        .iter()
        .filter(|p| p.submission_times.len() >= MIN_ROUNDS_FOR_SPEED_DEMON)
        .min_by(|a, b| average(&a.submission_times).total_cmp(&average(&b.submission_times)))
    {
        awards.push(Superlative {
            kind: "speed_demon",
            player: p.name.clone(),
            detail: format!("{:.1}s average answer time", average(&p.submission_times)),
        });
    }

    if let Some(p) = players
        .iter()
        .filter(|p| p.round_scores.len() >= MIN_ROUNDS_FOR_COMEBACK)
        .max_by_key(|p| second_half_improvement(&p.round_scores))
        .filter(|p| second_half_improvement(&p.round_scores) > 0)
    {
        awards.push(Superlative {
            kind: "comeback_king",
            player: p.name.clone(),
            detail: format!("+{} points in the back half", second_half_improvement(&p.round_scores)),
        });
    }

    awards.truncate(MAX_SUPERLATIVES);
    awards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_exact_is_ten_for_all_difficulties_and_years() {
        for difficulty in [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard] {
            assert_eq!(calculate_accuracy_score(1985, 1985, difficulty), 10);
            assert_eq!(calculate_accuracy_score(2020, 2020, difficulty), 10);
        }
    }

    #[test]
    fn accuracy_tiers_match_spec_table() {
        assert_eq!(calculate_accuracy_score(1978, 1985, Difficulty::Easy), 5); // 7 off
        assert_eq!(calculate_accuracy_score(1975, 1985, Difficulty::Easy), 1); // 10 off
        assert_eq!(calculate_accuracy_score(1974, 1985, Difficulty::Easy), 0); // 11 off
        assert_eq!(calculate_accuracy_score(1982, 1985, Difficulty::Normal), 5); // 3 off
        assert_eq!(calculate_accuracy_score(1980, 1985, Difficulty::Normal), 1); // 5 off
        assert_eq!(calculate_accuracy_score(1983, 1985, Difficulty::Hard), 3); // 2 off
        assert_eq!(calculate_accuracy_score(1980, 1985, Difficulty::Hard), 0); // 5 off
    }

    #[test]
    fn speed_multiplier_bounds_and_monotonicity() {
        assert_eq!(calculate_speed_multiplier(0.0, 30.0), 2.0);
        assert_eq!(calculate_speed_multiplier(30.0, 30.0), 1.0);
        assert!(calculate_speed_multiplier(10.0, 30.0) > calculate_speed_multiplier(20.0, 30.0));
        // out-of-range elapsed clamps rather than extrapolating
        assert_eq!(calculate_speed_multiplier(-5.0, 30.0), 2.0);
        assert_eq!(calculate_speed_multiplier(60.0, 30.0), 1.0);
    }

    #[test]
    fn bet_multiplier_matches_spec_laws() {
        assert_eq!(apply_bet_multiplier(19, false), (19, BetOutcome::None));
        assert_eq!(apply_bet_multiplier(20, true), (40, BetOutcome::Won));
        assert_eq!(apply_bet_multiplier(0, true), (0, BetOutcome::Lost));
    }

    #[test]
    fn streak_bonus_milestones() {
        assert_eq!(calculate_streak_bonus(1), 0);
        assert_eq!(calculate_streak_bonus(3), 20);
        assert_eq!(calculate_streak_bonus(5), 50);
        assert_eq!(calculate_streak_bonus(10), 100);
    }

    // Scenario 1: exact guess, t=1000ms into a 30s round.
    #[test]
    fn scenario_exact_guess() {
        let outcome = score_submitted_round(1985, 1985, 1.0, 30.0, Difficulty::Normal, false, 0, 0, 0, 0);
        assert_eq!(outcome.base_score, 10);
        assert!((outcome.speed_multiplier - 1.9667).abs() < 1e-3);
        assert_eq!(outcome.round_score, 19);
        assert_eq!(outcome.new_streak, 1);
    }

    // Scenario 2: bet won at t=0.
    #[test]
    fn scenario_bet_won() {
        let outcome = score_submitted_round(1985, 1985, 0.0, 30.0, Difficulty::Normal, true, 0, 0, 0, 0);
        assert_eq!(outcome.base_score, 10);
        assert_eq!(outcome.speed_multiplier, 2.0);
        assert_eq!(outcome.round_score, 40);
        assert_eq!(outcome.bet_outcome, BetOutcome::Won);
        assert_eq!(outcome.new_streak, 1);
    }

    // Scenario 3: bet lost at t=0, far-off guess.
    #[test]
    fn scenario_bet_lost() {
        let outcome = score_submitted_round(1900, 1985, 0.0, 30.0, Difficulty::Normal, true, 2, 0, 0, 0);
        assert_eq!(outcome.round_score, 0);
        assert_eq!(outcome.bet_outcome, BetOutcome::Lost);
        assert_eq!(outcome.new_streak, 0);
    }

    // Scenario 5: missed round never changes cumulative score by itself.
    #[test]
    fn scenario_missed_round() {
        let outcome = score_missed_round(4, 0, 0);
        assert_eq!(outcome.round_score, 0);
        assert!(outcome.missed_round);
        assert_eq!(outcome.new_streak, 0);
        assert_eq!(outcome.total_gain(), 0);
    }

    #[test]
    fn round_analytics_reports_closest_and_exact_matches() {
        let samples = vec![
            PlayerGuessSample { name: "Alice".into(), guess: 1985, years_off: 0, submission_elapsed: 1.0 },
            PlayerGuessSample { name: "Bob".into(), guess: 1990, years_off: 5, submission_elapsed: 2.0 },
            PlayerGuessSample { name: "Cara".into(), guess: 1970, years_off: 15, submission_elapsed: 0.5 },
        ];
        let analytics = compute_round_analytics(&samples, 1985);
        assert_eq!(analytics.scored_count, 3);
        assert_eq!(analytics.closest_players, vec!["Alice".to_string()]);
        assert_eq!(analytics.furthest_players, vec!["Cara".to_string()]);
        assert_eq!(analytics.exact_match_players, vec!["Alice".to_string()]);
        assert_eq!(analytics.speed_champion, Some("Cara".to_string()));
        assert_eq!(analytics.correct_decade, 1980);
    }

    #[test]
    fn superlatives_empty_when_no_candidate_qualifies() {
        let players = vec![PlayerSuperlativeInputs {
            name: "Alice".into(),
            best_streak: 1,
            ..Default::default()
        }];
        assert!(calculate_superlatives(&players).is_empty());
    }

    #[test]
    fn speed_demon_goes_to_fastest_average_submitter() {
        let players = vec![
            PlayerSuperlativeInputs { name: "Alice".into(), submission_times: vec![1.0, 1.5, 2.0], ..Default::default() },
            PlayerSuperlativeInputs { name: "Bob".into(), submission_times: vec![5.0, 6.0, 7.0], ..Default::default() },
        ];
        let awards = calculate_superlatives(&players);
        let award = awards.iter().find(|a| a.kind == "speed_demon").unwrap();
        assert_eq!(award.player, "Alice");
    }

    #[test]
    fn comeback_king_requires_positive_back_half_swing() {
        let players = vec![PlayerSuperlativeInputs {
            name: "Cara".into(),
            round_scores: vec![0, 0, 20, 30],
            ..Default::default()
        }];
        let awards = calculate_superlatives(&players);
        assert!(awards.iter().any(|a| a.kind == "comeback_king"));

        let flat = vec![PlayerSuperlativeInputs {
            name: "Dee".into(),
            round_scores: vec![20, 20, 10, 10],
            ..Default::default()
        }];
        assert!(!calculate_superlatives(&flat).iter().any(|a| a.kind == "comeback_king"));
    }
}
