//! End-of-game highlights reel: read-only tracking of notable moments,
//! ranked by a fixed priority table. Never feeds back into scoring.

use serde::Serialize;
use utoipa::ToSchema;

const TOP_N: usize = 8;

fn priority(kind: &str) -> i32 {
    match kind {
        "heartbreaker" | "photo_finish" => 5,
        "streak" | "comeback" => 4,
        "exact_match" | "bet_win" => 3,
        "speed_record" => 2,
        _ => 1,
    }
}

/// A single notable moment from the game.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameHighlight {
    pub kind: String,
    pub round: u32,
    pub player: String,
    pub description: String,
    pub score_impact: i32,
}

/// Collects highlights as the game progresses and ranks them on demand.
#[derive(Debug, Default)]
pub struct HighlightsTracker {
    highlights: Vec<GameHighlight>,
}

impl HighlightsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, highlight: GameHighlight) {
        self.highlights.push(highlight);
    }

    pub fn record_exact_match(&mut self, player: &str, song_title: &str, year: i32, round: u32) {
        self.record(GameHighlight {
            kind: "exact_match".into(),
            round,
            player: player.to_string(),
            description: format!("{player} nailed {song_title} ({year}) exactly"),
            score_impact: 10,
        });
    }

    pub fn record_streak(&mut self, player: &str, streak: u32, round: u32) {
        self.record(GameHighlight {
            kind: "streak".into(),
            round,
            player: player.to_string(),
            description: format!("{player} is on a {streak}-round streak"),
            score_impact: 0,
        });
    }

    pub fn record_bet_win(&mut self, player: &str, points_gained: i32, round: u32) {
        self.record(GameHighlight {
            kind: "bet_win".into(),
            round,
            player: player.to_string(),
            description: format!("{player} doubled down for {points_gained} points"),
            score_impact: points_gained,
        });
    }

    pub fn record_heartbreaker(&mut self, player: &str, song_title: &str, years_off: i32, round: u32) {
        self.record(GameHighlight {
            kind: "heartbreaker".into(),
            round,
            player: player.to_string(),
            description: format!("{player} missed {song_title} by just {years_off} year(s)"),
            score_impact: 0,
        });
    }

    pub fn record_speed_record(&mut self, player: &str, elapsed_secs: f64, round: u32) {
        self.record(GameHighlight {
            kind: "speed_record".into(),
            round,
            player: player.to_string(),
            description: format!("{player} answered in {elapsed_secs:.1}s"),
            score_impact: 0,
        });
    }

    pub fn record_comeback(&mut self, player: &str, positions_gained: u32, round: u32) {
        self.record(GameHighlight {
            kind: "comeback".into(),
            round,
            player: player.to_string(),
            description: format!("{player} climbed {positions_gained} spot(s)"),
            score_impact: 0,
        });
    }

    pub fn record_photo_finish(&mut self, players: &[String], round: u32) {
        self.record(GameHighlight {
            kind: "photo_finish".into(),
            round,
            player: players.first().cloned().unwrap_or_default(),
            description: format!("Tied scores: {}", players.join(", ")),
            score_impact: 0,
        });
    }

    /// Return the most interesting highlights, ranked by priority
    /// descending then round ascending (chronological tiebreak).
    pub fn top_highlights(&self) -> Vec<GameHighlight> {
        let mut sorted = self.highlights.clone();
        sorted.sort_by_key(|h| (-priority(&h.kind), h.round));
        sorted.truncate(TOP_N);
        sorted
    }

    pub fn reset(&mut self) {
        self.highlights.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_kinds_rank_first() {
        let mut tracker = HighlightsTracker::new();
        tracker.record_speed_record("Alice", 1.0, 1);
        tracker.record_heartbreaker("Bob", "Song", 1, 1);
        let top = tracker.top_highlights();
        assert_eq!(top[0].kind, "heartbreaker");
        assert_eq!(top[1].kind, "speed_record");
    }

    #[test]
    fn truncates_to_top_n() {
        let mut tracker = HighlightsTracker::new();
        for round in 0..20 {
            tracker.record_exact_match("Alice", "Song", 2000, round);
        }
        assert_eq!(tracker.top_highlights().len(), TOP_N);
    }

    #[test]
    fn reset_clears_all_recorded_highlights() {
        let mut tracker = HighlightsTracker::new();
        tracker.record_streak("Alice", 3, 1);
        tracker.reset();
        assert!(tracker.top_highlights().is_empty());
    }
}
