//! Optional per-round side challenges: artist, movie, and intro-speed
//! rounds. Each has a correct answer, decoys, a per-player guess map, and
//! a winner-selection rule.

use indexmap::IndexMap;

/// First-correct-submitter-wins artist guessing challenge.
#[derive(Debug, Clone)]
pub struct ArtistChallenge {
    pub correct_artist: String,
    pub decoys: Vec<String>,
    pub guesses: IndexMap<String, String>,
    pub winner: Option<String>,
}

impl ArtistChallenge {
    pub fn new(correct_artist: String, decoys: Vec<String>) -> Self {
        Self {
            correct_artist,
            decoys,
            guesses: IndexMap::new(),
            winner: None,
        }
    }

    /// Record a guess. Returns `true` if this guess made `player` the
    /// winner (first correct answer locks it in).
    pub fn submit_guess(&mut self, player: &str, guess: &str) -> bool {
        self.guesses.insert(player.to_string(), guess.to_string());
        if self.winner.is_none() && guess.eq_ignore_ascii_case(&self.correct_artist) {
            self.winner = Some(player.to_string());
            return true;
        }
        false
    }

    pub fn has_guessed(&self, player: &str) -> bool {
        self.guesses.contains_key(player)
    }
}

/// First-correct-submitter-wins movie guessing challenge.
#[derive(Debug, Clone)]
pub struct MovieChallenge {
    pub correct_movie: String,
    pub choices: Vec<String>,
    pub guesses: IndexMap<String, String>,
    pub winner: Option<String>,
    pub bonus_points: i32,
}

impl MovieChallenge {
    pub fn new(correct_movie: String, choices: Vec<String>, bonus_points: i32) -> Self {
        Self {
            correct_movie,
            choices,
            guesses: IndexMap::new(),
            winner: None,
            bonus_points,
        }
    }

    pub fn submit_guess(&mut self, player: &str, guess: &str) -> bool {
        self.guesses.insert(player.to_string(), guess.to_string());
        if self.winner.is_none() && guess.eq_ignore_ascii_case(&self.correct_movie) {
            self.winner = Some(player.to_string());
            return true;
        }
        false
    }

    /// Bonus awarded to `player` — positive only for the locked-in winner.
    pub fn player_bonus(&self, player: &str) -> i32 {
        match &self.winner {
            Some(winner) if winner == player => self.bonus_points,
            _ => 0,
        }
    }
}

/// Time-tiered bonus for submitting within the intro window of a round.
#[derive(Debug, Clone)]
pub struct IntroRound {
    pub round_start_ms: i64,
    pub window_ms: i64,
    submission_order: Vec<String>,
}

impl IntroRound {
    pub fn new(round_start_ms: i64, window_secs: u64) -> Self {
        Self {
            round_start_ms,
            window_ms: window_secs as i64 * 1000,
            submission_order: Vec::new(),
        }
    }

    /// Record a submission if it landed within the intro window, returning
    /// the 0-indexed rank among in-window submitters (for tier lookup).
    pub fn record_submission(&mut self, player: &str, now_ms: i64) -> Option<usize> {
        if now_ms > self.round_start_ms + self.window_ms {
            return None;
        }
        if self.submission_order.iter().any(|p| p == player) {
            return None;
        }
        self.submission_order.push(player.to_string());
        Some(self.submission_order.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artist_challenge_first_correct_wins() {
        let mut challenge = ArtistChallenge::new("Queen".into(), vec!["ABBA".into()]);
        assert!(!challenge.submit_guess("Bob", "ABBA"));
        assert!(challenge.submit_guess("Alice", "queen"));
        assert!(!challenge.submit_guess("Cara", "Queen"));
        assert_eq!(challenge.winner, Some("Alice".to_string()));
    }

    #[test]
    fn movie_bonus_only_paid_to_winner() {
        let mut challenge = MovieChallenge::new("Jaws".into(), vec!["Jaws".into()], 15);
        challenge.submit_guess("Alice", "Jaws");
        assert_eq!(challenge.player_bonus("Alice"), 15);
        assert_eq!(challenge.player_bonus("Bob"), 0);
    }

    #[test]
    fn intro_round_ranks_in_window_submissions() {
        let mut intro = IntroRound::new(0, 5);
        assert_eq!(intro.record_submission("Alice", 1000), Some(0));
        assert_eq!(intro.record_submission("Bob", 4000), Some(1));
        assert_eq!(intro.record_submission("Cara", 6000), None);
    }

    #[test]
    fn intro_round_ignores_duplicate_submission() {
        let mut intro = IntroRound::new(0, 5);
        intro.record_submission("Alice", 100);
        assert_eq!(intro.record_submission("Alice", 200), None);
    }
}
