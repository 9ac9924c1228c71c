//! Non-repeating weighted random draw over the merged song pool (C3).

use std::collections::HashSet;

use rand::seq::IndexedRandom;

use super::Song;

/// Draws unplayed songs from a fixed pool, tracking exhaustion. The input
/// list is defensively copied; callers can't mutate it out from under the
/// manager.
#[derive(Debug, Clone)]
pub struct PlaylistManager {
    pool: Vec<Song>,
    played_uris: HashSet<String>,
}

impl PlaylistManager {
    /// Construct a manager over a defensive copy of `songs`.
    pub fn new(songs: Vec<Song>) -> Self {
        Self {
            pool: songs,
            played_uris: HashSet::new(),
        }
    }

    /// Draw one unplayed song uniformly at random, marking it played.
    /// Returns `None` once the pool is exhausted.
    pub fn next(&mut self) -> Option<Song> {
        let candidates: Vec<&Song> = self
            .pool
            .iter()
            .filter(|s| !self.played_uris.contains(&s.uri))
            .collect();

        let chosen = candidates.choose(&mut rand::rng())?.uri.clone();
        self.played_uris.insert(chosen.clone());
        self.pool.iter().find(|s| s.uri == chosen).cloned()
    }

    /// True once every song in the pool has been drawn.
    pub fn is_exhausted(&self) -> bool {
        self.played_uris.len() == self.pool.len()
    }

    /// Number of songs not yet drawn.
    pub fn get_remaining_count(&self) -> usize {
        self.pool.len() - self.played_uris.len()
    }

    /// Total pool size.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Clear the played set, making every song drawable again.
    pub fn reset(&mut self) {
        self.played_uris.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(uri: &str) -> Song {
        Song {
            year: 2000,
            uri: uri.to_string(),
            uri_apple_music: None,
            uri_youtube_music: None,
            title: "T".into(),
            artist: "A".into(),
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

    #[test]
    fn drains_pool_without_repeats() {
        let mut manager = PlaylistManager::new(vec![song("a"), song("b"), song("c")]);
        let mut drawn = HashSet::new();
        for _ in 0..3 {
            let song = manager.next().expect("pool not exhausted yet");
            assert!(drawn.insert(song.uri));
        }
        assert!(manager.is_exhausted());
        assert!(manager.next().is_none());
    }

    #[test]
    fn remaining_count_plus_played_equals_pool_size() {
        let mut manager = PlaylistManager::new(vec![song("a"), song("b")]);
        manager.next();
        assert_eq!(manager.get_remaining_count() + 1, manager.pool_size());
    }

    #[test]
    fn reset_clears_played_set() {
        let mut manager = PlaylistManager::new(vec![song("a")]);
        manager.next();
        assert!(manager.is_exhausted());
        manager.reset();
        assert!(!manager.is_exhausted());
    }

    #[test]
    fn input_list_is_not_mutated_by_construction() {
        let songs = vec![song("a"), song("b")];
        let original_len = songs.len();
        let manager = PlaylistManager::new(songs.clone());
        assert_eq!(songs.len(), original_len);
        assert_eq!(manager.pool_size(), original_len);
    }
}
