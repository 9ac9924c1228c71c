//! Playlist data model, on-disk loading/validation (C2), and the
//! non-repeating draw manager (C3).

pub mod loader;
pub mod manager;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const YEAR_MIN: i32 = 1900;
pub const YEAR_MAX: i32 = 2030;

/// A single song entry in a playlist document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Song {
    pub year: i32,
    pub uri: String,
    #[serde(default)]
    pub uri_apple_music: Option<String>,
    #[serde(default)]
    pub uri_youtube_music: Option<String>,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album_art: Option<String>,
    #[serde(default)]
    pub fun_fact: Option<String>,
    #[serde(default)]
    pub fun_fact_de: Option<String>,
    #[serde(default)]
    pub fun_fact_es: Option<String>,
    #[serde(default)]
    pub alt_artists: Vec<String>,
    #[serde(default)]
    pub movie: Option<String>,
    #[serde(default)]
    pub movie_choices: Vec<String>,
    #[serde(default)]
    pub chart_info: Option<serde_json::Value>,
    #[serde(default)]
    pub certifications: Option<serde_json::Value>,
    #[serde(default)]
    pub awards: Option<serde_json::Value>,
}

impl Song {
    /// Localized field lookup with fallback chain `<field>_<lang> →
    /// <field> → absent`.
    pub fn fun_fact_for(&self, lang: &str) -> Option<&str> {
        match lang {
            "de" => self.fun_fact_de.as_deref().or(self.fun_fact.as_deref()),
            "es" => self.fun_fact_es.as_deref().or(self.fun_fact.as_deref()),
            _ => self.fun_fact.as_deref(),
        }
    }
}

/// A named, ordered sequence of songs as loaded from a JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub songs: Vec<Song>,
}

/// One validation failure for a single song within a playlist document.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SongValidationError {
    pub index: usize,
    pub reason: String,
}

/// Result of validating a playlist document: still returned even when
/// invalid, so discovery can show it with error detail.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlaylistValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub song_errors: Vec<SongValidationError>,
}

/// Validate a playlist document in isolation, without touching disk.
pub fn validate_playlist(playlist: &Playlist) -> PlaylistValidation {
    let mut errors = Vec::new();
    let mut song_errors = Vec::new();

    if playlist.name.trim().is_empty() {
        errors.push("playlist name must not be empty".to_string());
    }
    if playlist.songs.is_empty() {
        errors.push("playlist must contain at least one song".to_string());
    }

    for (index, song) in playlist.songs.iter().enumerate() {
        if song.year < YEAR_MIN || song.year > YEAR_MAX {
            song_errors.push(SongValidationError {
                index,
                reason: format!("year {} outside [{YEAR_MIN}, {YEAR_MAX}]", song.year),
            });
        }
        if song.uri.trim().is_empty() {
            song_errors.push(SongValidationError {
                index,
                reason: "missing uri".to_string(),
            });
        }
    }

    PlaylistValidation {
        is_valid: errors.is_empty() && song_errors.is_empty(),
        errors,
        song_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(year: i32, uri: &str) -> Song {
        Song {
            year,
            uri: uri.to_string(),
            uri_apple_music: None,
            uri_youtube_music: None,
            title: "Title".into(),
            artist: "Artist".into(),
            album_art: None,
            fun_fact: Some("base fact".into()),
            fun_fact_de: Some("de fact".into()),
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
    fn valid_playlist_passes() {
        let playlist = Playlist {
            name: "90s hits".into(),
            songs: vec![song(1995, "spotify:track:1")],
        };
        let result = validate_playlist(&playlist);
        assert!(result.is_valid);
    }

    #[test]
    fn empty_name_and_songs_are_collected() {
        let playlist = Playlist {
            name: "  ".into(),
            songs: Vec::new(),
        };
        let result = validate_playlist(&playlist);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn year_out_of_range_and_missing_uri_are_song_errors() {
        let playlist = Playlist {
            name: "bad".into(),
            songs: vec![song(1850, ""), song(2031, "ok")],
        };
        let result = validate_playlist(&playlist);
        assert!(!result.is_valid);
        assert_eq!(result.song_errors.len(), 3);
    }

    #[test]
    fn localized_fun_fact_falls_back_to_base() {
        let s = song(2000, "uri");
        assert_eq!(s.fun_fact_for("de"), Some("de fact"));
        assert_eq!(s.fun_fact_for("es"), Some("base fact"));
        assert_eq!(s.fun_fact_for("en"), Some("base fact"));
    }
}
