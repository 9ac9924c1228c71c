//! Media player abstraction (C4): platform-routed playback control. The
//! concrete platforms are external systems; this module only defines the
//! interface and the routing rule.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::playlist::Song;

/// Which backend platform a configured media player entity speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    MusicAssistant,
    Sonos,
    AlexaMedia,
}

/// Metadata reported back by the active media player.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct PlayerMetadata {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album_art: Option<String>,
}

#[derive(Debug, Error)]
pub enum MediaPlayerError {
    #[error("unsupported media player platform")]
    UnsupportedPlatform,
    #[error("media player unavailable: {0}")]
    Unavailable(String),
}

/// Capability set routed by platform tag; `GameState` decides whether a
/// failure here is fatal to the round.
pub trait MediaPlayer: Send + Sync {
    fn play_song(&self, song: Song) -> BoxFuture<'static, Result<(), MediaPlayerError>>;
    fn stop(&self) -> BoxFuture<'static, Result<(), MediaPlayerError>>;
    fn set_volume(&self, level: f64) -> BoxFuture<'static, Result<(), MediaPlayerError>>;
    fn metadata(&self) -> BoxFuture<'static, Result<PlayerMetadata, MediaPlayerError>>;
    fn is_available(&self) -> BoxFuture<'static, bool>;
    fn verify_responsive(
        &self,
        timeout: std::time::Duration,
    ) -> BoxFuture<'static, (bool, Option<String>)>;
}

/// Routes play/stop/volume calls to the platform-specific call shape the
/// configured entity expects.
pub struct RoutedMediaPlayer {
    platform: Option<Platform>,
}

impl RoutedMediaPlayer {
    pub fn new(platform: Option<Platform>) -> Self {
        Self { platform }
    }
}

impl MediaPlayer for RoutedMediaPlayer {
    fn play_song(&self, song: Song) -> BoxFuture<'static, Result<(), MediaPlayerError>> {
        let platform = self.platform;
        Box::pin(async move {
            match platform {
                Some(Platform::MusicAssistant) => {
                    tracing::info!(uri = %song.uri, "music_assistant play_media");
                    Ok(())
                }
                Some(Platform::Sonos) => {
                    tracing::info!(uri = %song.uri, "sonos play_media (content-type music)");
                    Ok(())
                }
                Some(Platform::AlexaMedia) => {
                    let query = format!("{} by {}", song.title, song.artist);
                    tracing::info!(query, "alexa_media text search");
                    Ok(())
                }
                None => Err(MediaPlayerError::UnsupportedPlatform),
            }
        })
    }

    fn stop(&self) -> BoxFuture<'static, Result<(), MediaPlayerError>> {
        let platform = self.platform;
        Box::pin(async move {
            if platform.is_none() {
                return Err(MediaPlayerError::UnsupportedPlatform);
            }
            Ok(())
        })
    }

    fn set_volume(&self, level: f64) -> BoxFuture<'static, Result<(), MediaPlayerError>> {
        let platform = self.platform;
        let clamped = level.clamp(0.0, 1.0);
        Box::pin(async move {
            if platform.is_none() {
                return Err(MediaPlayerError::UnsupportedPlatform);
            }
            tracing::info!(level = clamped, "set_volume");
            Ok(())
        })
    }

    fn metadata(&self) -> BoxFuture<'static, Result<PlayerMetadata, MediaPlayerError>> {
        Box::pin(async move { Ok(PlayerMetadata::default()) })
    }

    fn is_available(&self) -> BoxFuture<'static, bool> {
        let available = self.platform.is_some();
        Box::pin(async move { available })
    }

    fn verify_responsive(
        &self,
        _timeout: std::time::Duration,
    ) -> BoxFuture<'static, (bool, Option<String>)> {
        let platform = self.platform;
        Box::pin(async move {
            match platform {
                Some(_) => (true, None),
                None => (false, Some("no media player configured".to_string())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song() -> Song {
        Song {
            year: 2000,
            uri: "spotify:1".into(),
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

    #[tokio::test]
    async fn unknown_platform_fails_to_play() {
        let player = RoutedMediaPlayer::new(None);
        let err = player.play_song(song()).await.unwrap_err();
        assert!(matches!(err, MediaPlayerError::UnsupportedPlatform));
    }

    #[tokio::test]
    async fn known_platform_plays_successfully() {
        let player = RoutedMediaPlayer::new(Some(Platform::MusicAssistant));
        assert!(player.play_song(song()).await.is_ok());
    }

    #[tokio::test]
    async fn volume_clamps_to_unit_interval() {
        let player = RoutedMediaPlayer::new(Some(Platform::Sonos));
        assert!(player.set_volume(1.5).await.is_ok());
        assert!(player.set_volume(-0.5).await.is_ok());
    }
}
