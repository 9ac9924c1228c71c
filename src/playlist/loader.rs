//! Discovery and loading of playlist JSON documents from a single
//! well-known directory. Invalid playlists are not fatal at discovery
//! time — they're surfaced with error detail so the admin listing can
//! show them, but only valid playlists are selectable for a game.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use super::{Playlist, PlaylistValidation, validate_playlist};

/// Summary of one playlist file found during discovery.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlaylistSummary {
    pub filename: String,
    pub name: String,
    pub song_count: usize,
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Scan `dir` for `*.json` playlist documents and summarize each one.
/// Missing directories are treated as "no playlists", not an error — the
/// admin dashboard renders an empty list either way.
pub async fn discover_playlists(dir: &Path) -> Vec<PlaylistSummary> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "playlist directory unreadable");
            return Vec::new();
        }
    };

    let mut summaries = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        summaries.push(summarize_file(&path, filename).await);
    }

    summaries.sort_by(|a, b| a.filename.cmp(&b.filename));
    summaries
}

async fn summarize_file(path: &Path, filename: String) -> PlaylistSummary {
    match load_and_validate(path).await {
        Ok((playlist, validation)) => PlaylistSummary {
            filename,
            name: playlist.name,
            song_count: playlist.songs.len(),
            is_valid: validation.is_valid,
            errors: all_errors(&validation),
        },
        Err(message) => PlaylistSummary {
            filename,
            name: String::new(),
            song_count: 0,
            is_valid: false,
            errors: vec![message],
        },
    }
}

fn all_errors(validation: &PlaylistValidation) -> Vec<String> {
    let mut errors = validation.errors.clone();
    errors.extend(
        validation
            .song_errors
            .iter()
            .map(|e| format!("song {}: {}", e.index, e.reason)),
    );
    errors
}

/// Load and validate a single playlist document. Returns a descriptive
/// error string (not fatal to the caller) on I/O or parse failure.
pub async fn load_and_validate(path: &Path) -> Result<(Playlist, PlaylistValidation), String> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    let playlist: Playlist =
        serde_json::from_str(&contents).map_err(|err| format!("invalid JSON: {err}"))?;
    let validation = validate_playlist(&playlist);
    Ok((playlist, validation))
}

/// Load every valid playlist named in `selected` (filenames relative to
/// `dir`), deduplicating songs across them by URI.
pub async fn load_selected_pool(dir: &Path, selected: &[String]) -> Result<Vec<super::Song>, String> {
    let mut seen_uris = std::collections::HashSet::new();
    let mut pool = Vec::new();

    for filename in selected {
        let path: PathBuf = dir.join(filename);
        let (playlist, validation) = load_and_validate(&path).await?;
        if !validation.is_valid {
            return Err(format!("playlist {filename} failed validation"));
        }
        for song in playlist.songs {
            if seen_uris.insert(song.uri.clone()) {
                pool.push(song);
            }
        }
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn discover_empty_directory_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let summaries = discover_playlists(dir.path()).await;
        assert!(summaries.is_empty());
    }

    #[tokio::test]
    async fn discover_marks_invalid_json_as_invalid_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("broken.json")).unwrap();
        write!(file, "not json").unwrap();

        let summaries = discover_playlists(dir.path()).await;
        assert_eq!(summaries.len(), 1);
        assert!(!summaries[0].is_valid);
    }

    #[tokio::test]
    async fn discover_finds_valid_playlist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("hits.json"),
            r#"{"name":"Hits","songs":[{"year":1999,"uri":"spotify:1","title":"A","artist":"B"}]}"#,
        )
        .unwrap();

        let summaries = discover_playlists(dir.path()).await;
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].is_valid);
        assert_eq!(summaries[0].song_count, 1);
    }

    #[tokio::test]
    async fn load_selected_pool_dedupes_by_uri() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"name":"A","songs":[{"year":1999,"uri":"shared","title":"T1","artist":"X"}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"name":"B","songs":[{"year":2000,"uri":"shared","title":"T2","artist":"Y"},{"year":2001,"uri":"unique","title":"T3","artist":"Z"}]}"#,
        )
        .unwrap();

        let pool = load_selected_pool(dir.path(), &["a.json".into(), "b.json".into()])
            .await
            .unwrap();
        assert_eq!(pool.len(), 2);
    }
}
