//! Library crate for beatify-core, exposing modules for the binary and
//! integration tests.

/// Analytics store (C9): append-only game/error records and derived metrics.
pub mod analytics;
/// Injectable time source (C1).
pub mod clock;
/// Runtime configuration.
pub mod config;
/// Data-transfer structures for the HTTP surface.
pub mod dto;
/// Layered error types.
pub mod error;
/// Authoritative game state machine (C7) and round procedures.
pub mod game;
/// Round-outcome highlight tracking shown in REVEAL/END broadcasts.
pub mod highlights;
/// Media player abstraction (C4).
pub mod media_player;
/// Player sessions and the player registry (C6).
pub mod player;
/// Playlist data model, loading, and the non-repeating draw manager (C2/C3).
pub mod playlist;
/// HTTP routes module for API endpoints.
pub mod routes;
/// Pure scoring functions (C5).
pub mod scoring;
/// Persistent stats store (C10): all-time and per-song counters.
pub mod stats;
/// Application state management module (AppState, C8 host).
pub mod state;
/// The `/ws` real-time protocol.
pub mod ws;
