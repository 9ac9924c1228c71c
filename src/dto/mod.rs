//! Data-transfer structures for the `/api/*` HTTP surface.

/// Health check data structures.
pub mod health;
/// Status, game-lookup, and admin start/end request/response structures.
pub mod http;
