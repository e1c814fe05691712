//! sqlshelf server library - HTTP binding for per-user SQLite databases.
//!
//! Routes, reply formatting and application state live here, separate from
//! main.rs, so integration tests can drive the router directly.

pub mod config;
pub mod logging;
pub mod replies;
pub mod routes;
pub mod state;
