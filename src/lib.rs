//! Kanban project tracker.
//!
//! The [`server`] module serves projects and tasks over a JSON HTTP API backed
//! by SQLite. The [`board`] module is the client side: an in-memory board
//! that applies moves, creates, edits and deletes optimistically and keeps
//! itself converged with the server through versioned full-snapshot
//! re-fetches.

pub mod board;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod server;
