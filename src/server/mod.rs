//! Board API server: axum routes over a SQLite store.

pub mod api;
pub mod auth;
pub mod db;
pub mod server;

pub use server::{ServerConfig, build_router, serve, start_server};
