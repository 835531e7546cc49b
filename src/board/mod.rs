//! Client-side board state.
//!
//! - `model`: the in-memory [`Board`] and full-snapshot loading
//! - `moves`: positional relocation of cards between and within columns
//! - `completion`: the `completed` flag and project counters follow column membership
//! - `client`: the [`BoardApi`] persistence seam and its HTTP implementation
//! - `reconcile`: [`BoardView`], optimistic mutation plus convergence to server truth

pub mod client;
pub mod completion;
pub mod model;
pub mod moves;
pub mod reconcile;

pub use client::{BoardApi, HttpBoardApi, Identity};
pub use model::{Board, Column, SnapshotOutcome, TaskEdit};
pub use moves::{MoveOutcome, Position, TaskMove};
pub use reconcile::{BoardView, StaleReason, SyncConfig, SyncState, ViewEvent};
