//! # Hlavi Sync
//!
//! Ordered board reconciliation for Hlavi kanban boards.
//!
//! The crate keeps a two-level board (columns holding cards) ordered while
//! cards are dragged between columns, and mirrors every change to a store
//! that can only replace whole tables. Engine transforms are pure; the
//! controller applies them optimistically and saves in the background.

pub mod config;
pub mod controller;
pub mod domain;
pub mod engine;
pub mod error;
pub mod storage;

// Re-export commonly used types
pub use config::{SavePolicy, SyncConfig};
pub use controller::{BoardController, Command};
pub use domain::{Board, BoardConfig, Card, CardId, Column, ColumnId, Priority};
pub use engine::Transition;
pub use error::{Result, SavePhase, SyncError};
pub use storage::{BoardGateway, Gateway, MemoryStore, RowStore};
