use crate::{domain::Board, error::Result};
use async_trait::async_trait;

pub mod gateway;
pub mod memory;
pub mod rows;

#[cfg(feature = "file-storage")]
pub mod file_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

pub use gateway::Gateway;
pub use memory::MemoryStore;
pub use rows::{CardRow, ColumnRow};

#[cfg(feature = "file-storage")]
pub use file_storage::FileStore;

#[cfg(feature = "sqlite-storage")]
pub use sqlite_storage::SqliteStore;

/// Table-level operations of a store that can only replace whole tables
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Selects every column row, ordered by `order`
    async fn select_columns(&self) -> anyhow::Result<Vec<ColumnRow>>;

    /// Selects every card row, ordered by `order`
    async fn select_cards(&self) -> anyhow::Result<Vec<CardRow>>;

    async fn delete_all_columns(&self) -> anyhow::Result<()>;

    async fn delete_all_cards(&self) -> anyhow::Result<()>;

    async fn insert_columns(&self, rows: &[ColumnRow]) -> anyhow::Result<()>;

    async fn insert_cards(&self, rows: &[CardRow]) -> anyhow::Result<()>;
}

/// Board-level persistence used by the controller
#[async_trait]
pub trait BoardGateway: Send + Sync {
    /// Loads the last saved board.
    ///
    /// Returns `None` when nothing is stored or the read fails; callers fall
    /// back to a default board. Rows with a negative `order`, duplicate ids
    /// and cards referencing a missing column are skipped with a warning, so
    /// the next save drops them from the store.
    async fn load(&self) -> Option<Board>;

    /// Replaces everything stored with `board`.
    ///
    /// Not transactional: a failure after the delete phase can leave the
    /// store empty until the next successful save.
    async fn save(&self, board: &Board) -> Result<()>;
}
