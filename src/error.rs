use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Step of an overwrite-all save that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    DeleteCards,
    DeleteColumns,
    InsertColumns,
    InsertCards,
}

impl SavePhase {
    /// Whether rows had already been deleted when this phase ran.
    ///
    /// A failure in such a phase can leave the store empty or holding only
    /// part of the board until the next successful save.
    pub fn after_delete(&self) -> bool {
        matches!(self, Self::DeleteColumns | Self::InsertColumns | Self::InsertCards)
    }
}

impl fmt::Display for SavePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteCards => write!(f, "delete cards"),
            Self::DeleteColumns => write!(f, "delete columns"),
            Self::InsertColumns => write!(f, "insert columns"),
            Self::InsertCards => write!(f, "insert cards"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Persistence error during {phase}: {source}")]
    Persistence {
        phase: SavePhase,
        #[source]
        source: anyhow::Error,
    },

    #[error("Storage error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
