pub mod board;
pub mod card;
pub mod column;
pub mod ordering;

pub use board::{Board, BoardConfig, ColumnSeed};
pub use card::{Card, CardId, Priority};
pub use column::{Column, ColumnId};
pub use ordering::{check_invariants, Violation};
