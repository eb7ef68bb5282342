use crate::domain::{
    board::Board,
    card::Card,
    column::{Column, ColumnId},
};
use std::{collections::HashSet, fmt};

/// Entities ranked among their siblings by a zero-based `order`
pub trait Ranked {
    fn order(&self) -> u32;
    fn id_str(&self) -> &str;
}

impl Ranked for Column {
    fn order(&self) -> u32 {
        self.order
    }

    fn id_str(&self) -> &str {
        self.id.as_str()
    }
}

impl Ranked for Card {
    fn order(&self) -> u32 {
        self.order
    }

    fn id_str(&self) -> &str {
        self.id.as_str()
    }
}

/// Sorts siblings by rank, ascending.
///
/// The sort is stable, so siblings sharing a rank keep their storage order.
///
/// # Examples
/// ```
/// use hlavi_sync::domain::ordering::sort_by_rank;
/// use hlavi_sync::domain::{Column, ColumnId};
///
/// let mut columns = vec![
///     Column::new(ColumnId::new("col-2"), "Done", 1),
///     Column::new(ColumnId::new("col-1"), "To Do", 0),
/// ];
///
/// sort_by_rank(&mut columns);
/// assert_eq!(columns[0].title, "To Do");
/// ```
pub fn sort_by_rank<T: Ranked>(items: &mut [T]) {
    items.sort_by_key(|item| item.order());
}

/// Rewrites card ranks to 0..n-1 following slice order
pub fn renumber(cards: &[Card]) -> Vec<Card> {
    cards
        .iter()
        .enumerate()
        .map(|(rank, card)| card.with_order(rank as u32))
        .collect()
}

/// Cards of one column, excluding `skip`, sorted by rank
pub fn ranked_cards_in(board: &Board, column_id: &ColumnId, skip: Option<&str>) -> Vec<Card> {
    let mut cards: Vec<Card> = board
        .cards_in(column_id)
        .filter(|card| Some(card.id.as_str()) != skip)
        .cloned()
        .collect();
    sort_by_rank(&mut cards);
    cards
}

/// Columns sorted by rank, as a presentation layer would lay them out
pub fn ranked_columns(board: &Board) -> Vec<Column> {
    let mut columns = board.columns.clone();
    sort_by_rank(&mut columns);
    columns
}

/// A broken board invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Column ranks are not exactly 0..n-1
    ColumnRanks { found: Vec<u32> },
    /// Card ranks within a column are not exactly 0..n-1
    CardRanks { column: String, found: Vec<u32> },
    /// A card points at a column that is not on the board
    DanglingCard { card: String, column: String },
    DuplicateColumnId(String),
    DuplicateCardId(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnRanks { found } => write!(f, "column ranks {:?} are not contiguous", found),
            Self::CardRanks { column, found } => {
                write!(f, "card ranks {:?} in {} are not contiguous", found, column)
            }
            Self::DanglingCard { card, column } => {
                write!(f, "card {} references missing column {}", card, column)
            }
            Self::DuplicateColumnId(id) => write!(f, "duplicate column id {}", id),
            Self::DuplicateCardId(id) => write!(f, "duplicate card id {}", id),
        }
    }
}

fn is_contiguous(ranks: &[u32]) -> bool {
    ranks.iter().enumerate().all(|(i, rank)| *rank == i as u32)
}

fn sorted_ranks<'a, T: Ranked + 'a>(items: impl Iterator<Item = &'a T>) -> Vec<u32> {
    let mut ranks: Vec<u32> = items.map(Ranked::order).collect();
    ranks.sort_unstable();
    ranks
}

/// Reports every invariant the board breaks, in a stable order.
///
/// Contiguity checks are optional because column and card deletion leave
/// tolerated gaps; referential and uniqueness checks always run.
pub fn check_invariants(board: &Board, require_contiguous: bool) -> Vec<Violation> {
    let mut violations = Vec::new();

    let mut seen = HashSet::new();
    for column in &board.columns {
        if !seen.insert(column.id.as_str()) {
            violations.push(Violation::DuplicateColumnId(column.id.to_string()));
        }
    }

    let mut seen_cards = HashSet::new();
    for card in &board.cards {
        if !seen_cards.insert(card.id.as_str()) {
            violations.push(Violation::DuplicateCardId(card.id.to_string()));
        }
        if !seen.contains(card.column_id.as_str()) {
            violations.push(Violation::DanglingCard {
                card: card.id.to_string(),
                column: card.column_id.to_string(),
            });
        }
    }

    if require_contiguous {
        let found = sorted_ranks(board.columns.iter());
        if !is_contiguous(&found) {
            violations.push(Violation::ColumnRanks { found });
        }

        for column in &board.columns {
            let found = sorted_ranks(board.cards_in(&column.id));
            if !is_contiguous(&found) {
                violations.push(Violation::CardRanks {
                    column: column.id.to_string(),
                    found,
                });
            }
        }
    }

    violations
}
