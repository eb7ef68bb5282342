//! Reorder engine.
//!
//! Pure transforms from one board snapshot to the next. None of them fail:
//! an unknown id yields an unchanged board with `applied == false`.
//!
//! Ranks are kept contiguous per column by `move_card`, which renumbers the
//! source and target columns. Deleting a column or a card leaves a gap that
//! the next move touching that column closes.

use crate::domain::{
    ordering::{ranked_cards_in, renumber},
    Board, Card, CardId, Column, ColumnId, Priority,
};

/// Title given to columns created without one
pub const DEFAULT_COLUMN_TITLE: &str = "New Column";

/// Result of applying a transform
#[derive(Debug, Clone)]
#[must_use]
pub struct Transition {
    pub board: Board,
    /// False when the transform was a no-op (unknown id, same-column move,
    /// id collision); `board` then equals the input
    pub applied: bool,
}

impl Transition {
    fn applied(board: Board) -> Self {
        Self {
            board,
            applied: true,
        }
    }

    pub(crate) fn unchanged(board: &Board) -> Self {
        Self {
            board: board.clone(),
            applied: false,
        }
    }
}

/// Appends a column with a fresh id and the default title
pub fn add_column(board: &Board) -> Transition {
    insert_column(board, ColumnId::generate(), DEFAULT_COLUMN_TITLE)
}

/// Appends a column with the given id, ranked after every existing column.
///
/// The rank is the column count, so a board with a deletion gap can end up
/// with two columns sharing a rank.
pub fn insert_column(board: &Board, id: ColumnId, title: impl Into<String>) -> Transition {
    if board.find_column(&id).is_some() {
        return Transition::unchanged(board);
    }

    let mut columns = board.columns.clone();
    columns.push(Column::new(id, title, board.columns.len() as u32));

    Transition::applied(Board::new(columns, board.cards.clone()))
}

pub fn rename_column(board: &Board, column_id: &ColumnId, title: impl Into<String>) -> Transition {
    if board.find_column(column_id).is_none() {
        return Transition::unchanged(board);
    }

    let title = title.into();
    let columns = board
        .columns
        .iter()
        .map(|col| {
            if &col.id == column_id {
                col.with_title(title.clone())
            } else {
                col.clone()
            }
        })
        .collect();

    Transition::applied(Board::new(columns, board.cards.clone()))
}

/// Removes a column together with every card it owns.
///
/// Remaining columns keep their ranks.
pub fn delete_column(board: &Board, column_id: &ColumnId) -> Transition {
    if board.find_column(column_id).is_none() {
        return Transition::unchanged(board);
    }

    let columns = board
        .columns
        .iter()
        .filter(|col| &col.id != column_id)
        .cloned()
        .collect();
    let cards = board
        .cards
        .iter()
        .filter(|card| &card.column_id != column_id)
        .cloned()
        .collect();

    Transition::applied(Board::new(columns, cards))
}

/// Appends a card with a fresh id to a column
pub fn add_card(board: &Board, column_id: &ColumnId, title: impl Into<String>) -> Transition {
    insert_card(board, CardId::generate(), column_id, title)
}

/// Appends a card to a column, ranked at the column's card count.
///
/// Count rather than max + 1: with ranks {0, 2} the new card gets rank 2.
pub fn insert_card(
    board: &Board,
    id: CardId,
    column_id: &ColumnId,
    title: impl Into<String>,
) -> Transition {
    if board.find_column(column_id).is_none() || board.find_card(&id).is_some() {
        return Transition::unchanged(board);
    }

    let order = board.card_count_in(column_id) as u32;
    let mut cards = board.cards.clone();
    cards.push(Card::new(id, title, column_id.clone(), order));

    Transition::applied(Board::new(board.columns.clone(), cards))
}

fn update_card(board: &Board, card_id: &CardId, update: impl Fn(&Card) -> Card) -> Transition {
    if board.find_card(card_id).is_none() {
        return Transition::unchanged(board);
    }

    let cards = board
        .cards
        .iter()
        .map(|card| {
            if &card.id == card_id {
                update(card)
            } else {
                card.clone()
            }
        })
        .collect();

    Transition::applied(Board::new(board.columns.clone(), cards))
}

pub fn rename_card(board: &Board, card_id: &CardId, title: impl Into<String>) -> Transition {
    let title = title.into();
    update_card(board, card_id, |card| card.with_title(title.clone()))
}

pub fn set_priority(board: &Board, card_id: &CardId, priority: Priority) -> Transition {
    update_card(board, card_id, |card| card.with_priority(priority))
}

/// Removes a card. Its former siblings keep their ranks.
pub fn delete_card(board: &Board, card_id: &CardId) -> Transition {
    if board.find_card(card_id).is_none() {
        return Transition::unchanged(board);
    }

    let cards = board
        .cards
        .iter()
        .filter(|card| &card.id != card_id)
        .cloned()
        .collect();

    Transition::applied(Board::new(board.columns.clone(), cards))
}

/// Moves a card into another column, directly after `after_card_id` or at
/// the end when that card is omitted or not in the target column.
///
/// Moving a card within its own column is a no-op, as is a move into a
/// column that is not on the board. Both the source and the target column
/// come out ranked 0..n-1; every other column is left untouched.
pub fn move_card(
    board: &Board,
    card_id: &CardId,
    target_column_id: &ColumnId,
    after_card_id: Option<&CardId>,
) -> Transition {
    let Some(card) = board.find_card(card_id) else {
        return Transition::unchanged(board);
    };
    if &card.column_id == target_column_id || board.find_column(target_column_id).is_none() {
        return Transition::unchanged(board);
    }
    let source_column_id = card.column_id.clone();

    let mut target = ranked_cards_in(board, target_column_id, Some(card_id.as_str()));
    let insert_at = after_card_id
        .and_then(|after| target.iter().position(|c| &c.id == after))
        .map(|index| index + 1)
        .unwrap_or(target.len());
    target.insert(insert_at, card.placed(target_column_id.clone(), 0));
    let target = renumber(&target);

    let source = renumber(&ranked_cards_in(
        board,
        &source_column_id,
        Some(card_id.as_str()),
    ));

    let mut cards: Vec<Card> = board
        .cards
        .iter()
        .filter(|c| &c.column_id != target_column_id && c.column_id != source_column_id)
        .cloned()
        .collect();
    cards.extend(source);
    cards.extend(target);

    Transition::applied(Board::new(board.columns.clone(), cards))
}
