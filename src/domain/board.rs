use crate::domain::{
    card::{Card, CardId},
    column::{Column, ColumnId},
};
use serde::{Deserialize, Serialize};

/// Seed for one column of a fresh board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSeed {
    pub id: String,
    pub title: String,
}

impl ColumnSeed {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Layout of the board used when nothing has been saved yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub columns: Vec<ColumnSeed>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            columns: vec![
                ColumnSeed::new("col-1", "To Do"),
                ColumnSeed::new("col-2", "In Progress"),
                ColumnSeed::new("col-3", "Done"),
            ],
        }
    }
}

/// Board snapshot: every column and every card.
///
/// Snapshots are values. Engine transforms build a new `Board` rather than
/// editing one in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    pub columns: Vec<Column>,
    pub cards: Vec<Card>,
}

impl Board {
    pub fn new(columns: Vec<Column>, cards: Vec<Card>) -> Self {
        Self { columns, cards }
    }

    /// Builds an empty board from a column layout, ranked in listed order
    pub fn from_config(config: &BoardConfig) -> Self {
        let columns = config
            .columns
            .iter()
            .enumerate()
            .map(|(order, seed)| {
                Column::new(ColumnId::new(seed.id.clone()), seed.title.clone(), order as u32)
            })
            .collect();

        Self {
            columns,
            cards: Vec::new(),
        }
    }

    pub fn find_column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|col| &col.id == id)
    }

    pub fn find_card(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|card| &card.id == id)
    }

    /// Cards owned by a column, in storage order (not rank order)
    pub fn cards_in<'a>(&'a self, column_id: &'a ColumnId) -> impl Iterator<Item = &'a Card> + 'a {
        self.cards
            .iter()
            .filter(move |card| &card.column_id == column_id)
    }

    pub fn card_count_in(&self, column_id: &ColumnId) -> usize {
        self.cards_in(column_id).count()
    }

    /// Field-by-field comparison, unlike `==` on entities which only
    /// compares ids
    pub fn same_content(&self, other: &Board) -> bool {
        fn column_key(c: &Column) -> (&str, &str, u32) {
            (c.id.as_str(), c.title.as_str(), c.order)
        }
        fn card_key(c: &Card) -> (&str, &str, &str, u32, Option<crate::domain::Priority>) {
            (
                c.id.as_str(),
                c.title.as_str(),
                c.column_id.as_str(),
                c.order,
                c.priority,
            )
        }

        let mut left_columns: Vec<_> = self.columns.iter().map(column_key).collect();
        let mut right_columns: Vec<_> = other.columns.iter().map(column_key).collect();
        left_columns.sort();
        right_columns.sort();

        let mut left_cards: Vec<_> = self.cards.iter().map(card_key).collect();
        let mut right_cards: Vec<_> = other.cards.iter().map(card_key).collect();
        left_cards.sort_by(|a, b| a.0.cmp(b.0));
        right_cards.sort_by(|a, b| a.0.cmp(b.0));

        left_columns == right_columns && left_cards == right_cards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ordering::ranked_columns, Priority};

    #[test]
    fn test_default_board_layout() {
        let board = Board::from_config(&BoardConfig::default());

        let titles: Vec<_> = board.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["To Do", "In Progress", "Done"]);

        let orders: Vec<_> = board.columns.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(board.cards.is_empty());
    }

    #[test]
    fn test_from_config_ranks_in_listed_order() {
        let config = BoardConfig {
            columns: vec![
                ColumnSeed::new("z", "First"),
                ColumnSeed::new("a", "Second"),
            ],
        };
        let mut board = Board::from_config(&config);
        board.columns.reverse();

        let layout: Vec<_> = ranked_columns(&board)
            .into_iter()
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(layout, vec!["z", "a"]);
    }

    #[test]
    fn test_cards_in_column() {
        let todo = ColumnId::new("col-1");
        let done = ColumnId::new("col-3");
        let board = Board::new(
            Board::from_config(&BoardConfig::default()).columns,
            vec![
                Card::new(CardId::new("a"), "A", todo.clone(), 0),
                Card::new(CardId::new("b"), "B", done.clone(), 0),
                Card::new(CardId::new("c"), "C", todo.clone(), 1),
            ],
        );

        assert_eq!(board.card_count_in(&todo), 2);
        assert_eq!(board.card_count_in(&done), 1);
        assert_eq!(board.card_count_in(&ColumnId::new("col-2")), 0);
        assert!(board.find_card(&CardId::new("b")).is_some());
        assert!(board.find_column(&ColumnId::new("col-9")).is_none());
    }

    #[test]
    fn test_same_content_ignores_storage_order() {
        let col = ColumnId::new("col-1");
        let a = Card::new(CardId::new("a"), "A", col.clone(), 0);
        let b = Card::new(CardId::new("b"), "B", col.clone(), 1);
        let columns = vec![Column::new(col.clone(), "To Do", 0)];

        let left = Board::new(columns.clone(), vec![a.clone(), b.clone()]);
        let right = Board::new(columns.clone(), vec![b.clone(), a.clone()]);
        assert!(left.same_content(&right));

        let changed = Board::new(columns, vec![a, b.with_priority(Priority::High)]);
        assert!(!left.same_content(&changed));
    }
}
