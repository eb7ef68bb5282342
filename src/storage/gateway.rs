use crate::{
    domain::{check_invariants, Board, Card, Column},
    error::{Result, SavePhase, SyncError},
    storage::{BoardGateway, CardRow, ColumnRow, RowStore},
};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, error, warn};

/// Overwrite-all persistence over a [`RowStore`].
///
/// `save` deletes every stored row and inserts the board again. The store
/// offers no transaction across those steps, so a failed insert leaves it
/// empty or partially filled until a later save succeeds.
pub struct Gateway<S> {
    store: S,
}

impl<S: RowStore> Gateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn read_board(&self) -> Result<Option<Board>> {
        let (columns, cards) = tokio::join!(self.store.select_columns(), self.store.select_cards());
        let columns = columns.map_err(|e| SyncError::Store(format!("select columns: {:#}", e)))?;
        let cards = cards.map_err(|e| SyncError::Store(format!("select cards: {:#}", e)))?;

        let mut kept_columns = Vec::with_capacity(columns.len());
        let mut known = HashSet::new();
        for row in columns {
            let column = match Column::try_from(row) {
                Ok(column) => column,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable column row");
                    continue;
                }
            };
            if known.insert(column.id.clone()) {
                kept_columns.push(column);
            } else {
                warn!(column = %column.id, "Dropping stored column with a duplicate id");
            }
        }

        if kept_columns.is_empty() {
            return Ok(None);
        }

        let mut seen_cards = HashSet::new();
        let mut kept = Vec::with_capacity(cards.len());
        for row in cards {
            let card = match Card::try_from(row) {
                Ok(card) => card,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable card row");
                    continue;
                }
            };
            if !known.contains(&card.column_id) {
                warn!(
                    card = %card.id,
                    column = %card.column_id,
                    "Dropping stored card that references a missing column"
                );
            } else if !seen_cards.insert(card.id.clone()) {
                warn!(card = %card.id, "Dropping stored card with a duplicate id");
            } else {
                kept.push(card);
            }
        }

        let board = Board::new(kept_columns, kept);
        let gaps = check_invariants(&board, true);
        if !gaps.is_empty() {
            debug!(violations = gaps.len(), "Loaded board has rank gaps");
        }

        Ok(Some(board))
    }

    async fn write_board(&self, board: &Board) -> Result<()> {
        let column_rows: Vec<ColumnRow> = board.columns.iter().map(ColumnRow::from).collect();
        let card_rows: Vec<CardRow> = board.cards.iter().map(CardRow::from).collect();

        // Cards go first so the store never holds cards without their column
        self.store
            .delete_all_cards()
            .await
            .map_err(|source| persistence(SavePhase::DeleteCards, source))?;
        self.store
            .delete_all_columns()
            .await
            .map_err(|source| persistence(SavePhase::DeleteColumns, source))?;

        if !column_rows.is_empty() {
            self.store
                .insert_columns(&column_rows)
                .await
                .map_err(|source| persistence(SavePhase::InsertColumns, source))?;
        }
        if !card_rows.is_empty() {
            self.store
                .insert_cards(&card_rows)
                .await
                .map_err(|source| persistence(SavePhase::InsertCards, source))?;
        }

        Ok(())
    }
}

fn persistence(phase: SavePhase, source: anyhow::Error) -> SyncError {
    SyncError::Persistence { phase, source }
}

#[async_trait]
impl<S: RowStore> BoardGateway for Gateway<S> {
    async fn load(&self) -> Option<Board> {
        match self.read_board().await {
            Ok(Some(board)) => {
                debug!(
                    columns = board.columns.len(),
                    cards = board.cards.len(),
                    "Loaded board"
                );
                Some(board)
            }
            Ok(None) => {
                debug!("Store holds no columns");
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to load board");
                None
            }
        }
    }

    async fn save(&self, board: &Board) -> Result<()> {
        let result = self.write_board(board).await;

        match &result {
            Ok(()) => debug!(
                columns = board.columns.len(),
                cards = board.cards.len(),
                "Saved board"
            ),
            Err(SyncError::Persistence { phase, .. }) if phase.after_delete() => warn!(
                %phase,
                "Save failed after stored rows were deleted; the store may be empty until the next successful save"
            ),
            Err(_) => {}
        }

        result
    }
}
