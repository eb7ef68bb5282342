//! Wire rows exchanged with the store.
//!
//! Rows mirror the relational tables (`column_id`, integer `order`) and are
//! converted to and from domain entities at the gateway boundary.

use crate::{
    domain::{Card, CardId, Column, ColumnId, Priority},
    error::{Result, SyncError},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRow {
    pub id: String,
    pub title: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRow {
    pub id: String,
    pub title: String,
    pub column_id: String,
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// Rows keyed by a primary-key `id`
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for ColumnRow {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for CardRow {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Fails when an incoming row repeats a key already in `table` or earlier
/// in `incoming`, the way a primary-key constraint would
pub fn check_new_keys<T: Keyed>(table: &[T], incoming: &[T]) -> anyhow::Result<()> {
    let mut keys: HashSet<&str> = table.iter().map(Keyed::key).collect();
    for row in incoming {
        if !keys.insert(row.key()) {
            anyhow::bail!("duplicate primary key {}", row.key());
        }
    }
    Ok(())
}

fn rank_from_row(id: &str, order: i64) -> Result<u32> {
    u32::try_from(order)
        .map_err(|_| SyncError::Store(format!("row {} has invalid order {}", id, order)))
}

impl From<&Column> for ColumnRow {
    fn from(column: &Column) -> Self {
        Self {
            id: column.id.to_string(),
            title: column.title.clone(),
            order: i64::from(column.order),
        }
    }
}

impl TryFrom<ColumnRow> for Column {
    type Error = SyncError;

    fn try_from(row: ColumnRow) -> Result<Self> {
        let order = rank_from_row(&row.id, row.order)?;
        Ok(Column::new(ColumnId::new(row.id), row.title, order))
    }
}

impl From<&Card> for CardRow {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id.to_string(),
            title: card.title.clone(),
            column_id: card.column_id.to_string(),
            order: i64::from(card.order),
            priority: card.priority,
        }
    }
}

impl TryFrom<CardRow> for Card {
    type Error = SyncError;

    fn try_from(row: CardRow) -> Result<Self> {
        let order = rank_from_row(&row.id, row.order)?;
        let mut card = Card::new(
            CardId::new(row.id),
            row.title,
            ColumnId::new(row.column_id),
            order,
        );
        card.priority = row.priority;
        Ok(card)
    }
}
