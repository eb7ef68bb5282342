use crate::storage::{rows::check_new_keys, CardRow, ColumnRow, RowStore};
use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    columns: Vec<ColumnRow>,
    cards: Vec<CardRow>,
}

/// In-process store holding both tables in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with rows
    pub fn with_rows(columns: Vec<ColumnRow>, cards: Vec<CardRow>) -> Self {
        Self {
            tables: Mutex::new(Tables { columns, cards }),
        }
    }

    /// Copies out the stored rows in insertion order
    pub fn rows(&self) -> anyhow::Result<(Vec<ColumnRow>, Vec<CardRow>)> {
        let tables = self.lock()?;
        Ok((tables.columns.clone(), tables.cards.clone()))
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn select_columns(&self) -> anyhow::Result<Vec<ColumnRow>> {
        let mut rows = self.lock()?.columns.clone();
        rows.sort_by_key(|row| row.order);
        Ok(rows)
    }

    async fn select_cards(&self) -> anyhow::Result<Vec<CardRow>> {
        let mut rows = self.lock()?.cards.clone();
        rows.sort_by_key(|row| row.order);
        Ok(rows)
    }

    async fn delete_all_columns(&self) -> anyhow::Result<()> {
        self.lock()?.columns.clear();
        Ok(())
    }

    async fn delete_all_cards(&self) -> anyhow::Result<()> {
        self.lock()?.cards.clear();
        Ok(())
    }

    async fn insert_columns(&self, rows: &[ColumnRow]) -> anyhow::Result<()> {
        let mut tables = self.lock()?;
        check_new_keys(&tables.columns, rows)?;
        tables.columns.extend_from_slice(rows);
        Ok(())
    }

    async fn insert_cards(&self, rows: &[CardRow]) -> anyhow::Result<()> {
        let mut tables = self.lock()?;
        check_new_keys(&tables.cards, rows)?;
        tables.cards.extend_from_slice(rows);
        Ok(())
    }
}
