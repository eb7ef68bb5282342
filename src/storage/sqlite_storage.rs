use crate::{
    domain::Priority,
    error::{Result, SyncError},
    storage::{CardRow, ColumnRow, RowStore},
};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use rusqlite::{params, types::Type, Connection};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS columns (
    id      TEXT PRIMARY KEY,
    title   TEXT NOT NULL,
    "order" INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS cards (
    id        TEXT PRIMARY KEY,
    title     TEXT NOT NULL,
    column_id TEXT NOT NULL,
    "order"   INTEGER NOT NULL,
    priority  TEXT
);
"#;

/// SQLite-backed store with one table per entity
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a database file and makes sure both tables exist
    pub fn open(database_path: impl AsRef<Path>) -> Result<Self> {
        let connection = Connection::open(database_path).map_err(store_error)?;
        Self::with_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().map_err(store_error)?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self> {
        connection
            .execute_batch(CREATE_TABLES)
            .map_err(store_error)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Runs a blocking database call off the async runtime
    async fn run<T, F>(&self, op: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut guard = connection
                .lock()
                .map_err(|_| anyhow!("sqlite connection lock poisoned"))?;
            op(&mut guard).map_err(anyhow::Error::from)
        })
        .await
        .context("sqlite task panicked")?
    }
}

fn store_error(e: rusqlite::Error) -> SyncError {
    SyncError::Store(e.to_string())
}

fn parse_priority(raw: Option<String>) -> rusqlite::Result<Option<Priority>> {
    raw.map(|s| {
        s.parse::<Priority>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into()))
    })
    .transpose()
}

#[async_trait]
impl RowStore for SqliteStore {
    async fn select_columns(&self) -> anyhow::Result<Vec<ColumnRow>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(r#"SELECT id, title, "order" FROM columns ORDER BY "order""#)?;
            let rows = stmt.query_map([], |row| {
                Ok(ColumnRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    order: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    async fn select_cards(&self) -> anyhow::Result<Vec<CardRow>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                r#"SELECT id, title, column_id, "order", priority FROM cards ORDER BY "order""#,
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(CardRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    column_id: row.get(2)?,
                    order: row.get(3)?,
                    priority: parse_priority(row.get(4)?)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    async fn delete_all_columns(&self) -> anyhow::Result<()> {
        self.run(|conn| conn.execute("DELETE FROM columns", []).map(|_| ()))
            .await
    }

    async fn delete_all_cards(&self) -> anyhow::Result<()> {
        self.run(|conn| conn.execute("DELETE FROM cards", []).map(|_| ()))
            .await
    }

    async fn insert_columns(&self, rows: &[ColumnRow]) -> anyhow::Result<()> {
        let rows = rows.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt =
                    tx.prepare(r#"INSERT INTO columns (id, title, "order") VALUES (?1, ?2, ?3)"#)?;
                for row in &rows {
                    stmt.execute(params![row.id, row.title, row.order])?;
                }
            }
            tx.commit()
        })
        .await
    }

    async fn insert_cards(&self, rows: &[CardRow]) -> anyhow::Result<()> {
        let rows = rows.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    r#"INSERT INTO cards (id, title, column_id, "order", priority)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                )?;
                for row in &rows {
                    stmt.execute(params![
                        row.id,
                        row.title,
                        row.column_id,
                        row.order,
                        row.priority.map(|p| p.to_string()),
                    ])?;
                }
            }
            tx.commit()
        })
        .await
    }
}
