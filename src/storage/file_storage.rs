use crate::storage::{
    rows::{check_new_keys, Keyed},
    CardRow, ColumnRow, RowStore,
};
use anyhow::Context;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::{fs, sync::Mutex};

/// File-based store keeping each table as a JSON array.
///
/// Writes through one store instance are serialized, and inserts reject ids
/// already in the table, so overlapping saves cannot merge two snapshots.
pub struct FileStore {
    root_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    const HLAVI_DIR: &'static str = ".hlavi";
    const COLUMNS_FILE: &'static str = "columns.json";
    const CARDS_FILE: &'static str = "cards.json";

    /// Creates a new FileStore for the given project root
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: project_root.as_ref().join(Self::HLAVI_DIR),
            write_lock: Mutex::new(()),
        }
    }

    fn columns_file(&self) -> PathBuf {
        self.root_path.join(Self::COLUMNS_FILE)
    }

    fn cards_file(&self) -> PathBuf {
        self.root_path.join(Self::CARDS_FILE)
    }

    async fn ensure_directory_exists(&self, path: &Path) -> anyhow::Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .await
                .with_context(|| format!("creating {}", path.display()))?;
        }
        Ok(())
    }

    /// Reads a table; a missing file is an empty table
    async fn read_table<T: DeserializeOwned>(&self, path: &Path) -> anyhow::Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let rows = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;

        Ok(rows)
    }

    async fn write_table<T: Serialize + Sync>(&self, path: &Path, rows: &[T]) -> anyhow::Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;

        let json = serde_json::to_string_pretty(rows)?;
        fs::write(path, json)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        Ok(())
    }

    async fn clear_table<T: Serialize + Sync>(&self, path: &Path) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_table::<T>(path, &[]).await
    }

    async fn append_table<T>(&self, path: &Path, rows: &[T]) -> anyhow::Result<()>
    where
        T: Keyed + Serialize + DeserializeOwned + Clone + Send + Sync,
    {
        let _guard = self.write_lock.lock().await;
        let mut table: Vec<T> = self.read_table(path).await?;
        check_new_keys(&table, rows).with_context(|| format!("inserting into {}", path.display()))?;
        table.extend_from_slice(rows);
        self.write_table(path, &table).await
    }
}

#[async_trait]
impl RowStore for FileStore {
    async fn select_columns(&self) -> anyhow::Result<Vec<ColumnRow>> {
        let mut rows: Vec<ColumnRow> = self.read_table(&self.columns_file()).await?;
        rows.sort_by_key(|row| row.order);
        Ok(rows)
    }

    async fn select_cards(&self) -> anyhow::Result<Vec<CardRow>> {
        let mut rows: Vec<CardRow> = self.read_table(&self.cards_file()).await?;
        rows.sort_by_key(|row| row.order);
        Ok(rows)
    }

    async fn delete_all_columns(&self) -> anyhow::Result<()> {
        self.clear_table::<ColumnRow>(&self.columns_file()).await
    }

    async fn delete_all_cards(&self) -> anyhow::Result<()> {
        self.clear_table::<CardRow>(&self.cards_file()).await
    }

    async fn insert_columns(&self, rows: &[ColumnRow]) -> anyhow::Result<()> {
        self.append_table(&self.columns_file(), rows).await
    }

    async fn insert_cards(&self, rows: &[CardRow]) -> anyhow::Result<()> {
        self.append_table(&self.cards_file(), rows).await
    }
}
