use crate::{data::Table, record::Record, utils, ScraperError, Storage};
use chrono::{DateTime, Local};
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes the whole record list as one pretty-printed JSON array.
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        JsonStorage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn save(&self, records: &[Record]) -> Result<(), ScraperError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(records)?;
        tokio::fs::write(&self.path, json).await?;
        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Reads back a JSON array written by [`JsonStorage`] (or rewritten by the
/// classifier) without assuming any field set.
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<Value>, ScraperError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write_records<P: AsRef<Path>>(path: P, records: &[Value]) -> Result<(), ScraperError> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Copies `path` beside itself as `<stem>_backup_<YYYYMMDD_HHMMSS>.<ext>`.
pub fn backup_file<P: AsRef<Path>>(path: P, now: DateTime<Local>) -> Result<PathBuf, ScraperError> {
    let path = path.as_ref();
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let backup = path.with_file_name(format!(
        "{}_backup_{}{}",
        stem,
        now.format("%Y%m%d_%H%M%S"),
        extension
    ));
    std::fs::copy(path, &backup)?;
    debug!("Backed up {} to {}", path.display(), backup.display());
    Ok(backup)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub source_url: String,
    pub scraped_at: String,
    pub config_used: String,
    /// The full record as JSON.
    pub data: String,
}

impl RecordRow {
    fn from_record(record: &Record) -> Result<Self, ScraperError> {
        Ok(RecordRow {
            source_url: record.source_url.clone(),
            scraped_at: record.scraped_at.clone(),
            config_used: record.config_used.clone(),
            data: serde_json::to_string(record)?,
        })
    }
}

pub struct RecordTable {
    name: String,
    pool: SqlitePool,
}

#[async_trait::async_trait]
impl Table for RecordTable {
    type Entry<'a> = &'a [RecordRow];

    fn get_name(&self) -> &str {
        self.name.as_str()
    }

    fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create(&self) -> Result<(), sqlx::Error> {
        if utils::is_table_exists(self.get_pool(), &self.name).await? {
            debug!("Use table {}", self.name);
        } else {
            debug!("Create table {}", self.name);
            let query = format!(
                r#"
                    CREATE TABLE {} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        source_url TEXT,
                        scraped_at TEXT,
                        config_used TEXT,
                        data TEXT,
                        created_at DATETIME
                    )
                "#,
                &self.name
            );
            sqlx::query(query.as_str()).execute(self.get_pool()).await?;
        }
        Ok(())
    }

    async fn insert<'a>(&self, rows: Self::Entry<'a>) -> Result<(), sqlx::Error> {
        let timestamp = utils::get_now();
        let query = format!(
            r#"INSERT INTO {} (
                source_url,
                scraped_at,
                config_used,
                data,
                created_at) VALUES (?, ?, ?, ?, ?)"#,
            self.name
        );
        let mut tx = self.get_pool().begin().await?;
        for row in rows {
            sqlx::query(&query)
                .bind(row.source_url.as_str())
                .bind(row.scraped_at.as_str())
                .bind(row.config_used.as_str())
                .bind(row.data.as_str())
                .bind(timestamp)
                .execute(&mut tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Appends records to a `<site>_records` table of a SQLite database.
pub struct SqliteStorage {
    pub records: RecordTable,
    location: String,
}

impl SqliteStorage {
    pub async fn new<P: AsRef<Path>>(path: P, site_name: &str) -> Result<SqliteStorage, ScraperError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let opt = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opt).await?;
        Self::with_pool(pool, site_name, path.display().to_string()).await
    }

    pub async fn with_pool(pool: SqlitePool, site_name: &str, location: String) -> Result<SqliteStorage, ScraperError> {
        let records = RecordTable {
            name: utils::table_name(site_name, "records"),
            pool,
        };

        records.create().await?;

        Ok(SqliteStorage { records, location })
    }

    pub async fn count(&self) -> Result<u32, ScraperError> {
        Ok(self.records.count().await?)
    }

    /// Stored records in insertion order.
    pub async fn load_all(&self) -> Result<Vec<Value>, ScraperError> {
        let mut records = vec![];
        let query = format!("SELECT data FROM {} ORDER BY id", self.records.get_name());
        let mut rows = sqlx::query(&query).fetch(self.records.get_pool());
        while let Some(row) = rows.try_next().await? {
            let data: String = row.try_get("data")?;
            records.push(serde_json::from_str(&data)?);
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl Storage for SqliteStorage {
    async fn save(&self, records: &[Record]) -> Result<(), ScraperError> {
        let rows = records
            .iter()
            .map(RecordRow::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        self.records.insert(rows.as_slice()).await?;
        debug!("Inserted {} rows into {}", rows.len(), self.records.get_name());
        Ok(())
    }

    fn location(&self) -> String {
        format!("{} ({})", self.location, self.records.get_name())
    }
}
