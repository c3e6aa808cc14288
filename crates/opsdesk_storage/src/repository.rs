use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use opsdesk_contract::{FileRecord, StorageLocation, TransferStatus};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use crate::store::FileStore;

const SCHEMA_SQL: &str = include_str!("sql/schema.sql");

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub sqlite_path: String,
}

#[derive(Debug, Clone)]
pub struct SqliteFileStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, FromRow)]
struct ReportFileRow {
    file_id: String,
    file_name: String,
    remote_path: Option<String>,
    local_path: Option<String>,
    destination_group: String,
    transfer_status: String,
    current_location: String,
    date_created: Option<String>,
}

impl TryFrom<ReportFileRow> for FileRecord {
    type Error = anyhow::Error;

    fn try_from(row: ReportFileRow) -> Result<Self> {
        let status = TransferStatus::from_str(&row.transfer_status)
            .with_context(|| format!("corrupt status for {}", row.file_id))?;
        let location = StorageLocation::from_str(&row.current_location)
            .with_context(|| format!("corrupt location for {}", row.file_id))?;
        Ok(FileRecord {
            id: row.file_id,
            file_name: row.file_name,
            destination_group: row.destination_group,
            status,
            remote_path: row.remote_path,
            local_path: row.local_path,
            current_location: Some(location),
            date_created: row.date_created,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT file_id, file_name, remote_path, local_path, destination_group, transfer_status, current_location, date_created FROM report_files";

impl SqliteFileStore {
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let uri = normalize_sqlite_uri(&config.sqlite_path);
        let in_memory = uri.contains(":memory:");
        let options = SqliteConnectOptions::from_str(&uri)
            .with_context(|| format!("invalid sqlite URI: {}", uri))?
            .create_if_missing(true);

        // sqlite creates the file but not its directory.
        if !in_memory {
            if let Some(parent) = options
                .get_filename()
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        // Each connection to `:memory:` is its own database.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .context("failed to connect sqlite pool")?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA_SQL.split(';') {
            let sql = statement.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("migration failed for statement: {sql}"))?;
        }
        info!("opsdesk sqlite schema ready");
        Ok(())
    }
}

#[async_trait]
impl FileStore for SqliteFileStore {
    async fn insert(&self, record: FileRecord) -> Result<FileRecord> {
        let now = Utc::now().to_rfc3339();
        let location = record.current_location.unwrap_or(StorageLocation::Remote);

        sqlx::query(
            "INSERT INTO report_files(file_id, file_name, remote_path, local_path, destination_group, transfer_status, current_location, date_created, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.file_name)
        .bind(&record.remote_path)
        .bind(&record.local_path)
        .bind(&record.destination_group)
        .bind(record.status.as_str())
        .bind(location.as_str())
        .bind(&record.date_created)
        .bind(&now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("insert report file {}", record.id))?;

        self.get(&record.id)
            .await?
            .ok_or_else(|| anyhow!("report file {} missing after insert", record.id))
    }

    async fn get(&self, file_id: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, ReportFileRow>(&format!("{SELECT_COLUMNS} WHERE file_id = ?"))
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("query report file {file_id}"))?;
        row.map(FileRecord::try_from).transpose()
    }

    async fn list_by_status(&self, statuses: &[TransferStatus]) -> Result<Vec<FileRecord>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!("{SELECT_COLUMNS} WHERE transfer_status IN ({placeholders}) ORDER BY rowid ASC");
        let mut query = sqlx::query_as::<_, ReportFileRow>(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("query report files by status")?;
        rows.into_iter().map(FileRecord::try_from).collect()
    }

    async fn transition(
        &self,
        file_id: &str,
        from: TransferStatus,
        to: TransferStatus,
    ) -> Result<Option<FileRecord>> {
        if !from.can_advance_to(to) {
            bail!("illegal status transition {from} -> {to}");
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE report_files SET transfer_status = ?, updated_at = ? WHERE file_id = ? AND transfer_status = ?",
        )
        .bind(to.as_str())
        .bind(now)
        .bind(file_id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("update status for {file_id}"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        debug!(file_id, from = %from, to = %to, "status advanced");
        self.get(file_id).await
    }

    async fn complete_transfer(
        &self,
        file_id: &str,
        local_path: &str,
    ) -> Result<Option<FileRecord>> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE report_files SET transfer_status = ?, current_location = ?, local_path = ?, updated_at = ? WHERE file_id = ? AND transfer_status = ?",
        )
        .bind(TransferStatus::Transferred.as_str())
        .bind(StorageLocation::Local.as_str())
        .bind(local_path)
        .bind(now)
        .bind(file_id)
        .bind(TransferStatus::Processing.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("complete transfer for {file_id}"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(file_id).await
    }

    async fn count(&self) -> Result<u64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM report_files")
            .fetch_one(&self.pool)
            .await
            .context("count report files")?;
        Ok(total.max(0) as u64)
    }
}

fn normalize_sqlite_uri(raw: &str) -> String {
    if raw.starts_with("sqlite:") {
        raw.to_string()
    } else {
        format!("sqlite://{raw}")
    }
}
