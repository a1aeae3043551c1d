use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use tracing::{debug, info, warn};

use crate::error::{NotFound, Result, StorageError};
use crate::types::{DatasetId, DatasetSummary, EquipmentRecord, NewDataset, TypeDistribution};

use super::migrations::run_migrations;
use super::{DatasetStore, check_consistency, next_uploaded_at};

const SUMMARY_COLUMNS: &str = "id, filename, uploaded_at, total_count, avg_flowrate, avg_pressure, avg_temperature, type_distribution";

/// SQLite-backed [`DatasetStore`].
///
/// `create` runs in an `IMMEDIATE` transaction, so concurrent writers (including other processes
/// on the same file) serialize and readers never observe a partially inserted record set.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("path", &self.path).finish()
    }
}

impl SqliteStore {
    /// Open (or create) a database file, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        let store = Self::init(conn, Some(path))?;
        info!(path = ?store.path, "dataset store opened");
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init(mut conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        if let Err(err) =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        {
            warn!(%err, "failed to enable WAL mode");
        }
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        run_migrations(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| StorageError::Inconsistent(format!("invalid datetime '{value}': {err}")).into())
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        StorageError::Inconsistent(format!("value {value} exceeds SQLite INTEGER range")).into()
    })
}

fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| StorageError::Inconsistent(format!("{field} is negative ({value})")).into())
}

fn row_to_summary(row: &Row<'_>) -> Result<DatasetSummary> {
    let uploaded_at: String = row.get("uploaded_at")?;
    let total_count: i64 = row.get("total_count")?;
    let distribution: String = row.get("type_distribution")?;
    let type_distribution: TypeDistribution = serde_json::from_str(&distribution)?;

    Ok(DatasetSummary {
        id: DatasetId(row.get("id")?),
        filename: row.get("filename")?,
        uploaded_at: parse_datetime(&uploaded_at)?,
        total_count: to_u64(total_count, "total_count")?,
        avg_flowrate: row.get("avg_flowrate")?,
        avg_pressure: row.get("avg_pressure")?,
        avg_temperature: row.get("avg_temperature")?,
        type_distribution,
    })
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<EquipmentRecord> {
    Ok(EquipmentRecord {
        name: row.get("name")?,
        equipment_type: row.get("equipment_type")?,
        flowrate: row.get("flowrate")?,
        pressure: row.get("pressure")?,
        temperature: row.get("temperature")?,
    })
}

fn query_summary(conn: &Connection, id: DatasetId) -> Result<Option<DatasetSummary>> {
    let mut stmt = conn.prepare(&format!("SELECT {SUMMARY_COLUMNS} FROM datasets WHERE id = ?1"))?;
    let mut rows = stmt.query(params![id.0])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_summary(row)?)),
        None => Ok(None),
    }
}

/// Insert a summary row and all of its records; the caller owns the transaction.
fn insert_dataset(tx: &Transaction<'_>, dataset: &NewDataset) -> Result<(DatasetId, DateTime<Utc>)> {
    let latest: Option<String> = tx
        .query_row(
            "SELECT uploaded_at FROM datasets ORDER BY uploaded_at DESC, id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    let latest = latest.as_deref().map(parse_datetime).transpose()?;
    let uploaded_at = next_uploaded_at(latest);

    let distribution = serde_json::to_string(&dataset.stats.type_distribution)?;
    tx.execute(
        "INSERT INTO datasets (filename, uploaded_at, total_count, avg_flowrate, avg_pressure, avg_temperature, type_distribution)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            dataset.filename,
            format_datetime(&uploaded_at),
            to_i64(dataset.stats.total_count)?,
            dataset.stats.avg_flowrate,
            dataset.stats.avg_pressure,
            dataset.stats.avg_temperature,
            distribution,
        ],
    )?;
    let id = DatasetId(tx.last_insert_rowid());

    let mut stmt = tx.prepare(
        "INSERT INTO equipment_records (dataset_id, position, name, equipment_type, flowrate, pressure, temperature)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for (position, record) in dataset.records.iter().enumerate() {
        stmt.execute(params![
            id.0,
            to_i64(position as u64)?,
            record.name,
            record.equipment_type,
            record.flowrate,
            record.pressure,
            record.temperature,
        ])?;
    }

    Ok((id, uploaded_at))
}

/// Delete every summary past the `limit` most recent, records first. Returns them most recent first.
fn evict_beyond(tx: &Transaction<'_>, limit: usize) -> Result<Vec<DatasetId>> {
    let offset = i64::try_from(limit).unwrap_or(i64::MAX);
    let excess: Vec<DatasetId> = {
        let mut stmt = tx.prepare(
            "SELECT id FROM datasets ORDER BY uploaded_at DESC, id DESC LIMIT -1 OFFSET ?1",
        )?;
        let rows = stmt.query_map(params![offset], |row| row.get(0).map(DatasetId))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    for id in &excess {
        delete_dataset(tx, *id)?;
    }
    Ok(excess)
}

/// Returns `(records_deleted, summaries_deleted)`.
fn delete_dataset(tx: &Transaction<'_>, id: DatasetId) -> Result<(usize, usize)> {
    let records = tx.execute(
        "DELETE FROM equipment_records WHERE dataset_id = ?1",
        params![id.0],
    )?;
    let deleted = tx.execute("DELETE FROM datasets WHERE id = ?1", params![id.0])?;
    Ok((records, deleted))
}

impl DatasetStore for SqliteStore {
    fn create(&self, dataset: NewDataset) -> Result<DatasetSummary> {
        check_consistency(&dataset)?;

        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (id, uploaded_at) = insert_dataset(&tx, &dataset)?;
        tx.commit()?;
        debug!(dataset_id = %id, rows = dataset.records.len(), "dataset persisted");

        let (summary, _records) = dataset.into_summary(id, uploaded_at);
        Ok(summary)
    }

    fn create_retaining(
        &self,
        dataset: NewDataset,
        limit: usize,
    ) -> Result<(DatasetSummary, Vec<DatasetId>)> {
        check_consistency(&dataset)?;

        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (id, uploaded_at) = insert_dataset(&tx, &dataset)?;
        let evicted = evict_beyond(&tx, limit.max(1))?;
        tx.commit()?;
        debug!(
            dataset_id = %id,
            rows = dataset.records.len(),
            evicted = evicted.len(),
            "dataset persisted"
        );

        let (summary, _records) = dataset.into_summary(id, uploaded_at);
        Ok((summary, evicted))
    }

    fn get(&self, id: DatasetId) -> Result<DatasetSummary> {
        let conn = self.lock();
        query_summary(&conn, id)?.ok_or_else(|| NotFound::Dataset(id).into())
    }

    fn get_records(&self, id: DatasetId) -> Result<Vec<EquipmentRecord>> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row("SELECT id FROM datasets WHERE id = ?1", params![id.0], |row| row.get(0))
            .optional()?;
        if exists.is_none() {
            return Err(NotFound::Dataset(id).into());
        }

        let records = {
            let mut stmt = tx.prepare(
                "SELECT name, equipment_type, flowrate, pressure, temperature
                 FROM equipment_records
                 WHERE dataset_id = ?1
                 ORDER BY name ASC, position ASC",
            )?;
            let rows = stmt.query_map(params![id.0], row_to_record)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(records)
    }

    fn list_recent(&self, n: usize) -> Result<Vec<DatasetSummary>> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM datasets ORDER BY uploaded_at DESC, id DESC LIMIT ?1"
        ))?;
        let mut rows = stmt.query(params![limit])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_summary(row)?);
        }
        Ok(out)
    }

    fn delete(&self, id: DatasetId) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (records, deleted) = delete_dataset(&tx, id)?;
        if deleted == 0 {
            // Dropping the transaction rolls back; there was nothing to remove anyway.
            return Err(NotFound::Dataset(id).into());
        }
        tx.commit()?;

        debug!(dataset_id = %id, records, "dataset deleted");
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let conn = self.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM datasets", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or_default())
    }
}
