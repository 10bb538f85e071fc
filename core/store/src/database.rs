use chrono::Local;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use second_brain_schemas::{MemoryId, MemoryRecord, NewMemory};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Format of `created_at`, local time
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Page size used when callers have no opinion
pub const DEFAULT_LOAD_LIMIT: usize = 50;

const SELECT_COLUMNS: &str = "SELECT id, created_at, category, content, summary, tags FROM memories";

/// SQLite-backed memory table.
///
/// Every operation opens its own connection and drops it before returning.
/// Writers are expected to be serialized by the caller.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    path: PathBuf,
}

impl MemoryStore {
    /// Open (or create) the store at `path`, creating the parent directory and
    /// the `memories` table if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { path };
        let conn = store.connect()?;
        create_table(&conn)?;

        info!("Memory store ready at {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path).map_err(StoreError::Unavailable)?;

        // The file header is only read on first use
        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(classify_open_error)?;

        Ok(conn)
    }

    /// Append a record stamped with the current time. Returns the new id.
    pub fn save(&self, memory: &NewMemory) -> Result<MemoryId, StoreError> {
        let conn = self.connect()?;
        let created_at = Local::now().format(TIMESTAMP_FORMAT).to_string();

        let id = insert_row(&conn, &created_at, memory)?;

        debug!("Saved memory {} (category: {})", id, memory.category);
        Ok(id)
    }

    /// Up to `limit` records, newest first.
    ///
    /// Read failures are logged and reported as an empty result; callers do
    /// not distinguish "no data" from "error".
    pub fn load(&self, limit: usize) -> Vec<MemoryRecord> {
        match self.try_load(limit) {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to load memories, returning none: {}", e);
                Vec::new()
            }
        }
    }

    fn try_load(&self, limit: usize) -> Result<Vec<MemoryRecord>, StoreError> {
        let conn = self.connect()?;
        create_table(&conn)?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&format!("{} ORDER BY id DESC LIMIT ?1", SELECT_COLUMNS))?;
        let records = stmt
            .query_map(params![limit], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>, StoreError> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id.0],
                row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    /// Remove a record. A missing id is not an error; the return value says
    /// whether anything was removed.
    pub fn delete(&self, id: MemoryId) -> Result<bool, StoreError> {
        let conn = self.connect()?;
        let removed = conn.execute("DELETE FROM memories WHERE id = ?1", params![id.0])?;

        if removed > 0 {
            debug!("Deleted memory {}", id);
        } else {
            debug!("Delete of memory {} was a no-op", id);
        }
        Ok(removed > 0)
    }

    /// Destroy every record and recreate an empty table. Ids restart at 1.
    pub fn reset(&self) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute("DROP TABLE IF EXISTS memories", [])?;
        create_table(&tx)?;
        tx.commit()?;

        info!("Memory store reset");
        Ok(())
    }

    /// Renumber ids to 1..N, keeping insertion order and every other field.
    ///
    /// Extract, drop, recreate and reinsert all happen in one immediate
    /// transaction, so an interrupted compaction leaves the old table intact.
    /// Returns the number of records renumbered.
    pub fn compact_ids(&self) -> Result<usize, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let count = compact_in(&tx)?;
        if count == 0 {
            debug!("Compaction skipped: store is empty");
            return Ok(0);
        }

        tx.commit()?;

        info!("Compacted {} memories into ids 1..={}", count, count);
        Ok(count)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Unreadable or foreign files are as fatal as a missing one
fn classify_open_error(e: rusqlite::Error) -> StoreError {
    match e.sqlite_error_code() {
        Some(ErrorCode::NotADatabase) | Some(ErrorCode::CannotOpen) => StoreError::Unavailable(e),
        _ => StoreError::Query(e),
    }
}

fn create_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS memories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT,
            category TEXT,
            content TEXT,
            summary TEXT,
            tags TEXT
        )",
        [],
    )?;
    Ok(())
}

/// Shared insert path for `save` and compaction.
fn insert_row(conn: &Connection, created_at: &str, memory: &NewMemory) -> rusqlite::Result<MemoryId> {
    conn.execute(
        "INSERT INTO memories (created_at, category, content, summary, tags)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            created_at,
            memory.category.as_str(),
            memory.content.as_str(),
            memory.summary.as_str(),
            memory.tags.as_str(),
        ],
    )?;

    Ok(MemoryId(conn.last_insert_rowid()))
}

/// Body of the compaction. Runs against an open transaction and leaves
/// committing to the caller. Dropping the table also clears its
/// `sqlite_sequence` entry, so reinserted rows are numbered from 1.
fn compact_in(conn: &Connection) -> rusqlite::Result<usize> {
    let records = {
        let mut stmt = conn.prepare(&format!("{} ORDER BY id ASC", SELECT_COLUMNS))?;
        let rows = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    if records.is_empty() {
        return Ok(0);
    }

    conn.execute("DROP TABLE IF EXISTS memories", [])?;
    create_table(conn)?;

    let count = records.len();
    for record in records {
        let old_id = record.id;
        let created_at = record.created_at;
        let memory = NewMemory::new(record.category, record.content, record.summary, record.tags);
        let new_id = insert_row(conn, &created_at, &memory)?;

        if new_id != old_id {
            debug!("Renumbered memory {} -> {}", old_id, new_id);
        }
    }

    Ok(count)
}

// The table carries no NOT NULL constraints; NULL text reads back as empty.
fn row_to_record(row: &Row) -> rusqlite::Result<MemoryRecord> {
    Ok(MemoryRecord {
        id: MemoryId(row.get(0)?),
        created_at: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        category: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        summary: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        tags: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    fn ids(records: &[MemoryRecord]) -> Vec<i64> {
        records.iter().map(|r| r.id.0).collect()
    }

    #[test]
    fn test_store_creation() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        assert_eq!(store.count().unwrap(), 0);
        assert!(store.load(10).is_empty());
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("brain.db");

        let store = MemoryStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_save_and_load_newest_first() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        let a = store.save(&NewMemory::new("core", "A", "A", "x")).unwrap();
        let b = store.save(&NewMemory::new("core", "B", "B", "y")).unwrap();
        assert!(b > a);

        let records = store.load(10);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "B");
        assert_eq!(records[0].tags, "y");
        assert_eq!(records[1].content, "A");
        assert_eq!(records[1].tags, "x");
    }

    #[test]
    fn test_load_respects_limit() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        for i in 0..5 {
            store
                .save(&NewMemory::manual("journal", format!("entry {}", i), ""))
                .unwrap();
        }

        let records = store.load(3);
        assert_eq!(ids(&records), vec![5, 4, 3]);
        assert!(store.load(0).is_empty());
        assert_eq!(store.load(usize::MAX).len(), 5);
    }

    #[test]
    fn test_created_at_format() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        let id = store.save(&NewMemory::manual("core", "stamp", "")).unwrap();
        let record = store.get(id).unwrap().unwrap();

        assert!(chrono::NaiveDateTime::parse_from_str(&record.created_at, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        store.save(&NewMemory::manual("core", "keep", "")).unwrap();

        assert!(!store.delete(MemoryId(42)).unwrap());
        assert_eq!(store.count().unwrap(), 1);

        assert!(store.delete(MemoryId(1)).unwrap());
        assert!(!store.delete(MemoryId(1)).unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        assert!(store.get(MemoryId(1)).unwrap().is_none());
    }

    #[test]
    fn test_reset_clears_and_restarts_ids() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        store.save(&NewMemory::manual("core", "one", "")).unwrap();
        store.save(&NewMemory::manual("core", "two", "")).unwrap();

        store.reset().unwrap();
        assert!(store.load(10).is_empty());

        let id = store.save(&NewMemory::manual("core", "fresh", "")).unwrap();
        assert_eq!(id, MemoryId(1));
    }

    #[test]
    fn test_compact_closes_gaps() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        for i in 1..=7 {
            store
                .save(&NewMemory::new("core", format!("c{}", i), format!("s{}", i), format!("t{}", i)))
                .unwrap();
        }
        for id in [2, 4, 5, 6] {
            store.delete(MemoryId(id)).unwrap();
        }

        let before = store.load(10);
        assert_eq!(ids(&before), vec![7, 3, 1]);

        assert_eq!(store.compact_ids().unwrap(), 3);

        let after = store.load(10);
        assert_eq!(ids(&after), vec![3, 2, 1]);
        for (old, new) in before.iter().zip(after.iter()) {
            assert_eq!(old.created_at, new.created_at);
            assert_eq!(old.category, new.category);
            assert_eq!(old.content, new.content);
            assert_eq!(old.summary, new.summary);
            assert_eq!(old.tags, new.tags);
        }

        let next = store.save(&NewMemory::manual("core", "next", "")).unwrap();
        assert_eq!(next, MemoryId(4));
    }

    #[test]
    fn test_compact_empty_store() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        assert_eq!(store.compact_ids().unwrap(), 0);
        assert!(store.load(10).is_empty());
    }

    #[test]
    fn test_uncommitted_compaction_rolls_back() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        for content in ["a", "b", "c"] {
            store.save(&NewMemory::manual("core", content, "")).unwrap();
        }
        store.delete(MemoryId(2)).unwrap();

        {
            let mut conn = Connection::open(temp.path()).unwrap();
            let tx = conn.transaction().unwrap();
            assert_eq!(compact_in(&tx).unwrap(), 2);
            // dropped without commit
        }

        let records = store.load(10);
        assert_eq!(ids(&records), vec![3, 1]);
        assert_eq!(records[0].content, "c");
    }

    #[test]
    fn test_null_columns_read_as_empty() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        let conn = Connection::open(temp.path()).unwrap();
        conn.execute("INSERT INTO memories (content) VALUES ('bare')", [])
            .unwrap();

        let records = store.load(10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "bare");
        assert_eq!(records[0].tags, "");
    }

    #[test]
    fn test_unavailable_storage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brain.db");
        let store = MemoryStore::open(&path).unwrap();
        store.save(&NewMemory::manual("core", "gone soon", "")).unwrap();

        dir.close().unwrap();

        let err = store
            .save(&NewMemory::manual("core", "lost", ""))
            .unwrap_err();
        assert!(err.is_unavailable());
        assert!(store.load(10).is_empty());
    }

    #[test]
    fn test_corrupt_file_is_unavailable() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();
        store.save(&NewMemory::manual("core", "before", "")).unwrap();

        std::fs::write(temp.path(), vec![b'x'; 4096]).unwrap();

        let err = store
            .save(&NewMemory::manual("core", "after", ""))
            .unwrap_err();
        assert!(err.is_unavailable());
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.load(10).is_empty());
    }

    #[test]
    fn test_missing_table_is_query_error() {
        let temp = NamedTempFile::new().unwrap();
        let store = MemoryStore::open(temp.path()).unwrap();

        let conn = Connection::open(temp.path()).unwrap();
        conn.execute("DROP TABLE memories", []).unwrap();

        let err = store.count().unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }
}
