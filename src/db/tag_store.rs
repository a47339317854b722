use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::models::{LatestTag, NewTag, Tag};
use super::{Result, StoreError};

const CREATE_TAGS_TABLE: &str = "CREATE TABLE tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    binary_value TEXT,
    hex_value TEXT,
    facility_code TEXT,
    unique_code TEXT,
    proxmark TEXT,
    scanned TIMESTAMP
)";

const SELECT_TAGS: &str = "SELECT id, LENGTH(binary_value) AS bits, binary_value, hex_value, \
     facility_code, unique_code, proxmark, scanned FROM tags";

/// Rows written into a freshly created store so a new deployment can be smoke-tested.
/// Column order: binary, hex, facility code, unique code, proxmark.
pub const SEED_TAGS: [[&str; 5]; 3] = [
    ["01110001111100001000000000", "1C7C200", "227", "57600", "2005c7c200"],
    ["01101101111100010000000000", "1B7C400", "219", "57856", "2005b7c400"],
    ["10101001111111010010011001", "2A7F499", "83", "64076", "2006a7f499"],
];

fn row_to_tag(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get("id")?,
        bits: row.get::<_, Option<i64>>("bits")?.unwrap_or(0),
        binary_value: row.get::<_, Option<String>>("binary_value")?.unwrap_or_default(),
        hex_value: row.get::<_, Option<String>>("hex_value")?.unwrap_or_default(),
        facility_code: row.get::<_, Option<String>>("facility_code")?.unwrap_or_default(),
        unique_code: row.get::<_, Option<String>>("unique_code")?.unwrap_or_default(),
        proxmark: row.get::<_, Option<String>>("proxmark")?.unwrap_or_default(),
        scanned: row.get("scanned")?,
    })
}

fn insert_with(conn: &Connection, tag: &NewTag) -> Result<i64> {
    conn.execute(
        "INSERT INTO tags (binary_value, hex_value, facility_code, unique_code, proxmark, scanned) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            tag.binary_value,
            tag.hex_value,
            tag.facility_code,
            tag.unique_code,
            tag.proxmark,
            Utc::now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TAGS_TABLE)?;
    for [binary, hex, facility, unique, proxmark] in SEED_TAGS {
        insert_with(conn, &NewTag::new(binary, hex, facility, unique, proxmark))?;
    }
    Ok(())
}

/// The single persistent table of tag scans.
///
/// One SQLite connection is held for the lifetime of the process and every
/// operation serializes through it. The handle starts closed; `initialize`
/// opens it exactly once.
#[derive(Debug)]
pub struct TagStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl TagStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            conn: Mutex::new(None),
        }
    }

    /// Creates a handle and initializes it in one step.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::new(path);
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the backing file. When the file did not exist beforehand the
    /// schema is created and the seed rows are inserted.
    pub fn initialize(&self) -> Result<()> {
        let mut guard = self.lock();
        if guard.is_some() {
            return Err(StoreError::AlreadyOpen);
        }

        let database_exists = self.path.exists();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)?;
        if !database_exists {
            info!(path = %self.path.display(), "Setting up tag database.");
            create_schema(&conn)?;
        }
        *guard = Some(conn);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Returns every tag in insertion order when `show_all` is set, otherwise
    /// the tag matching `tag_id` (if any).
    pub fn list_tags(&self, show_all: bool, tag_id: Option<i64>) -> Result<Vec<Tag>> {
        self.with_conn(|conn| {
            if show_all {
                let mut stmt = conn.prepare(&format!("{SELECT_TAGS} ORDER BY id"))?;
                let tags = stmt
                    .query_map([], row_to_tag)?
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(tags);
            }

            let Some(tag_id) = tag_id else {
                return Ok(Vec::new());
            };
            let mut stmt = conn.prepare(&format!("{SELECT_TAGS} WHERE id = ?1"))?;
            let tags = stmt
                .query_map(params![tag_id], row_to_tag)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tags)
        })
    }

    /// Appends a tag and returns the id the store assigned to it.
    pub fn insert_tag(&self, tag: &NewTag) -> Result<i64> {
        self.with_conn(|conn| {
            let id = insert_with(conn, tag)?;
            info!(id, binary_value = %tag.binary_value, "Inserted tag.");
            Ok(id)
        })
    }

    /// The most recently scanned tag id, or nothing when the table is empty.
    /// Equal timestamps resolve to the highest id.
    pub fn list_latest_tag(&self) -> Result<Vec<LatestTag>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM tags ORDER BY scanned DESC, id DESC LIMIT 1")?;
            let latest = stmt
                .query_map([], |row| Ok(LatestTag { id: row.get(0)? }))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(latest)
        })
    }

    /// Removes a tag. Deleting an id that does not exist affects no rows and is not an error.
    pub fn delete_tag(&self, tag_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let rows_affected = conn.execute("DELETE FROM tags WHERE id = ?1", params![tag_id])?;
            debug!(tag_id, rows_affected, "Deleted tag.");
            Ok(rows_affected as u64)
        })
    }

    /// Drops the table and recreates it with only the seed rows.
    pub fn reset_database(&self) -> Result<()> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(StoreError::NotOpen)?;
        let tx = conn.transaction()?;
        tx.execute_batch("DROP TABLE IF EXISTS tags")?;
        create_schema(&tx)?;
        tx.commit()?;
        info!(path = %self.path.display(), "Tag database reset to seed data.");
        Ok(())
    }

    pub fn tag_count(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(StoreError::NotOpen)?;
        f(conn)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        // A panic while holding the lock leaves the connection itself usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn fresh_store() -> (TempDir, TagStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TagStore::open(dir.path().join("rfidpi.db")).unwrap();
        (dir, store)
    }

    fn sample_tag() -> NewTag {
        NewTag::new("00111101111110001001110101", "0F7E275", "123", "61754", "2004f7e275")
    }

    #[test]
    fn test_fresh_store_is_seeded() {
        let (_dir, store) = fresh_store();
        let tags = store.list_tags(true, None).unwrap();

        assert_eq!(tags.len(), 3);
        for (tag, seed) in tags.iter().zip(SEED_TAGS.iter()) {
            assert_eq!(tag.binary_value, seed[0]);
            assert_eq!(tag.hex_value, seed[1]);
            assert_eq!(tag.facility_code, seed[2]);
            assert_eq!(tag.unique_code, seed[3]);
            assert_eq!(tag.proxmark, seed[4]);
        }
    }

    #[test]
    fn test_initialize_twice_fails() {
        let (_dir, store) = fresh_store();
        let result = store.initialize();
        assert!(matches!(result, Err(StoreError::AlreadyOpen)));
        assert_eq!(store.tag_count().unwrap(), 3);
    }

    #[test]
    fn test_reopen_existing_file_does_not_reseed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rfidpi.db");
        {
            let store = TagStore::open(&path).unwrap();
            store.insert_tag(&sample_tag()).unwrap();
        }
        let store = TagStore::open(&path).unwrap();
        assert_eq!(store.tag_count().unwrap(), 4);
    }

    #[test]
    fn test_uninitialized_store_reports_not_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = TagStore::new(dir.path().join("rfidpi.db"));
        assert!(!store.is_open());
        assert!(matches!(store.list_tags(true, None), Err(StoreError::NotOpen)));
        assert!(matches!(store.delete_tag(1), Err(StoreError::NotOpen)));
    }

    #[test]
    fn test_insert_then_latest_returns_new_id() {
        let (_dir, store) = fresh_store();
        let id = store.insert_tag(&sample_tag()).unwrap();

        let latest = store.list_latest_tag().unwrap();
        assert_eq!(latest, vec![LatestTag { id }]);
    }

    #[test]
    fn test_bits_matches_binary_length() {
        let (_dir, store) = fresh_store();
        store.insert_tag(&NewTag::new("1011", "B", "0", "0", "")).unwrap();
        store.insert_tag(&NewTag::new("", "", "", "", "")).unwrap();

        for tag in store.list_tags(true, None).unwrap() {
            assert_eq!(tag.bits, tag.binary_value.chars().count() as i64);
        }
        assert_eq!(store.list_tags(false, Some(1)).unwrap()[0].bits, 26);
    }

    #[test]
    fn test_delete_missing_id_is_noop() {
        let (_dir, store) = fresh_store();
        let rows = store.delete_tag(9999).unwrap();
        assert_eq!(rows, 0);
        assert_eq!(store.tag_count().unwrap(), 3);
    }

    #[test]
    fn test_delete_existing_tag() {
        let (_dir, store) = fresh_store();
        let rows = store.delete_tag(2).unwrap();
        assert_eq!(rows, 1);
        assert!(store.list_tags(false, Some(2)).unwrap().is_empty());
        assert_eq!(store.tag_count().unwrap(), 2);
    }

    #[test]
    fn test_lookup_missing_id_is_empty() {
        let (_dir, store) = fresh_store();
        assert!(store.list_tags(false, Some(42)).unwrap().is_empty());
        assert!(store.list_tags(false, None).unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let (_dir, store) = fresh_store();
        let new_tag = NewTag::new("0101'; DROP TABLE tags; --", "ÄBC", " 12 ", "", "prox\"mark");
        let before = Utc::now();
        let id = store.insert_tag(&new_tag).unwrap();

        let tags = store.list_tags(false, Some(id)).unwrap();
        assert_eq!(tags.len(), 1);
        let tag = &tags[0];
        assert_eq!(tag.id, id);
        assert_eq!(tag.binary_value, new_tag.binary_value);
        assert_eq!(tag.hex_value, new_tag.hex_value);
        assert_eq!(tag.facility_code, new_tag.facility_code);
        assert_eq!(tag.unique_code, new_tag.unique_code);
        assert_eq!(tag.proxmark, new_tag.proxmark);
        assert_eq!(tag.bits, new_tag.binary_value.chars().count() as i64);
        assert!(tag.scanned >= before);
        assert_eq!(store.tag_count().unwrap(), 4);
    }

    #[test]
    fn test_reset_restores_seed_rows() {
        let (_dir, store) = fresh_store();
        store.insert_tag(&sample_tag()).unwrap();
        store.delete_tag(1).unwrap();

        store.reset_database().unwrap();

        let tags = store.list_tags(true, None).unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(tags[0].binary_value, SEED_TAGS[0][0]);
    }

    #[test]
    fn test_concurrent_inserts_get_distinct_ids() {
        let (_dir, store) = fresh_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    (0..10)
                        .map(|_| store.insert_tag(&sample_tag()).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        let unique: HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 80);
        assert_eq!(unique.len(), 80);
        assert_eq!(store.tag_count().unwrap(), 83);
    }
}
