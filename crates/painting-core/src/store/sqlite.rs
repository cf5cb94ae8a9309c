// # SQLite Item Store
//
// Single-file relational implementation of ItemStore.
//
// ## Schema
//
// One `paintings` table. Older database files created before the borrower
// contact, image and audit columns existed are upgraded in place on open:
// missing columns are added, nothing is dropped.
//
// ## Concurrency
//
// The connection sits behind a mutex. Statements are short and the table is
// small, so calls run inline on the calling task.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::Error;
use crate::model::{Painting, PaintingId};
use crate::traits::item_store::{ItemStore, ItemStoreFactory};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS paintings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT,
    category TEXT,
    lent_to TEXT,
    due_date TEXT
);";

/// Columns added after the first schema, in the order they were introduced
const ADDED_COLUMNS: &[(&str, &str)] = &[
    ("address", "TEXT"),
    ("image_url", "TEXT"),
    ("lent_email", "TEXT"),
    ("lent_phone", "TEXT"),
    ("lent_date", "TEXT"),
    ("created_by", "TEXT"),
    ("created_at", "TEXT"),
    ("modified_by", "TEXT"),
    ("modified_at", "TEXT"),
];

/// Format of SQLite's `CURRENT_TIMESTAMP`
const SQLITE_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

const SELECT_COLUMNS: &str = "id, title, category, address, image_url, lent_to, lent_email, \
     lent_phone, lent_date, due_date, created_by, created_at, modified_by, modified_at";

/// SQLite-backed item store
pub struct SqliteItemStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteItemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteItemStore").finish_non_exhaustive()
    }
}

impl SqliteItemStore {
    /// Open (or create) a database file and bring its schema up to date
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|e| {
            Error::store(format!("Failed to open database {}: {}", path.display(), e))
        })?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, Error> {
        conn.execute_batch(CREATE_TABLE)?;
        let added = migrate(&conn)?;
        if !added.is_empty() {
            tracing::info!("Added painting columns: {}", added.join(", "));
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.conn
            .lock()
            .map_err(|e| Error::store(format!("Database lock poisoned: {}", e)))
    }
}

/// Add any missing columns, returning the names that were added
fn migrate(conn: &Connection) -> Result<Vec<&'static str>, Error> {
    let existing: Vec<String> = {
        let mut stmt = conn.prepare("PRAGMA table_info(paintings)")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        names
    };

    let mut added = Vec::new();
    for (name, kind) in ADDED_COLUMNS {
        if !existing.iter().any(|c| c == name) {
            conn.execute_batch(&format!("ALTER TABLE paintings ADD COLUMN {} {}", name, kind))?;
            added.push(*name);
        }
    }
    Ok(added)
}

fn row_to_painting(row: &Row<'_>) -> rusqlite::Result<Painting> {
    Ok(Painting {
        id: PaintingId(row.get(0)?),
        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        category: row.get(2)?,
        address: row.get(3)?,
        image_url: row.get(4)?,
        borrower_name: row.get(5)?,
        borrower_email: row.get(6)?,
        borrower_phone: row.get(7)?,
        lent_date: row.get(8)?,
        due_date: row.get(9)?,
        created_by: row.get(10)?,
        created_at: parse_timestamp(row.get(11)?),
        modified_by: row.get(12)?,
        modified_at: parse_timestamp(row.get(13)?),
    })
}

/// Read an audit timestamp
///
/// Accepts RFC 3339 and SQLite's `YYYY-MM-DD HH:MM:SS` (taken as UTC).
fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    if let Ok(t) = DateTime::parse_from_rfc3339(&raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw.trim(), SQLITE_TIMESTAMP)
        .ok()
        .map(|t| t.and_utc())
}

fn format_timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|t| t.to_rfc3339())
}

#[async_trait]
impl ItemStore for SqliteItemStore {
    async fn list_lent_items(&self) -> Result<Vec<Painting>, Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM paintings \
             WHERE lent_to IS NOT NULL AND lent_to != '' \
             AND lent_email IS NOT NULL AND lent_email != '' \
             ORDER BY id",
            SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], row_to_painting)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn list(&self) -> Result<Vec<Painting>, Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM paintings ORDER BY id",
            SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], row_to_painting)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn get(&self, id: PaintingId) -> Result<Option<Painting>, Error> {
        let conn = self.lock()?;
        let painting = conn
            .query_row(
                &format!("SELECT {} FROM paintings WHERE id = ?1", SELECT_COLUMNS),
                params![id.0],
                row_to_painting,
            )
            .optional()?;
        Ok(painting)
    }

    async fn insert(&self, painting: &Painting) -> Result<Painting, Error> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO paintings (title, category, address, image_url, lent_to, lent_email, \
             lent_phone, lent_date, due_date, created_by, created_at, modified_by, modified_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                painting.title,
                painting.category,
                painting.address,
                painting.image_url,
                painting.borrower_name,
                painting.borrower_email,
                painting.borrower_phone,
                painting.lent_date,
                painting.due_date,
                painting.created_by,
                format_timestamp(painting.created_at),
                painting.modified_by,
                format_timestamp(painting.modified_at),
            ],
        )?;

        let mut stored = painting.clone();
        stored.id = PaintingId(conn.last_insert_rowid());
        Ok(stored)
    }

    /// Overwrite the editable and `modified_*` columns
    ///
    /// `created_by` and `created_at` are left exactly as stored.
    async fn update(&self, painting: &Painting) -> Result<(), Error> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE paintings SET title = ?2, category = ?3, address = ?4, image_url = ?5, \
             lent_to = ?6, lent_email = ?7, lent_phone = ?8, lent_date = ?9, due_date = ?10, \
             modified_by = ?11, modified_at = ?12 \
             WHERE id = ?1",
            params![
                painting.id.0,
                painting.title,
                painting.category,
                painting.address,
                painting.image_url,
                painting.borrower_name,
                painting.borrower_email,
                painting.borrower_phone,
                painting.lent_date,
                painting.due_date,
                painting.modified_by,
                format_timestamp(painting.modified_at),
            ],
        )?;

        if changed == 0 {
            return Err(Error::not_found(format!("painting {}", painting.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: PaintingId) -> Result<bool, Error> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM paintings WHERE id = ?1", params![id.0])?;
        Ok(changed > 0)
    }

    fn store_name(&self) -> &'static str {
        "sqlite"
    }
}

/// Factory for the `sqlite` store type
///
/// Expects the serialized `StoreConfig::Sqlite` value, i.e. `{"type": "sqlite", "path": "..."}`.
pub struct SqliteItemStoreFactory;

impl ItemStoreFactory for SqliteItemStoreFactory {
    fn create(&self, config: &serde_json::Value) -> Result<Box<dyn ItemStore>, Error> {
        let path = config["path"]
            .as_str()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| Error::config("SQLite store requires a non-empty path"))?;
        Ok(Box::new(SqliteItemStore::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaintingDraft;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn painting(draft: PaintingDraft) -> Painting {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        Painting::from_draft(PaintingId(0), draft, "admin", at)
    }

    #[tokio::test]
    async fn test_sqlite_store_round_trip_persists_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("database.sqlite");

        let store = SqliteItemStore::open(&path).unwrap();
        let stored = store
            .insert(&painting(
                PaintingDraft::new("Harbour at Dusk")
                    .lent_to("Ann", "ann@example.com")
                    .with_phone("+31 6 1234")
                    .with_due_date("2025-06-01"),
            ))
            .await
            .unwrap();
        assert_eq!(stored.id, PaintingId(1));
        drop(store);

        let reopened = SqliteItemStore::open(&path).unwrap();
        let fetched = reopened.get(stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn test_sqlite_store_lent_filter() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        store.insert(&painting(PaintingDraft::new("Available"))).await.unwrap();
        store
            .insert(&painting(PaintingDraft::new("Lent").lent_to("Ann", "ann@example.com")))
            .await
            .unwrap();
        let mut blank_email = painting(PaintingDraft::new("Blank email"));
        blank_email.borrower_name = Some("Bob".to_string());
        blank_email.borrower_email = Some(String::new());
        store.insert(&blank_email).await.unwrap();

        let lent = store.list_lent_items().await.unwrap();
        assert_eq!(lent.len(), 1);
        assert_eq!(lent[0].title, "Lent");
    }

    #[tokio::test]
    async fn test_sqlite_store_update_and_delete() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let mut stored = store.insert(&painting(PaintingDraft::new("Dunes"))).await.unwrap();

        stored.title = "Dunes at Noon".to_string();
        store.update(&stored).await.unwrap();
        assert_eq!(store.get(stored.id).await.unwrap().unwrap().title, "Dunes at Noon");

        assert!(store.delete(stored.id).await.unwrap());
        assert!(store.get(stored.id).await.unwrap().is_none());
        assert!(matches!(store.update(&stored).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sqlite_store_migrates_legacy_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE paintings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT,
                    artist TEXT,
                    category TEXT,
                    lent_to TEXT,
                    due_date TEXT
                );
                INSERT INTO paintings (title, artist, lent_to, due_date)
                VALUES ('Old Mill', 'Unknown', 'Ann', '2025-01-10');",
            )
            .unwrap();
        }

        let store = SqliteItemStore::open(&path).unwrap();
        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Old Mill");
        assert!(all[0].borrower_email.is_none());
        assert!(!all[0].is_lent());

        // Opening again must not try to add the columns twice
        drop(store);
        assert!(SqliteItemStore::open(&path).is_ok());
    }

    #[tokio::test]
    async fn test_sqlite_store_keeps_creation_audit_on_update() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        store
            .lock()
            .unwrap()
            .execute_batch(
                "INSERT INTO paintings (title, created_by, created_at, modified_by, modified_at)
                 VALUES ('Old Mill', 'founder', '2024-05-01 10:00:00', 'founder', '2024-05-01 10:00:00');",
            )
            .unwrap();

        let mut stored = store.get(PaintingId(1)).await.unwrap().unwrap();
        let legacy = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(stored.created_at, Some(legacy));
        assert_eq!(stored.modified_at, Some(legacy));

        stored.title = "Old Mill, restored".to_string();
        stored.created_by = None;
        stored.created_at = None;
        stored.modified_by = Some("curator".to_string());
        stored.modified_at = Some(Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap());
        store.update(&stored).await.unwrap();

        let (created_by, created_at): (Option<String>, Option<String>) = store
            .lock()
            .unwrap()
            .query_row(
                "SELECT created_by, created_at FROM paintings WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(created_by.as_deref(), Some("founder"));
        assert_eq!(created_at.as_deref(), Some("2024-05-01 10:00:00"));

        let reread = store.get(PaintingId(1)).await.unwrap().unwrap();
        assert_eq!(reread.title, "Old Mill, restored");
        assert_eq!(reread.modified_by.as_deref(), Some("curator"));
    }

    #[test]
    fn test_open_reports_unusable_directory_as_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = SqliteItemStore::open(blocker.join("nested").join("db.sqlite")).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "got {:?}", err);
    }

    #[test]
    fn test_factory_requires_path() {
        let config = serde_json::json!({ "type": "sqlite" });
        assert!(SqliteItemStoreFactory.create(&config).is_err());
    }
}
