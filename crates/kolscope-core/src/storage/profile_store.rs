use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{CoreError, Result};
use crate::models::{CanonicalRecord, KolSummary};

/// SQLite-backed profile index.
///
/// The full record is kept as a JSON document; a few summary columns are
/// denormalized next to it for listing. Writes are keyed by subject name and
/// replace the previous row wholesale.
pub struct ProfileStore {
    conn: Mutex<Connection>,
}

impl ProfileStore {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CoreError::LockPoisoned)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS kol_profiles (
                name       TEXT PRIMARY KEY COLLATE NOCASE,
                full_name  TEXT,
                title      TEXT,
                email      TEXT,
                phone      TEXT,
                country    TEXT,
                image_url  TEXT,
                document   TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_kol_profiles_full_name ON kol_profiles(full_name);
            ",
        )?;
        Ok(())
    }

    // ─── Writes ─────────────────────────────────────────────

    /// Insert or fully replace the profile stored under `record.name`.
    pub fn upsert(&self, record: &CanonicalRecord) -> Result<()> {
        let name = record.name.trim();
        if name.is_empty() {
            return Err(CoreError::ValidationError(
                "profile name must not be empty".to_string(),
            ));
        }
        let document = record.to_document()?;

        self.conn()?.execute(
            "INSERT INTO kol_profiles
                (name, full_name, title, email, phone, country, image_url, document, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(name) DO UPDATE SET
                full_name  = excluded.full_name,
                title      = excluded.title,
                email      = excluded.email,
                phone      = excluded.phone,
                country    = excluded.country,
                image_url  = excluded.image_url,
                document   = excluded.document,
                updated_at = excluded.updated_at",
            params![
                name,
                record.full_name,
                record.title,
                record.email,
                record.phone,
                record.country,
                record.image_url,
                document,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete a profile.
    pub fn delete(&self, name: &str) -> Result<()> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM kol_profiles WHERE name = ?1", params![name.trim()])?;
        if deleted == 0 {
            return Err(CoreError::ProfileNotFound(name.to_string()));
        }
        Ok(())
    }

    // ─── Reads ──────────────────────────────────────────────

    /// Look a profile up by subject name, falling back to the generated full name.
    pub fn get(&self, name: &str) -> Result<Option<CanonicalRecord>> {
        let name = name.trim();
        let conn = self.conn()?;
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM kol_profiles
                 WHERE name = ?1 OR full_name = ?1 COLLATE NOCASE
                 ORDER BY name = ?1 DESC
                 LIMIT 1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        document
            .map(|doc| serde_json::from_str(&doc).map_err(CoreError::from))
            .transpose()
    }

    /// Listing view, most recently updated first.
    pub fn list_summaries(&self, limit: usize) -> Result<Vec<KolSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT full_name, title, phone, email, country, image_url
             FROM kol_profiles ORDER BY updated_at DESC, name ASC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(KolSummary::from_columns(
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Count stored profiles.
    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn()?
                .query_row("SELECT COUNT(*) FROM kol_profiles", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_record(name: &str) -> CanonicalRecord {
        let mut record = CanonicalRecord::new(name);
        record.full_name = Some(format!("Dr. {name}"));
        record.title = Some("Professor".to_string());
        record.country = Some("USA".to_string());
        record.research = vec!["title: Title X -- 2020".to_string()];
        record
    }

    #[test]
    fn test_open_in_memory() {
        let store = ProfileStore::open_in_memory().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_upsert_and_get() {
        let store = ProfileStore::open_in_memory().unwrap();
        let record = make_record("Alan Paul Venook");
        store.upsert(&record).unwrap();

        let loaded = store.get("Alan Paul Venook").unwrap().unwrap();
        assert_eq!(loaded, record);

        let by_full_name = store.get("Dr. Alan Paul Venook").unwrap().unwrap();
        assert_eq!(by_full_name.name, "Alan Paul Venook");
    }

    #[test]
    fn test_upsert_replaces_instead_of_merging() {
        let store = ProfileStore::open_in_memory().unwrap();
        let mut first = make_record("Jane Roe");
        first.extra.insert("stale".into(), json!("old value"));
        store.upsert(&first).unwrap();

        let second = make_record("Jane Roe");
        store.upsert(&second).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let loaded = store.get("jane roe").unwrap().unwrap();
        assert!(loaded.extra.get("stale").is_none());
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = ProfileStore::open_in_memory().unwrap();
        assert!(store.get("Nobody").unwrap().is_none());
    }

    #[test]
    fn test_list_summaries() {
        let store = ProfileStore::open_in_memory().unwrap();
        store.upsert(&make_record("A")).unwrap();
        store.upsert(&CanonicalRecord::new("B")).unwrap();

        let all = store.list_summaries(100).unwrap();
        assert_eq!(all.len(), 2);
        let bare = all.iter().find(|s| s.full_name == "Unknown").unwrap();
        assert_eq!(bare.email, "Not Available");
        assert_eq!(bare.image_url, "Not Available");

        assert_eq!(store.list_summaries(1).unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_empty_name() {
        let store = ProfileStore::open_in_memory().unwrap();
        let err = store.upsert(&CanonicalRecord::new("  ")).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn test_delete() {
        let store = ProfileStore::open_in_memory().unwrap();
        store.upsert(&make_record("Gone")).unwrap();
        store.delete("Gone").unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.delete("Gone").is_err());
    }
}
