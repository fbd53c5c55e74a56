use crate::types::{DocumentRecord, ProfileRecord};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::Mutex;

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn new(db_path: PathBuf) -> Result<Self, String> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let conn = Connection::open(&db_path).map_err(|e| e.to_string())?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO schema_version (version) SELECT 1 WHERE NOT EXISTS (SELECT 1 FROM schema_version LIMIT 1);
            CREATE TABLE IF NOT EXISTS profile (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                processed_at TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| e.to_string())?;

        Ok(Db {
            conn: Mutex::new(conn),
        })
    }

    /// Replace the stored profile with the given record (single active
    /// profile; a save always writes the whole record).
    pub fn save_profile(&self, record: &ProfileRecord) -> Result<(), String> {
        let mut conn = self.conn.lock().map_err(|e| e.to_string())?;
        let tx = conn.transaction().map_err(|e| e.to_string())?;
        tx.execute("DELETE FROM profile", [])
            .map_err(|e| e.to_string())?;
        for (key, value) in record {
            tx.execute(
                "INSERT INTO profile (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| e.to_string())?;
        }
        tx.commit().map_err(|e| e.to_string())
    }

    pub fn load_profile(&self) -> Result<ProfileRecord, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM profile")
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| e.to_string())?;
        let mut record = ProfileRecord::new();
        for row in rows {
            let (key, value) = row.map_err(|e| e.to_string())?;
            record.insert(key, value);
        }
        Ok(record)
    }

    pub fn clear_profile(&self) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM profile", [])
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// True iff a record exists and has at least one key.
    pub fn has_profile(&self) -> Result<bool, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM profile", [], |row| row.get(0))
            .map_err(|e| e.to_string())?;
        Ok(count > 0)
    }

    /// Record a successfully processed document in local history.
    pub fn add_document(&self, filename: &str) -> Result<i64, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let processed_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        conn.execute(
            "INSERT INTO documents (filename, processed_at) VALUES (?1, ?2)",
            params![filename, processed_at],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn recent_documents(&self, limit: usize) -> Result<Vec<DocumentRecord>, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare("SELECT id, filename, processed_at FROM documents ORDER BY id DESC LIMIT ?1")
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(DocumentRecord {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    processed_at: row.get(2)?,
                })
            })
            .map_err(|e| e.to_string())?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| e.to_string())?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (tempfile::TempDir, Db) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Db::new(dir.path().join("test.db")).expect("open db");
        (dir, db)
    }

    fn sample_record() -> ProfileRecord {
        let mut record = ProfileRecord::new();
        record.insert("full_name".into(), "Juan dela Cruz".into());
        record.insert("email".into(), "juan@example.com".into());
        record.insert("phone".into(), "09171234567".into());
        record.insert("address".into(), "Quezon City".into());
        record
    }

    #[test]
    fn empty_store_has_no_profile() {
        let (_dir, db) = temp_db();
        assert!(!db.has_profile().unwrap());
        assert!(db.load_profile().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, db) = temp_db();
        let record = sample_record();
        db.save_profile(&record).unwrap();
        assert_eq!(db.load_profile().unwrap(), record);
        assert!(db.has_profile().unwrap());
    }

    #[test]
    fn save_replaces_previous_record() {
        let (_dir, db) = temp_db();
        db.save_profile(&sample_record()).unwrap();
        let mut smaller = ProfileRecord::new();
        smaller.insert("full_name".into(), "Maria Santos".into());
        db.save_profile(&smaller).unwrap();
        assert_eq!(db.load_profile().unwrap(), smaller);
    }

    #[test]
    fn clear_removes_the_record() {
        let (_dir, db) = temp_db();
        db.save_profile(&sample_record()).unwrap();
        db.clear_profile().unwrap();
        assert!(!db.has_profile().unwrap());
        assert!(db.load_profile().unwrap().is_empty());
    }

    #[test]
    fn document_history_is_newest_first() {
        let (_dir, db) = temp_db();
        db.add_document("form_a.pdf").unwrap();
        db.add_document("form_b.png").unwrap();
        let docs = db.recent_documents(10).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].filename, "form_b.png");
        assert_eq!(docs[1].filename, "form_a.pdf");
    }
}
