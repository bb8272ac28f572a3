//! SQLite database implementation for persistent storage

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, error, info};

use crate::core::{Library, LibraryRepository, Profile, ProfileRepository, Settings};

/// File name of the database inside the data directory
pub const DATABASE_FILE: &str = "ahk-manager.db";

/// Database wrapper for SQLite operations
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database in `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(DATABASE_FILE);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        info!("Database opened at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Throwaway database that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Database lock poisoned: {}", e))
    }

    /// Initialize database schema
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(
            r#"
            -- Settings table
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Libraries with their owned scripts
            CREATE TABLE IF NOT EXISTS libraries (
                path TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                data TEXT NOT NULL
            );

            -- Profiles with their script identifiers
            CREATE TABLE IF NOT EXISTS profiles (
                name TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                data TEXT NOT NULL
            );
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }

    // === Settings ===

    /// Load settings from database
    pub fn load_settings(&self) -> Result<Option<Settings>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = 'app_settings'")?;
        let result: Option<String> = stmt.query_row([], |row| row.get(0)).optional()?;

        match result {
            Some(json) => {
                let mut settings: Settings =
                    serde_json::from_str(&json).context("Failed to deserialize settings")?;
                settings.validate();
                Ok(Some(settings))
            }
            None => Ok(None),
        }
    }

    /// Save settings to database
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let conn = self.connection()?;
        let json = serde_json::to_string(settings)?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES ('app_settings', ?1)",
            params![json],
        )?;
        debug!("Settings saved");
        Ok(())
    }

    // === Repositories ===

    /// Replace both stored repositories in one transaction
    pub fn save_snapshot(
        &self,
        libraries: &LibraryRepository,
        profiles: &ProfileRepository,
    ) -> Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM libraries", [])?;
        for (position, library) in libraries.iter().enumerate() {
            let json = serde_json::to_string(library)
                .with_context(|| format!("Failed to serialize library {:?}", library.path))?;
            tx.execute(
                "INSERT INTO libraries (path, position, data) VALUES (?1, ?2, ?3)",
                params![
                    library.path.to_string_lossy().to_string(),
                    position as i64,
                    json
                ],
            )?;
        }

        tx.execute("DELETE FROM profiles", [])?;
        for (position, profile) in profiles.iter().enumerate() {
            let json = serde_json::to_string(profile)
                .with_context(|| format!("Failed to serialize profile {}", profile.name))?;
            tx.execute(
                "INSERT INTO profiles (name, position, data) VALUES (?1, ?2, ?3)",
                params![profile.name, position as i64, json],
            )?;
        }

        tx.commit()?;
        debug!(
            "Saved {} libraries and {} profiles",
            libraries.len(),
            profiles.len()
        );
        Ok(())
    }

    /// Load libraries in stored order, skipping rows that fail to deserialize
    pub fn load_libraries(&self) -> Result<LibraryRepository> {
        let rows = self.load_rows("SELECT data FROM libraries ORDER BY position")?;
        Ok(rows
            .iter()
            .filter_map(|json| match serde_json::from_str::<Library>(json) {
                Ok(library) => Some(library),
                Err(e) => {
                    error!("Failed to deserialize library: {}", e);
                    None
                }
            })
            .collect())
    }

    /// Load profiles in stored order, skipping rows that fail to deserialize
    pub fn load_profiles(&self) -> Result<ProfileRepository> {
        let rows = self.load_rows("SELECT data FROM profiles ORDER BY position")?;
        Ok(rows
            .iter()
            .filter_map(|json| match Profile::from_json(json) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    error!("Failed to deserialize profile: {}", e);
                    None
                }
            })
            .collect())
    }

    fn load_rows(&self, sql: &str) -> Result<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Script;

    fn database() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn settings_round_trip_and_validate() {
        let db = database();
        assert!(db.load_settings().unwrap().is_none());

        let settings = Settings {
            file_types: vec![".AHK".into(), "ah2".into()],
            ..Default::default()
        };
        db.save_settings(&settings).unwrap();
        let loaded = db.load_settings().unwrap().unwrap();
        assert_eq!(loaded.file_types, ["ahk", "ah2"]);
    }

    #[test]
    fn snapshot_preserves_order_and_contents() {
        let db = database();
        let mut second = Library::new("/b");
        second.add(Script::new("/b/x.ahk"));
        let libraries: LibraryRepository = [Library::new("/z"), second].into_iter().collect();
        let mut profile = Profile::new("work");
        profile.add("/b/x.ahk");
        let profiles: ProfileRepository = [Profile::new("zz"), profile].into_iter().collect();

        db.save_snapshot(&libraries, &profiles).unwrap();
        assert_eq!(db.load_libraries().unwrap(), libraries);
        assert_eq!(db.load_profiles().unwrap(), profiles);

        // a second save replaces rather than appends
        db.save_snapshot(&LibraryRepository::new(), &profiles).unwrap();
        assert!(db.load_libraries().unwrap().is_empty());
        assert_eq!(db.load_profiles().unwrap().len(), 2);
    }

    #[test]
    fn corrupt_rows_are_skipped() {
        let db = database();
        let profiles: ProfileRepository = [Profile::new("ok")].into_iter().collect();
        db.save_snapshot(&LibraryRepository::new(), &profiles).unwrap();
        db.connection()
            .unwrap()
            .execute(
                "INSERT INTO profiles (name, position, data) VALUES ('bad', 5, 'not json')",
                [],
            )
            .unwrap();

        let loaded = db.load_profiles().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.find("ok").is_some());
    }

    #[test]
    fn open_creates_file_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested");
        let db = Database::open(&data_dir).unwrap();
        db.initialize().unwrap();
        assert!(data_dir.join(DATABASE_FILE).is_file());
    }
}
