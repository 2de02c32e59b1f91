use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

#[cfg(test)]
pub mod memory;

/// The four independently persisted collections. Each is stored as one JSON
/// document and rewritten whole whenever its in-memory counterpart changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    CurrentUser,
    Profiles,
    Teams,
    Entries,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::CurrentUser => "current_user",
            StoreKey::Profiles => "profiles",
            StoreKey::Teams => "teams",
            StoreKey::Entries => "entries",
        }
    }
}

/// Persistence seam: the app talks to this trait, production uses SQLite,
/// tests use an in-memory map.
pub trait StateStore: Send {
    fn load(&self, key: StoreKey) -> Result<Option<String>>;
    fn save(&self, key: StoreKey, json: &str) -> Result<()>;
    fn get_setting(&self, key: &str) -> Result<Option<String>>;
    fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut store = SqliteStore { conn };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        let migrations = vec![(
            "001_create_store.sql",
            include_str!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/migrations/001_create_store.sql"
            )),
        )];

        for (name, sql) in migrations {
            let applied: Option<String> = self
                .conn
                .query_row(
                    "SELECT name FROM schema_migrations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                let tx = self.conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }
}

impl StateStore for SqliteStore {
    fn load(&self, key: StoreKey) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM store WHERE key = ?1")?;
        let value = stmt
            .query_row(params![key.as_str()], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn save(&self, key: StoreKey, json: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key.as_str(), json],
        )?;
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM settings WHERE key = ?1")?;
        let value = stmt.query_row(params![key], |row| row.get(0)).optional()?;
        Ok(value)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }
}
