//! Persistent store for selector lookups

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

/// SQLite-backed selector -> signatures store
///
/// A selector row in `selector_lookups` records that it was looked up at
/// all, so an empty signature list survives a restart as "not found"
/// rather than "never looked up".
#[derive(Debug)]
pub struct SelectorStore {
    conn: Connection,
}

impl SelectorStore {
    /// Open or create the cache database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("open db {}", path.display()))?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Open a store that lives only as long as the process
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory db")?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS selector_lookups (
                selector    TEXT PRIMARY KEY,
                created_at  INTEGER DEFAULT (strftime('%s', 'now'))
            );

            CREATE TABLE IF NOT EXISTS selector_signatures (
                selector    TEXT NOT NULL,
                position    INTEGER NOT NULL,
                signature   TEXT NOT NULL,
                PRIMARY KEY (selector, position)
            );
            ",
        )?;
        Ok(())
    }

    /// Replace the stored signatures for a selector (empty list allowed)
    pub fn save(&mut self, selector: &str, signatures: &[String]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO selector_lookups(selector) VALUES (?1)
             ON CONFLICT(selector) DO UPDATE SET created_at = strftime('%s', 'now')",
            params![selector],
        )?;
        tx.execute(
            "DELETE FROM selector_signatures WHERE selector = ?1",
            params![selector],
        )?;
        for (position, signature) in signatures.iter().enumerate() {
            tx.execute(
                "INSERT INTO selector_signatures(selector, position, signature) VALUES (?1, ?2, ?3)",
                params![selector, position as i64, signature],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Load every looked-up selector with its ordered signatures
    pub fn load_all(&self) -> Result<HashMap<String, Vec<String>>> {
        let mut out: HashMap<String, Vec<String>> = HashMap::new();

        let mut stmt = self.conn.prepare("SELECT selector FROM selector_lookups")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            out.insert(row.get(0)?, Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT selector, signature FROM selector_signatures ORDER BY selector, position",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let selector: String = row.get(0)?;
            let signature: String = row.get(1)?;
            out.entry(selector).or_default().push(signature);
        }

        Ok(out)
    }

    /// Remove lookups older than `max_age_days`
    pub fn cleanup_old_entries(&mut self, max_age_days: u32) -> Result<usize> {
        let cutoff = max_age_days as i64 * 24 * 60 * 60;
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM selector_signatures WHERE selector IN (
                SELECT selector FROM selector_lookups WHERE created_at < (strftime('%s', 'now') - ?1)
             )",
            params![cutoff],
        )?;
        let deleted = tx.execute(
            "DELETE FROM selector_lookups WHERE created_at < (strftime('%s', 'now') - ?1)",
            params![cutoff],
        )?;
        tx.commit()?;
        Ok(deleted)
    }
}
