use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::abi::normalize_hex_key;
use crate::domain::decoder::DecodeContext;

/// Address labels shown in place of raw addresses
///
/// Keys are stored as lowercase `0x` addresses, the form
/// [`DecodeContext::label_for`] looks them up in.
#[derive(Debug)]
pub struct LabelStore {
    conn: Connection,
}

impl LabelStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("open db {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory().context("open in-memory db")?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS labels (
                address TEXT PRIMARY KEY,
                label   TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    pub fn load_all(&self) -> Result<BTreeMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT address, label FROM labels ORDER BY address")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut out = BTreeMap::new();
        for row in rows {
            let (address, label) = row?;
            out.insert(address, label);
        }
        Ok(out)
    }

    /// Fresh decode context carrying every stored label
    pub fn context(&self) -> Result<DecodeContext> {
        Ok(DecodeContext::new(Arc::new(self.load_all()?)))
    }

    pub fn get_label(&self, address: &str) -> Result<Option<String>> {
        let label = self
            .conn
            .query_row(
                "SELECT label FROM labels WHERE address = ?1",
                params![normalize_hex_key(address)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(label)
    }

    pub fn set_label(&self, address: &str, label: &str) -> Result<()> {
        let key = checked_address(address)?;
        let label = label.trim();
        if label.is_empty() {
            bail!("label for {} is empty", key);
        }
        self.conn.execute(
            "INSERT INTO labels(address, label) VALUES (?1, ?2)
             ON CONFLICT(address) DO UPDATE SET label=excluded.label",
            params![key, label],
        )?;
        Ok(())
    }

    /// Returns whether a label was removed
    pub fn remove_label(&self, address: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM labels WHERE address = ?1",
            params![normalize_hex_key(address)],
        )?;
        Ok(removed > 0)
    }
}

fn checked_address(address: &str) -> Result<String> {
    let key = normalize_hex_key(address);
    let digits = &key[2..];
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("'{}' is not a 20-byte hex address", address.trim());
    }
    Ok(key)
}
