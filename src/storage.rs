//! Key-value persistence boundary.
//!
//! Every persisted value is a JSON-encoded string under an `indra-netra-*`
//! key: per-field settings keys plus two bulk keys (detection log, stream
//! list). The durable store is a single SQLite `kv` table in WAL mode with
//! eager writes; an in-memory store backs tests and ephemeral runs.

use std::collections::BTreeMap;

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::PipelineError;

/// Namespace prefix for every key this application owns.
pub const KEY_PREFIX: &str = "indra-netra";
/// Bulk key holding the JSON-encoded detection log.
pub const DETECTIONS_KEY: &str = "indra-netra-detections";
/// Bulk key holding the JSON-encoded surveillance stream list.
pub const STREAMS_KEY: &str = "indra-netra-streams";

/// String-keyed, JSON-valued persistence capability.
pub trait KvStore: Send {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&mut self, key: &str) -> Result<()>;
    /// Keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Total byte size of all values under `KEY_PREFIX`.
pub fn storage_usage(store: &dyn KvStore) -> Result<u64> {
    let mut total = 0u64;
    for key in store.keys_with_prefix(KEY_PREFIX)? {
        if let Some(value) = store.get_item(&key)? {
            total += value.len() as u64;
        }
    }
    Ok(total)
}

// ----------------------------------------------------------------------------
// SQLite store
// ----------------------------------------------------------------------------

/// Durable store over a single `kv` table. Writes are eager; every mutation
/// hits the database immediately.
pub struct SqliteKvStore {
    conn: Connection,
}

impl SqliteKvStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS kv (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl KvStore for SqliteKvStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv(key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key")?;
        let mut rows = stmt.query(params![pattern])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }
}

// ----------------------------------------------------------------------------
// In-memory store
// ----------------------------------------------------------------------------

/// In-memory store for tests and ephemeral runs.
///
/// An optional byte quota makes writes fail with `StorageQuotaError` once the
/// total stored value size would exceed it, mirroring a full durable store.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    items: BTreeMap<String, String>,
    quota_bytes: Option<u64>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            items: BTreeMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn stored_bytes_excluding(&self, key: &str) -> u64 {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len() as u64)
            .sum()
    }
}

impl KvStore for InMemoryKvStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota_bytes {
            let projected = self.stored_bytes_excluding(key) + value.len() as u64;
            if projected > quota {
                return Err(PipelineError::storage_quota(format!(
                    "write of {} bytes to '{}' exceeds quota of {} bytes",
                    value.len(),
                    key,
                    quota
                ))
                .into());
            }
        }
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .items
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
