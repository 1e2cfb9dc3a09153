// 💾 Storage - flat key-value persistence for the subscription list
//
// Two keys, both plain text:
//   "subscriptions"  → JSON array of subscriptions
//   "selectedTheme"  → "system" | "light" | "dark"
//
// Reads never fail: missing or undecodable data comes back as an empty list /
// default settings. Writes return a Result that the book logs and drops.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::settings::{Settings, Theme};
use crate::subscription::Subscription;

pub const SUBSCRIPTIONS_KEY: &str = "subscriptions";
pub const THEME_KEY: &str = "selectedTheme";

/// Boundary between the book and whatever keeps its data between runs
pub trait SubscriptionStore {
    /// Stored subscriptions, or an empty list if there are none or they cannot be decoded
    fn load(&self) -> Vec<Subscription>;

    /// Replace the stored list
    fn save(&mut self, subscriptions: &[Subscription]) -> Result<()>;

    fn load_settings(&self) -> Settings;

    fn save_settings(&mut self, settings: &Settings) -> Result<()>;
}

/// Decode a stored subscription list, falling back to empty
pub fn decode_subscriptions(raw: &str) -> Vec<Subscription> {
    match serde_json::from_str::<Vec<Subscription>>(raw) {
        Ok(subscriptions) => subscriptions,
        Err(e) => {
            tracing::warn!(error = %e, "stored subscriptions are undecodable, starting empty");
            Vec::new()
        }
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        setup_database(&conn)?;
        tracing::debug!(path = %path.display(), "opened subscription store");

        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    fn get_value(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_value(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Raw stored text for `key` (diagnostics and tests)
    pub fn raw_value(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL keeps the file consistent if the process dies mid-write
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

impl SubscriptionStore for SqliteStore {
    fn load(&self) -> Vec<Subscription> {
        match self.get_value(SUBSCRIPTIONS_KEY) {
            Ok(Some(raw)) => decode_subscriptions(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read subscriptions, starting empty");
                Vec::new()
            }
        }
    }

    fn save(&mut self, subscriptions: &[Subscription]) -> Result<()> {
        let encoded =
            serde_json::to_string(subscriptions).context("Failed to encode subscriptions")?;
        self.put_value(SUBSCRIPTIONS_KEY, &encoded)
            .context("Failed to write subscriptions")?;
        tracing::debug!(count = subscriptions.len(), "saved subscriptions");
        Ok(())
    }

    fn load_settings(&self) -> Settings {
        match self.get_value(THEME_KEY) {
            Ok(Some(raw)) => Settings::with_theme(Theme::from(raw)),
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read settings, using defaults");
                Settings::default()
            }
        }
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        self.put_value(THEME_KEY, settings.selected_theme.as_str())
            .context("Failed to write settings")
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-process store. Keeps the same encoded text a real store would, so
/// malformed data can be seeded and inspected.
#[derive(Debug, Default)]
pub struct MemoryStore {
    subscriptions: Option<String>,
    theme: Option<String>,
    fail_saves: bool,
    save_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Store pre-seeded with raw subscription text
    pub fn with_raw(raw: &str) -> Self {
        MemoryStore {
            subscriptions: Some(raw.to_string()),
            ..MemoryStore::default()
        }
    }

    /// Store whose every save fails
    pub fn failing() -> Self {
        MemoryStore {
            fail_saves: true,
            ..MemoryStore::default()
        }
    }

    pub fn raw_subscriptions(&self) -> Option<&str> {
        self.subscriptions.as_deref()
    }

    /// Number of successful subscription saves
    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl SubscriptionStore for MemoryStore {
    fn load(&self) -> Vec<Subscription> {
        self.subscriptions
            .as_deref()
            .map(decode_subscriptions)
            .unwrap_or_default()
    }

    fn save(&mut self, subscriptions: &[Subscription]) -> Result<()> {
        if self.fail_saves {
            anyhow::bail!("memory store is read-only");
        }
        self.subscriptions = Some(serde_json::to_string(subscriptions)?);
        self.save_count += 1;
        Ok(())
    }

    fn load_settings(&self) -> Settings {
        self.theme
            .clone()
            .map(|raw| Settings::with_theme(Theme::from(raw)))
            .unwrap_or_default()
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        if self.fail_saves {
            anyhow::bail!("memory store is read-only");
        }
        self.theme = Some(settings.selected_theme.as_str().to_string());
        Ok(())
    }
}
