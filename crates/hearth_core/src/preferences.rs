//! Device-local preferences backed by SQLite.
//!
//! # Responsibility
//! - Persist small key/value settings that never sync between devices.
//! - Expose typed accessors with defaults for the known keys.
//!
//! # Invariants
//! - Stored values are validated on write; an unreadable stored value falls
//!   back to the key's default on read.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::record::now_epoch_ms;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const THEME_KEY: &str = "theme";
pub const CURRENCY_KEY: &str = "currency";
pub const HIDE_BALANCES_KEY: &str = "hide_balances";

const DEFAULT_CURRENCY: &str = "USD";

static CURRENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid currency regex"));

pub type PreferenceResult<T> = Result<T, PreferenceError>;

#[derive(Debug)]
pub enum PreferenceError {
    Db(DbError),
    InvalidKey,
    InvalidValue { key: &'static str, reason: String },
}

impl PreferenceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Db(err) => err.code(),
            Self::InvalidKey => "prefs_invalid_key",
            Self::InvalidValue { .. } => "prefs_invalid_value",
        }
    }
}

impl Display for PreferenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidKey => write!(f, "preference key cannot be empty"),
            Self::InvalidValue { key, reason } => write!(f, "invalid `{key}`: {reason}"),
        }
    }
}

impl Error for PreferenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidKey | Self::InvalidValue { .. } => None,
        }
    }
}

impl From<DbError> for PreferenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PreferenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::from(value))
    }
}

/// Raw key/value persistence.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> PreferenceResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PreferenceResult<()>;
}

pub struct SqlitePreferenceStore {
    conn: Mutex<Connection>,
}

impl SqlitePreferenceStore {
    pub fn open(path: impl AsRef<Path>) -> PreferenceResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn in_memory() -> PreferenceResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn get(&self, key: &str) -> PreferenceResult<Option<String>> {
        let key = require_key(key)?;
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1;",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> PreferenceResult<()> {
        let key = require_key(key)?;
        self.conn().execute(
            "INSERT INTO preferences (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value, now_epoch_ms()],
        )?;
        debug!("event=prefs_set module=prefs status=ok key={key}");
        Ok(())
    }
}

fn require_key(key: &str) -> PreferenceResult<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(PreferenceError::InvalidKey);
    }
    Ok(key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// Typed accessors over a [`PreferenceStore`].
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn theme(&self) -> PreferenceResult<Theme> {
        Ok(self
            .read(THEME_KEY, Theme::parse)?
            .unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> PreferenceResult<()> {
        self.store.set(THEME_KEY, theme.as_str())
    }

    /// ISO-4217 style code; `USD` until one is stored.
    pub fn currency(&self) -> PreferenceResult<String> {
        Ok(self
            .read(CURRENCY_KEY, normalize_currency)?
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
    }

    pub fn set_currency(&self, code: &str) -> PreferenceResult<()> {
        let Some(code) = normalize_currency(code) else {
            return Err(PreferenceError::InvalidValue {
                key: CURRENCY_KEY,
                reason: "expected a three-letter currency code".to_string(),
            });
        };
        self.store.set(CURRENCY_KEY, &code)
    }

    /// Whether money amounts are masked on screen.
    pub fn hide_balances(&self) -> PreferenceResult<bool> {
        Ok(self
            .read(HIDE_BALANCES_KEY, |value| value.parse::<bool>().ok())?
            .unwrap_or(false))
    }

    pub fn set_hide_balances(&self, hide: bool) -> PreferenceResult<()> {
        self.store
            .set(HIDE_BALANCES_KEY, if hide { "true" } else { "false" })
    }

    fn read<V>(&self, key: &'static str, parse: impl Fn(&str) -> Option<V>) -> PreferenceResult<Option<V>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        let parsed = parse(&raw);
        if parsed.is_none() {
            warn!("event=prefs_get module=prefs status=error key={key} error_code=prefs_unreadable");
        }
        Ok(parsed)
    }
}

fn normalize_currency(value: &str) -> Option<String> {
    let code = value.trim().to_ascii_uppercase();
    CURRENCY_RE.is_match(&code).then_some(code)
}
