//! Dart-facing entry points generated through flutter_rust_bridge.
//!
//! # Responsibility
//! - Give the Flutter shell route decisions and device preferences.
//! - Report failures as message strings or a small response envelope.
//!
//! # Invariants
//! - Nothing here panics into Dart; every failure becomes a message.

use hearth_core::{
    core_version as core_version_inner, decide, init_logging as init_logging_inner,
    ping as ping_inner, GuardInput, HomeSurface, PreferenceResult, Preferences, RouteGroup,
    SqlitePreferenceStore, Theme,
};
use hearth_core::preferences::{CURRENCY_KEY, HIDE_BALANCES_KEY, THEME_KEY};
use log::warn;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

const PREFS_DB_FILE_NAME: &str = "hearth_prefs.sqlite3";
static PREFS_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Liveness probe for the bridge; always `"pong"`.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Starts core file logging. Returns an empty string on success, otherwise
/// the reason it could not start. Repeating the same call is harmless.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Redirect the shell should perform for the given session snapshot.
///
/// Returns `None` when the current screen may stay. The caller owns the
/// quiet-period debounce; this only applies the redirect rules.
#[flutter_rust_bridge::frb(sync)]
pub fn resolve_route(
    settled: bool,
    is_authenticated: bool,
    has_family: bool,
    current_path: String,
    wide_surface: bool,
) -> Option<String> {
    let input = GuardInput {
        settled,
        is_authenticated,
        has_family,
        current_group: RouteGroup::of_path(&current_path),
    };
    let surface = if wide_surface {
        HomeSurface::Wide
    } else {
        HomeSurface::Narrow
    };
    decide(&input).map(|target| target.path(surface).to_string())
}

/// Result envelope for preference calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceResponse {
    pub ok: bool,
    /// Effective value after defaults; `None` on failure.
    pub value: Option<String>,
    pub message: String,
}

impl PreferenceResponse {
    fn success(value: String) -> Self {
        Self {
            ok: true,
            value: Some(value),
            message: String::new(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: None,
            message: message.into(),
        }
    }
}

/// Reads `theme`, `currency` or `hide_balances`, falling back to defaults.
#[flutter_rust_bridge::frb(sync)]
pub fn preference_get(key: String) -> PreferenceResponse {
    respond("preference_get", &resolve_prefs_db_path(), |prefs| read_known(prefs, key.trim()))
}

/// Validates and stores one known preference; returns the stored value.
#[flutter_rust_bridge::frb(sync)]
pub fn preference_set(key: String, value: String) -> PreferenceResponse {
    respond("preference_set", &resolve_prefs_db_path(), |prefs| {
        write_known(prefs, key.trim(), value.trim())?;
        read_known(prefs, key.trim())
    })
}

fn respond(
    op: &'static str,
    db_path: &Path,
    f: impl FnOnce(&Preferences) -> Result<String, String>,
) -> PreferenceResponse {
    let prefs = match SqlitePreferenceStore::open(db_path) {
        Ok(store) => Preferences::new(Arc::new(store)),
        Err(err) => {
            warn!("event={op} module=prefs status=error error_code={}", err.code());
            return PreferenceResponse::failure(format!("{op} failed: {err}"));
        }
    };
    match f(&prefs) {
        Ok(value) => PreferenceResponse::success(value),
        Err(message) => PreferenceResponse::failure(format!("{op} failed: {message}")),
    }
}

fn read_known(prefs: &Preferences, key: &str) -> Result<String, String> {
    let value = match key {
        THEME_KEY => prefs.theme().map(|theme| theme.as_str().to_string()),
        CURRENCY_KEY => prefs.currency(),
        HIDE_BALANCES_KEY => prefs.hide_balances().map(|hide| hide.to_string()),
        other => return Err(format!("unknown preference `{other}`")),
    };
    value.map_err(|err| err.to_string())
}

fn write_known(prefs: &Preferences, key: &str, value: &str) -> Result<(), String> {
    let result: PreferenceResult<()> = match key {
        THEME_KEY => {
            let theme = Theme::parse(value)
                .ok_or_else(|| format!("unsupported theme `{value}`; expected light|dark|system"))?;
            prefs.set_theme(theme)
        }
        CURRENCY_KEY => prefs.set_currency(value),
        HIDE_BALANCES_KEY => {
            let hide = value
                .parse::<bool>()
                .map_err(|_| format!("expected true|false, got `{value}`"))?;
            prefs.set_hide_balances(hide)
        }
        other => return Err(format!("unknown preference `{other}`")),
    };
    result.map_err(|err| err.to_string())
}

fn resolve_prefs_db_path() -> PathBuf {
    PREFS_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("HEARTH_PREFS_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(PREFS_DB_FILE_NAME)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::{core_version, init_logging, ping, read_known, resolve_route, respond, write_known};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn resolve_route_applies_redirect_rules() {
        assert_eq!(
            resolve_route(true, false, true, "/home".to_string(), false).as_deref(),
            Some("/auth/login")
        );
        assert_eq!(
            resolve_route(true, true, false, "/tasks".to_string(), false).as_deref(),
            Some("/auth/family-setup")
        );
        assert_eq!(
            resolve_route(true, true, true, "/auth/login".to_string(), true).as_deref(),
            Some("/web/home")
        );
        assert_eq!(resolve_route(false, false, false, "/home".to_string(), false), None);
        assert_eq!(resolve_route(true, true, true, String::new(), false), None);
    }

    #[test]
    fn preferences_round_trip_through_file_db() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let db_path = dir.path().join("prefs.sqlite3");

        let initial = respond("preference_get", &db_path, |prefs| read_known(prefs, "currency"));
        assert_eq!(initial.value.as_deref(), Some("USD"));

        let stored = respond("preference_set", &db_path, |prefs| {
            write_known(prefs, "theme", "Dark")?;
            read_known(prefs, "theme")
        });
        assert!(stored.ok, "{}", stored.message);
        assert_eq!(stored.value.as_deref(), Some("dark"));

        let rejected = respond("preference_set", &db_path, |prefs| {
            write_known(prefs, "hide_balances", "maybe")?;
            read_known(prefs, "hide_balances")
        });
        assert!(!rejected.ok);
        assert!(rejected.message.contains("true|false"));

        let unknown = respond("preference_get", &db_path, |prefs| read_known(prefs, "font"));
        assert!(unknown.message.contains("unknown preference"));
    }
}
