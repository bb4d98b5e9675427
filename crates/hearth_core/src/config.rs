//! Runtime configuration for the sync core.
//!
//! # Invariants
//! - `settle_interval` is always in `(0, 5s]`.
//! - Constructors normalize input and never panic.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_millis(250);
const MAX_SETTLE_INTERVAL: Duration = Duration::from_secs(5);

/// Which home destination the app group redirects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomeSurface {
    /// Phone-sized layout.
    #[default]
    Narrow,
    Wide,
}

impl HomeSurface {
    pub fn home_path(self) -> &'static str {
        match self {
            Self::Narrow => "/home",
            Self::Wide => "/web/home",
        }
    }

    /// Parses `narrow` / `wide`, case-insensitive.
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "narrow" | "mobile" => Ok(Self::Narrow),
            "wide" | "web" => Ok(Self::Wide),
            other => Err(format!(
                "unsupported home surface `{other}`; expected narrow|wide"
            )),
        }
    }
}

/// Minimum severity written to the log files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    /// `Debug` in debug builds, `Info` in release builds.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Info
        }
    }
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Case-insensitive; `warning` is accepted for `warn`.
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown log level `{other}`; use trace, debug, info, warn or error"
            )),
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Quiet period the route guard waits for before redirecting.
    pub settle_interval: Duration,
    pub home_surface: HomeSurface,
    pub log_level: LogLevel,
    /// Absolute directory for rolling log files; `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            settle_interval: DEFAULT_SETTLE_INTERVAL,
            home_surface: HomeSurface::default(),
            log_level: LogLevel::default(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    pub fn with_settle_interval(mut self, interval: Duration) -> Result<Self, String> {
        self.settle_interval = normalize_settle_interval(interval)?;
        Ok(self)
    }

    /// Same as [`CoreConfig::with_settle_interval`], taking milliseconds.
    pub fn with_settle_millis(self, millis: u64) -> Result<Self, String> {
        self.with_settle_interval(Duration::from_millis(millis))
    }

    pub fn with_home_surface(mut self, surface: HomeSurface) -> Self {
        self.home_surface = surface;
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

fn normalize_settle_interval(interval: Duration) -> Result<Duration, String> {
    if interval.is_zero() {
        return Err("settle interval must be greater than zero".to_string());
    }
    if interval > MAX_SETTLE_INTERVAL {
        return Err(format!(
            "settle interval must be at most {} ms, got {} ms",
            MAX_SETTLE_INTERVAL.as_millis(),
            interval.as_millis()
        ));
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, HomeSurface, LogLevel, DEFAULT_SETTLE_INTERVAL};
    use std::time::Duration;

    #[test]
    fn default_uses_narrow_surface_and_short_settle() {
        let config = CoreConfig::default();
        assert_eq!(config.settle_interval, DEFAULT_SETTLE_INTERVAL);
        assert_eq!(config.home_surface.home_path(), "/home");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn settle_interval_bounds_are_enforced() {
        let zero = CoreConfig::default()
            .with_settle_millis(0)
            .expect_err("zero interval must be rejected");
        assert!(zero.contains("greater than zero"));

        CoreConfig::default()
            .with_settle_interval(Duration::from_secs(6))
            .expect_err("long interval must be rejected");

        let config = CoreConfig::default()
            .with_settle_millis(5_000)
            .expect("upper bound is inclusive");
        assert_eq!(config.settle_interval, Duration::from_secs(5));
    }

    #[test]
    fn log_level_accepts_aliases_and_rejects_unknown() {
        assert_eq!(LogLevel::parse(" INFO ").expect("INFO should parse"), LogLevel::Info);
        assert_eq!(LogLevel::parse("warning").expect("alias should parse"), LogLevel::Warn);
        let err = LogLevel::parse("verbose").expect_err("verbose is not a level");
        assert!(err.contains("verbose"));
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn home_surface_parses_known_values() {
        assert_eq!(
            HomeSurface::parse(" WIDE ").expect("wide should parse"),
            HomeSurface::Wide
        );
        assert_eq!(HomeSurface::Wide.home_path(), "/web/home");
        assert!(HomeSurface::parse("tablet").is_err());
    }
}
