//! Ordered schema steps for the preferences database.
//!
//! # Invariants
//! - Steps are listed in strictly increasing `version` order.
//! - Each step commits together with its `user_version` bump, so a failed
//!   step leaves the file at the previous version.
//!
//! # See also
//! - `crate::preferences`, the only reader of this schema.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

struct Step {
    version: u32,
    sql: &'static str,
}

const STEPS: &[Step] = &[Step {
    version: 1,
    sql: include_str!("0001_preferences.sql"),
}];

/// Highest schema version this build can write.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Schema version recorded in the open database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Runs every step newer than the recorded version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending: Vec<&Step> = STEPS.iter().filter(|step| step.version > found).collect();
    for step in &pending {
        run_step(conn, step).map_err(|source| DbError::Migration {
            version: step.version,
            source,
        })?;
        debug!("event=db_migrate module=db status=ok version={}", step.version);
    }
    if !pending.is_empty() {
        info!(
            "event=db_migrate module=db status=ok from={} to={}",
            found, supported
        );
    }
    Ok(())
}

fn run_step(conn: &mut Connection, step: &Step) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)?;
    tx.commit()
}
