//! Versioned schema steps for the relation store.
//!
//! # Responsibility
//! - Keep the ordered list of schema steps (relations, then data locks).
//! - Bring a connection from its recorded version up to the newest step.
//!
//! # Invariants
//! - Step versions start at 1 and increase by one.
//! - All pending steps commit together or not at all; `PRAGMA user_version`
//!   always names the last committed step.
//! - A database recorded at a version newer than this build is refused,
//!   never downgraded.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, Transaction};

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "relations",
        sql: include_str!("0001_relations.sql"),
    },
    SchemaStep {
        version: 2,
        name: "data_locks",
        sql: include_str!("0002_data_locks.sql"),
    },
];

/// Returns the newest schema version this build can open.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Runs every step newer than the connection's recorded version.
///
/// Returns the versions applied by this call; empty when the schema was
/// already current.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is newer than this build.
/// - `Sqlite` when a step fails; nothing from this call is kept.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<Vec<u32>> {
    let recorded = recorded_version(conn)?;
    let latest = latest_version();
    if recorded > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: recorded,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > recorded)
        .collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=current version={recorded}");
        return Ok(Vec::new());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        run_step(&tx, step)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={recorded} to_version={latest} steps={}",
        pending.len()
    );
    Ok(pending.iter().map(|step| step.version).collect())
}

fn run_step(tx: &Transaction<'_>, step: &SchemaStep) -> DbResult<()> {
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)?;
    debug!(
        "event=db_migrate_step module=db status=ok version={} name={}",
        step.version, step.name
    );
    Ok(())
}

fn recorded_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, SCHEMA_STEPS};
    use rusqlite::Connection;

    #[test]
    fn step_versions_are_contiguous_from_one() {
        for (index, step) in SCHEMA_STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.name);
        }
    }

    #[test]
    fn reports_applied_versions_then_nothing_once_current() {
        let mut conn = Connection::open_in_memory().unwrap();

        let applied = apply_migrations(&mut conn).unwrap();
        assert_eq!(applied, (1..=latest_version()).collect::<Vec<_>>());

        assert!(apply_migrations(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn resumes_from_recorded_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_STEPS[0].sql).unwrap();
        conn.pragma_update(None, "user_version", 1_u32).unwrap();

        let applied = apply_migrations(&mut conn).unwrap();
        assert_eq!(applied, vec![2]);
    }
}
