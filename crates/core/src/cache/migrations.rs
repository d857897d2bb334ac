//! Database schema migrations.
//!
//! The applied schema version lives in SQLite's `user_version` pragma. Each
//! pending migration runs in its own transaction together with the version bump.

use super::Error;
use tokio_rusqlite::Connection;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Ordered by version; versions are contiguous from 1.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "cache_storage",
    sql: include_str!("../../migrations/001_cache_storage.sql"),
}];

/// Latest schema version this build knows about.
fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Apply every migration newer than the database's schema version.
///
/// # Errors
///
/// `MigrationFailed` if a migration batch fails, or if the database was written
/// by a newer schema than this build knows.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        let latest = latest_version();

        if current > latest {
            return Err(Error::MigrationFailed(format!(
                "database schema version {current} is newer than supported version {latest}"
            )));
        }

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            tracing::debug!(version = migration.version, name = migration.name, "applying cache schema migration");

            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|e| Error::MigrationFailed(format!("{}: {e}", migration.name)))?;
            tx.pragma_update(None, "user_version", migration.version)?;
            tx.commit()?;
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
