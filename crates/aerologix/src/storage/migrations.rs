//! Database migration system for aerologix.
//!
//! Migrations are listed in [`MIGRATIONS`] in version order. Pending ones are
//! applied inside a single transaction and the resulting version is recorded
//! in the `metadata` table.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// A single schema step.
struct Migration {
    version: i32,
    description: &'static str,
    apply: fn(&Connection) -> Result<()>,
}

/// Every migration, oldest first.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "active sessions and submission history",
    apply: create_base_schema,
}];

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Bring the database schema up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if the stored version is unreadable, newer than this
/// build understands, or a migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(super::schema::CREATE_METADATA_TABLE, [])?;

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    if version == CURRENT_VERSION {
        debug!("Schema is at version {}", version);
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > version) {
        info!(
            "Applying migration {}: {}",
            migration.version, migration.description
        );
        (migration.apply)(&tx)?;
        set_schema_version(&tx, migration.version)?;
    }
    tx.commit()?;
    Ok(())
}

fn create_base_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}

/// Read the schema version; 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}
