//! Cache schema setup, versioned through `PRAGMA user_version`.

use super::Error;
use tokio_rusqlite::Connection;

/// Schema version written by this build.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = include_str!("../../migrations/001_partitions.sql");

/// Create the partition tables on a fresh database.
///
/// # Errors
///
/// Returns `MigrationFailed` when the file was written by a newer schema.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let found: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if found > SCHEMA_VERSION {
            return Err(Error::MigrationFailed(format!(
                "cache schema v{found} is newer than supported v{SCHEMA_VERSION}"
            )));
        }
        if found == SCHEMA_VERSION {
            return Ok(());
        }

        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA)?;
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tx.commit()?;
        tracing::debug!(from = found, to = SCHEMA_VERSION, "cache schema created");
        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user_version(conn: &Connection) -> i64 {
        conn.call(|conn| conn.query_row("PRAGMA user_version", [], |row| row.get(0)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_schema_created_once() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let tables: i64 = conn
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('partitions', 'entries')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();

        assert_eq!(tables, 2);
        assert_eq!(user_version(&conn).await, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_newer_schema_rejected() {
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1))
            .await
            .unwrap();

        let err = run(&conn).await.unwrap_err();

        assert!(matches!(err, Error::MigrationFailed(_)));
    }
}
