//! Schema installation and removal.
//!
//! The job table and its index are managed through a small ordered list of
//! migrations, tracked in the `byplay_migrations` metadata table so that
//! [`install`] and [`uninstall`] are both idempotent.

use sqlx::{Connection, PgConnection};

use crate::error::Result;

struct Migration {
    version: i64,
    name: &'static str,
    up: &'static [&'static str],
    down: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create-byplay",
        up: &["CREATE TABLE byplay (
                id BIGSERIAL PRIMARY KEY,
                job TEXT NOT NULL,
                args TEXT NOT NULL,
                state SMALLINT NOT NULL CHECK (state IN (0, 1, 2)),
                queue TEXT NOT NULL
            )"],
        down: &["DROP TABLE byplay"],
    },
    Migration {
        version: 2,
        name: "index-byplay-state-queue-id",
        up: &["CREATE INDEX byplay_state_queue_id ON byplay (state, queue, id)"],
        down: &["DROP INDEX byplay_state_queue_id"],
    },
];

const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS byplay_migrations (
        version BIGINT PRIMARY KEY,
        name TEXT NOT NULL,
        applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )";

/// Install the job table and its index.
///
/// Applies any migration not yet recorded in `byplay_migrations`, each in its
/// own transaction. Safe to call on a fresh database and on one that is
/// already installed. Must not be called inside an open transaction.
pub async fn install(conn: &mut PgConnection) -> Result<()> {
    sqlx::query(CREATE_MIGRATIONS_TABLE)
        .execute(&mut *conn)
        .await?;

    let applied: Vec<i64> = sqlx::query_scalar("SELECT version FROM byplay_migrations")
        .fetch_all(&mut *conn)
        .await?;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }
        let mut tx = conn.begin().await?;
        for statement in migration.up {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO byplay_migrations (version, name) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "migration applied"
        );
    }

    Ok(())
}

/// Remove the job table, its index, and the migration metadata.
///
/// Reverts applied migrations in reverse order, then drops
/// `byplay_migrations` itself. A no-op on a database where [`install`] never
/// ran. Must not be called inside an open transaction.
pub async fn uninstall(conn: &mut PgConnection) -> Result<()> {
    let metadata: Option<String> =
        sqlx::query_scalar("SELECT to_regclass('byplay_migrations')::text")
            .fetch_one(&mut *conn)
            .await?;
    if metadata.is_none() {
        return Ok(());
    }

    let applied: Vec<i64> =
        sqlx::query_scalar("SELECT version FROM byplay_migrations ORDER BY version")
            .fetch_all(&mut *conn)
            .await?;

    for migration in MIGRATIONS.iter().rev() {
        if !applied.contains(&migration.version) {
            continue;
        }
        let mut tx = conn.begin().await?;
        for statement in migration.down {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM byplay_migrations WHERE version = $1")
            .bind(migration.version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "migration reverted"
        );
    }

    sqlx::query("DROP TABLE byplay_migrations")
        .execute(&mut *conn)
        .await?;

    Ok(())
}
