//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas,
//! creates every table (idempotent) and then runs versioned migrations.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// How long a pool acquire may wait before the store counts as unavailable
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL lets readers proceed while one writer holds the lock; the busy
    // timeout makes concurrent writers queue instead of failing immediately
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Uses a single connection that never expires: every connection to
/// `sqlite::memory:` is a separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create every table (idempotent - safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_members_table(pool).await?;
    create_songs_table(pool).await?;
    create_suggestion_quotas_table(pool).await?;
    create_vote_records_table(pool).await?;
    create_setlists_table(pool).await?;
    create_setlist_items_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            guid TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            genre TEXT,
            duration_minutes REAL CHECK (duration_minutes IS NULL OR duration_minutes >= 0),
            media_ref TEXT,
            view_count INTEGER,
            suggested_by TEXT NOT NULL REFERENCES members(guid),
            yes_votes INTEGER NOT NULL DEFAULT 0 CHECK (yes_votes >= 0),
            no_votes INTEGER NOT NULL DEFAULT 0 CHECK (no_votes >= 0),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per (member, period); the CHECK backs up the conditional upsert
async fn create_suggestion_quotas_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS suggestion_quotas (
            member_id TEXT NOT NULL REFERENCES members(guid),
            period TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0 CHECK (count BETWEEN 0 AND 3),
            updated_at TEXT NOT NULL,
            PRIMARY KEY (member_id, period)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_vote_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vote_records (
            guid TEXT PRIMARY KEY,
            member_id TEXT NOT NULL REFERENCES members(guid),
            song_id TEXT NOT NULL REFERENCES songs(guid) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'completed')),
            vote_type TEXT CHECK (vote_type IS NULL OR vote_type IN ('up', 'down', 'skip')),
            created_at TEXT NOT NULL,
            completed_at TEXT,
            UNIQUE (member_id, song_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_vote_records_pending ON vote_records(member_id, status, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_setlists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS setlists (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            event_date TEXT NOT NULL,
            event_time TEXT,
            location TEXT,
            target_duration_minutes REAL,
            is_archived INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_setlist_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS setlist_items (
            guid TEXT PRIMARY KEY,
            setlist_id TEXT NOT NULL REFERENCES setlists(guid) ON DELETE CASCADE,
            song_id TEXT NOT NULL REFERENCES songs(guid),
            position INTEGER NOT NULL,
            UNIQUE (setlist_id, song_id),
            UNIQUE (setlist_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
