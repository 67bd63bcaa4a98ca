use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::sync::SyncKind;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and seed one bookkeeping row per sync kind.
///
/// Every statement is idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS openstreetmap_elements (
            id INTEGER PRIMARY KEY,
            type TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            sorting_name TEXT NOT NULL DEFAULT '',
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            wikipedia TEXT NOT NULL DEFAULT '',
            wikidata TEXT NOT NULL DEFAULT '',
            wikimedia_commons TEXT NOT NULL DEFAULT '',
            historic TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // List columns are `;`-joined codes.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wikidata_entries (
            wikidata_id TEXT PRIMARY KEY,
            instance_of TEXT NOT NULL DEFAULT '',
            wikimedia_commons_category TEXT NOT NULL DEFAULT '',
            wikimedia_commons_grave_category TEXT NOT NULL DEFAULT '',
            burial_plot_reference TEXT NOT NULL DEFAULT '',
            date_of_birth TEXT,
            date_of_birth_accuracy TEXT,
            date_of_death TEXT,
            date_of_death_accuracy TEXT,
            sex_or_gender TEXT,
            occupations TEXT NOT NULL DEFAULT '',
            grave_of_wikidata TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wikidata_localized_entries (
            wikidata_id TEXT NOT NULL,
            language TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            wikipedia TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL,
            PRIMARY KEY (wikidata_id, language),
            FOREIGN KEY (wikidata_id) REFERENCES wikidata_entries(wikidata_id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Category members are `|`-joined file titles.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wikimedia_commons_categories (
            title TEXT PRIMARY KEY,
            main_image TEXT NOT NULL DEFAULT '',
            category_members TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wikimedia_commons_files (
            title TEXT PRIMARY KEY,
            original_url TEXT NOT NULL DEFAULT '',
            thumbnail_url TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wikipedia_pages (
            wikidata_id TEXT NOT NULL,
            language TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            intro TEXT NOT NULL DEFAULT '',
            default_sort TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL,
            PRIMARY KEY (wikidata_id, language),
            FOREIGN KEY (wikidata_id, language)
                REFERENCES wikidata_localized_entries(wikidata_id, language) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wikidata_occupations (
            wikidata_id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wikidata_entry_occupations (
            wikidata_id TEXT NOT NULL,
            occupation_id TEXT NOT NULL,
            PRIMARY KEY (wikidata_id, occupation_id),
            FOREIGN KEY (wikidata_id) REFERENCES wikidata_entries(wikidata_id) ON DELETE CASCADE,
            FOREIGN KEY (occupation_id) REFERENCES wikidata_occupations(wikidata_id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS synchronizations (
            name TEXT PRIMARY KEY,
            last_executed INTEGER,
            created_objects INTEGER NOT NULL DEFAULT 0,
            modified_objects INTEGER NOT NULL DEFAULT 0,
            deleted_objects INTEGER NOT NULL DEFAULT 0,
            errors TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    for kind in SyncKind::ALL {
        sqlx::query("INSERT OR IGNORE INTO synchronizations (name) VALUES (?)")
            .bind(kind.name())
            .execute(pool)
            .await?;
    }

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_entry_occupations_occupation ON wikidata_entry_occupations(occupation_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
