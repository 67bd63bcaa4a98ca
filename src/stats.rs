//! Database overview for `lsync status`.
//!
//! Prints the number of stored records per table and the outcome of the
//! last run of every synchronization.

use anyhow::Result;

use lachaise_sync_core::models::Synchronization;
use lachaise_sync_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

const TABLES: &[(&str, &str)] = &[
    ("OpenStreetMap elements", "openstreetmap_elements"),
    ("Wikidata entries", "wikidata_entries"),
    ("Localized entries", "wikidata_localized_entries"),
    ("Commons categories", "wikimedia_commons_categories"),
    ("Commons files", "wikimedia_commons_files"),
    ("Wikipedia pages", "wikipedia_pages"),
    ("Occupations", "wikidata_occupations"),
];

/// Run the status command: query the database and print a summary.
pub async fn run_status(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("lachaise-sync — Database Status");
    println!("===============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();

    for (label, table) in TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await?;
        println!("  {:<24} {:>8}", label, count);
    }

    let store = SqliteStore::new(pool);
    let syncs = store.synchronizations().await?;
    println!();
    println!("  Synchronizations:");
    println!(
        "  {:<30} {:>8} {:>9} {:>8}   {:<16} {}",
        "NAME", "CREATED", "MODIFIED", "DELETED", "LAST RUN", "ERRORS"
    );
    println!("  {}", "-".repeat(92));
    for sync in &syncs {
        println!("  {}", format_sync_row(sync, chrono::Utc::now().timestamp()));
    }
    println!();

    store.pool().close().await;
    Ok(())
}

fn format_sync_row(sync: &Synchronization, now: i64) -> String {
    let last_run = match sync.last_executed {
        Some(ts) => format_ts_relative(ts, now),
        None => "never".to_string(),
    };
    let errors = if sync.errors.is_empty() {
        "-".to_string()
    } else {
        first_line(&sync.errors, 60)
    };
    format!(
        "{:<30} {:>8} {:>9} {:>8}   {:<16} {}",
        sync.name,
        sync.created_objects,
        sync.modified_objects,
        sync.deleted_objects,
        last_run,
        errors
    )
}

fn first_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max_chars {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp relative to `now` (e.g. "3 hours ago").
fn format_ts_relative(ts: i64, now: i64) -> String {
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
