//! Import of map elements from a JSON export.
//!
//! The file is a JSON array of elements:
//!
//! ```json
//! [{"id": 12345, "type": "node", "name": "Jim Morrison", "latitude": 48.8597,
//!   "longitude": 2.3963, "wikidata": "Q44301", "wikimedia_commons": "Category:Grave of Jim Morrison"}]
//! ```
//!
//! Elements are reconciled like every other record. A full import deletes
//! stored elements missing from the file; `--partial` keeps them.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use lachaise_sync_core::models::OpenStreetMapElement;
use lachaise_sync_core::reconcile::{sweep, upsert, SyncTally};
use lachaise_sync_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

pub fn read_elements(path: &Path) -> Result<Vec<OpenStreetMapElement>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of map elements", path.display()))
}

pub async fn import<S: Store + ?Sized>(
    store: &S,
    elements: Vec<OpenStreetMapElement>,
    full: bool,
    now: i64,
) -> Result<SyncTally> {
    let mut tally = SyncTally::default();
    let mut touched = BTreeSet::new();
    info!(count = elements.len(), full, "importing map elements");
    for element in elements {
        if !touched.insert(element.id) {
            tally.warn(format!("element {} appears more than once", element.id));
        }
        upsert(store, element, now, &mut tally).await?;
    }
    if full {
        sweep::<OpenStreetMapElement, _>(store, &touched, &mut tally).await?;
    }
    Ok(tally)
}

/// Entry point of `lsync osm import <file>`.
pub async fn run_import(config: &Config, path: &Path, partial: bool) -> Result<()> {
    let elements = read_elements(path)?;
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let tally = import(&store, elements, !partial, chrono::Utc::now().timestamp()).await?;

    println!("osm import {}", path.display());
    println!("  created: {}", tally.created);
    println!("  modified: {}", tally.modified);
    println!("  deleted: {}", tally.deleted);
    for warning in &tally.warnings {
        println!("  warning: {}", warning);
    }
    println!("ok");

    store.pool().close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lachaise_sync_core::store::memory::InMemoryStore;
    use lachaise_sync_core::store::Table;
    use serde_json::json;
    use tempfile::TempDir;

    fn element(id: i64, name: &str) -> OpenStreetMapElement {
        serde_json::from_value(json!({
            "id": id, "type": "node", "name": name,
            "latitude": 48.86, "longitude": 2.39, "wikidata": "Q44301"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_import_reconciles_and_sweeps() {
        let store = InMemoryStore::new();
        let tally = import(&store, vec![element(1, "A"), element(2, "B")], true, 10)
            .await
            .unwrap();
        assert_eq!(tally.created, 2);

        let tally = import(&store, vec![element(1, "A renamed")], true, 20)
            .await
            .unwrap();
        assert_eq!((tally.created, tally.modified, tally.deleted), (0, 1, 1));

        let stored = Table::<OpenStreetMapElement>::all(&store).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "A renamed");
        assert_eq!(stored[0].created_at, 10);
        assert_eq!(stored[0].modified_at, 20);
    }

    #[tokio::test]
    async fn test_partial_import_keeps_missing_elements() {
        let store = InMemoryStore::new();
        import(&store, vec![element(1, "A"), element(2, "B")], true, 10)
            .await
            .unwrap();
        let tally = import(&store, vec![element(3, "C")], false, 20)
            .await
            .unwrap();
        assert_eq!(tally.deleted, 0);
        assert_eq!(Table::<OpenStreetMapElement>::all(&store).await.unwrap().len(), 3);
    }

    #[test]
    fn test_read_elements_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("elements.json");
        std::fs::write(
            &path,
            r#"[{"id": 7, "type": "way", "name": "Chopin", "latitude": 48.86, "longitude": 2.39}]"#,
        )
        .unwrap();
        let elements = read_elements(&path).unwrap();
        assert_eq!(elements[0].element_type, "way");
        assert_eq!(elements[0].wikidata, "");

        std::fs::write(&path, "{}").unwrap();
        assert!(read_elements(&path).is_err());
    }
}
