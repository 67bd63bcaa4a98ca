//! Export the synchronized data set as one JSON document.
//!
//! Produces every table of the database, keyed by table name, so the data
//! can be published or diffed without the API running.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use lachaise_sync_core::models::{
    CommonsCategory, CommonsFile, OpenStreetMapElement, Synchronization, WikidataEntry,
    WikidataLocalizedEntry, WikidataOccupation, WikipediaPage,
};
use lachaise_sync_core::store::{Store, Table};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

#[derive(Serialize)]
pub struct ExportData {
    pub openstreetmap_elements: Vec<OpenStreetMapElement>,
    pub wikidata_entries: Vec<WikidataEntry>,
    pub wikidata_localized_entries: Vec<WikidataLocalizedEntry>,
    pub wikidata_occupations: Vec<WikidataOccupation>,
    pub wikidata_entry_occupations: Vec<EntryOccupation>,
    pub wikimedia_commons_categories: Vec<CommonsCategory>,
    pub wikimedia_commons_files: Vec<CommonsFile>,
    pub wikipedia_pages: Vec<WikipediaPage>,
    pub synchronizations: Vec<Synchronization>,
}

#[derive(Serialize)]
pub struct EntryOccupation {
    pub wikidata_id: String,
    pub occupation_id: String,
}

/// Collect every table of `store`.
pub async fn collect<S: Store + ?Sized>(store: &S) -> Result<ExportData> {
    Ok(ExportData {
        openstreetmap_elements: Table::<OpenStreetMapElement>::all(store).await?,
        wikidata_entries: Table::<WikidataEntry>::all(store).await?,
        wikidata_localized_entries: Table::<WikidataLocalizedEntry>::all(store).await?,
        wikidata_occupations: Table::<WikidataOccupation>::all(store).await?,
        wikidata_entry_occupations: store
            .occupation_links()
            .await?
            .into_iter()
            .map(|(wikidata_id, occupation_id)| EntryOccupation {
                wikidata_id,
                occupation_id,
            })
            .collect(),
        wikimedia_commons_categories: Table::<CommonsCategory>::all(store).await?,
        wikimedia_commons_files: Table::<CommonsFile>::all(store).await?,
        wikipedia_pages: Table::<WikipediaPage>::all(store).await?,
        synchronizations: store.synchronizations().await?,
    })
}

/// Export the database as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let data = collect(&store).await?;
    let json = serde_json::to_string_pretty(&data)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &json)?;
            eprintln!(
                "Exported {} entries, {} categories, {} files to {}",
                data.wikidata_entries.len(),
                data.wikimedia_commons_categories.len(),
                data.wikimedia_commons_files.len(),
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }

    store.pool().close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lachaise_sync_core::reconcile::{upsert, SyncTally};
    use lachaise_sync_core::store::memory::InMemoryStore;

    #[tokio::test]
    async fn test_collect_includes_links() {
        let store = InMemoryStore::new();
        let mut tally = SyncTally::default();
        upsert(&store, WikidataEntry::new("Q1"), 1, &mut tally)
            .await
            .unwrap();
        upsert(&store, WikidataOccupation::new("Q2"), 1, &mut tally)
            .await
            .unwrap();
        store.link_occupation("Q1", "Q2").await.unwrap();

        let data = collect(&store).await.unwrap();
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["wikidata_entries"][0]["wikidata_id"], "Q1");
        assert_eq!(json["wikidata_entry_occupations"][0]["occupation_id"], "Q2");
        assert_eq!(json["wikipedia_pages"].as_array().unwrap().len(), 0);
    }
}
