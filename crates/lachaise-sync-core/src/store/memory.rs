//! In-memory [`Store`] implementation for testing.
//!
//! Uses ordered maps behind a single `std::sync::RwLock`. Every write bumps a
//! counter so tests can assert that an unchanged
//! upsert never touched storage.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::fields::Record;
use crate::models::{
    CommonsCategory, CommonsFile, OpenStreetMapElement, Synchronization, WikidataEntry,
    WikidataLocalizedEntry, WikidataOccupation, WikipediaPage,
};

use super::{Store, Table};

#[derive(Default)]
struct Tables {
    osm: BTreeMap<i64, OpenStreetMapElement>,
    entries: BTreeMap<String, WikidataEntry>,
    localized: BTreeMap<(String, String), WikidataLocalizedEntry>,
    categories: BTreeMap<String, CommonsCategory>,
    files: BTreeMap<String, CommonsFile>,
    pages: BTreeMap<(String, String), WikipediaPage>,
    occupations: BTreeMap<String, WikidataOccupation>,
    links: BTreeSet<(String, String)>,
    synchronizations: BTreeMap<String, Synchronization>,
}

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of write operations served so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.tables
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

macro_rules! memory_table {
    ($record:ty, $map:ident) => {
        #[async_trait]
        impl Table<$record> for InMemoryStore {
            async fn get(&self, key: &<$record as Record>::Key) -> Result<Option<$record>> {
                Ok(self.read()?.$map.get(key).cloned())
            }

            async fn all(&self) -> Result<Vec<$record>> {
                Ok(self.read()?.$map.values().cloned().collect())
            }

            async fn save(&self, record: &$record) -> Result<()> {
                self.write()?.$map.insert(record.key(), record.clone());
                Ok(())
            }

            async fn delete(&self, key: &<$record as Record>::Key) -> Result<()> {
                let mut tables = self.write()?;
                remove_cascading!(tables, $map, key);
                Ok(())
            }
        }
    };
}

macro_rules! remove_cascading {
    ($tables:ident, entries, $key:ident) => {{
        $tables.entries.remove($key);
        $tables.localized.retain(|(id, _), _| id != $key);
        $tables.pages.retain(|(id, _), _| id != $key);
        $tables.links.retain(|(id, _)| id != $key);
    }};
    ($tables:ident, localized, $key:ident) => {{
        $tables.localized.remove($key);
        $tables.pages.remove($key);
    }};
    ($tables:ident, occupations, $key:ident) => {{
        $tables.occupations.remove($key);
        $tables.links.retain(|(_, occupation)| occupation != $key);
    }};
    ($tables:ident, $map:ident, $key:ident) => {{
        $tables.$map.remove($key);
    }};
}

memory_table!(OpenStreetMapElement, osm);
memory_table!(WikidataEntry, entries);
memory_table!(WikidataLocalizedEntry, localized);
memory_table!(CommonsCategory, categories);
memory_table!(CommonsFile, files);
memory_table!(WikipediaPage, pages);
memory_table!(WikidataOccupation, occupations);

#[async_trait]
impl Store for InMemoryStore {
    async fn occupation_links(&self) -> Result<Vec<(String, String)>> {
        Ok(self.read()?.links.iter().cloned().collect())
    }

    async fn link_occupation(&self, wikidata_id: &str, occupation_id: &str) -> Result<()> {
        self.write()?
            .links
            .insert((wikidata_id.to_string(), occupation_id.to_string()));
        Ok(())
    }

    async fn unlink_occupation(&self, wikidata_id: &str, occupation_id: &str) -> Result<()> {
        self.write()?
            .links
            .remove(&(wikidata_id.to_string(), occupation_id.to_string()));
        Ok(())
    }

    async fn synchronization(&self, name: &str) -> Result<Option<Synchronization>> {
        Ok(self.read()?.synchronizations.get(name).cloned())
    }

    async fn save_synchronization(&self, sync: &Synchronization) -> Result<()> {
        self.write()?
            .synchronizations
            .insert(sync.name.clone(), sync.clone());
        Ok(())
    }

    async fn synchronizations(&self) -> Result<Vec<Synchronization>> {
        Ok(self.read()?.synchronizations.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_get() {
        let store = InMemoryStore::new();
        let mut entry = WikidataEntry::new("Q1");
        entry.burial_plot_reference = "89".into();
        Table::<WikidataEntry>::save(&store, &entry).await.unwrap();

        let loaded = Table::<WikidataEntry>::get(&store, &"Q1".to_string())
            .await
            .unwrap();
        assert_eq!(loaded, Some(entry));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_all_is_ordered_by_key() {
        let store = InMemoryStore::new();
        for title in ["Category:B", "Category:A"] {
            Table::<CommonsCategory>::save(&store, &CommonsCategory::new(title))
                .await
                .unwrap();
        }
        let titles: Vec<String> = Table::<CommonsCategory>::all(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Category:A", "Category:B"]);
    }

    #[tokio::test]
    async fn test_entry_delete_cascades() {
        let store = InMemoryStore::new();
        Table::<WikidataEntry>::save(&store, &WikidataEntry::new("Q1"))
            .await
            .unwrap();
        Table::<WikidataLocalizedEntry>::save(&store, &WikidataLocalizedEntry::new("Q1", "fr"))
            .await
            .unwrap();
        Table::<WikipediaPage>::save(&store, &WikipediaPage::new("Q1", "fr"))
            .await
            .unwrap();
        store.link_occupation("Q1", "Q1028181").await.unwrap();

        Table::<WikidataEntry>::delete(&store, &"Q1".to_string())
            .await
            .unwrap();

        assert!(Table::<WikidataLocalizedEntry>::all(&store)
            .await
            .unwrap()
            .is_empty());
        assert!(Table::<WikipediaPage>::all(&store).await.unwrap().is_empty());
        assert!(store.occupation_links().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_synchronization_rows() {
        let store = InMemoryStore::new();
        let sync = Synchronization {
            name: "wikidata".into(),
            last_executed: Some(1_700_000_000),
            created_objects: 3,
            ..Default::default()
        };
        store.save_synchronization(&sync).await.unwrap();
        assert_eq!(store.synchronization("wikidata").await.unwrap(), Some(sync));
        assert_eq!(store.synchronizations().await.unwrap().len(), 1);
    }
}
