//! Storage abstraction for lachaise-sync.
//!
//! A [`Table`] is keyed storage for one [`Record`] type; a [`Store`]
//! bundles one table per persisted entity together with the
//! entry ↔ occupation links and the synchronization bookkeeping rows.
//!
//! Because [`Store`] inherits [`Table`] several times, callers name the
//! record type explicitly: `Table::<WikidataEntry>::all(store)`.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! Deleting a [`WikidataEntry`] cascades to its localized entries, their
//! encyclopedia pages and its occupation links.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::fields::Record;
use crate::models::{
    CommonsCategory, CommonsFile, OpenStreetMapElement, Synchronization, WikidataEntry,
    WikidataLocalizedEntry, WikidataOccupation, WikipediaPage,
};

/// Keyed storage for one record type.
#[async_trait]
pub trait Table<R: Record>: Send + Sync {
    async fn get(&self, key: &R::Key) -> Result<Option<R>>;

    /// Every stored record, ordered by key.
    async fn all(&self) -> Result<Vec<R>>;

    /// Insert or replace the record with the same key.
    async fn save(&self, record: &R) -> Result<()>;

    async fn delete(&self, key: &R::Key) -> Result<()>;
}

/// Abstract storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`occupation_links`](Store::occupation_links) | All `(entry, occupation)` pairs |
/// | [`link_occupation`](Store::link_occupation) | Add one pair |
/// | [`unlink_occupation`](Store::unlink_occupation) | Remove one pair |
/// | [`synchronization`](Store::synchronization) | Bookkeeping row of one sync kind |
/// | [`save_synchronization`](Store::save_synchronization) | Upsert a bookkeeping row |
/// | [`synchronizations`](Store::synchronizations) | Every bookkeeping row |
#[async_trait]
pub trait Store:
    Table<OpenStreetMapElement>
    + Table<WikidataEntry>
    + Table<WikidataLocalizedEntry>
    + Table<CommonsCategory>
    + Table<CommonsFile>
    + Table<WikipediaPage>
    + Table<WikidataOccupation>
{
    async fn occupation_links(&self) -> Result<Vec<(String, String)>>;

    async fn link_occupation(&self, wikidata_id: &str, occupation_id: &str) -> Result<()>;

    async fn unlink_occupation(&self, wikidata_id: &str, occupation_id: &str) -> Result<()>;

    async fn synchronization(&self, name: &str) -> Result<Option<Synchronization>>;

    async fn save_synchronization(&self, sync: &Synchronization) -> Result<()>;

    async fn synchronizations(&self) -> Result<Vec<Synchronization>>;
}
