//! Occupations of persisted entries and the entry ↔ occupation links.
//!
//! Always a full run: the working set is every occupation code listed by
//! an entry. Occupations no entry lists any more are deleted, which also
//! drops their links.

use std::collections::BTreeSet;

use anyhow::Result;
use tracing::debug;

use lachaise_sync_core::chunk::{batches, dedup_sorted};
use lachaise_sync_core::extract::labels::composite_name;
use lachaise_sync_core::models::{WikidataEntry, WikidataOccupation};
use lachaise_sync_core::reconcile::{sweep, upsert, SyncTally};
use lachaise_sync_core::store::{Store, Table};

use super::{SyncContext, SyncKind};

pub async fn sync<S: Store + ?Sized>(ctx: &SyncContext<'_, S>, tally: &mut SyncTally) -> Result<()> {
    let mut wanted_links = BTreeSet::new();
    for entry in Table::<WikidataEntry>::all(ctx.store).await? {
        for occupation in &entry.occupations {
            wanted_links.insert((entry.wikidata_id.clone(), occupation.clone()));
        }
    }
    let codes = dedup_sorted(wanted_links.iter().map(|(_, o)| o.clone()));

    ctx.discovered(SyncKind::WikidataOccupations, "occupations", codes.len());
    let mut touched = BTreeSet::new();
    let mut done = 0;
    for batch in batches(&codes, ctx.batch_size()) {
        let entities = ctx
            .wiki
            .wikidata_entities(batch, "labels", ctx.languages())
            .await?;
        for code in batch {
            let mut occupation = WikidataOccupation::new(code);
            match entities.get(code) {
                Some(entity) => occupation.name = composite_name(entity, ctx.languages()),
                None => tally.warn(format!("occupation {code} was not returned by Wikidata")),
            }
            upsert(ctx.store, occupation, ctx.now, tally).await?;
            touched.insert(code.clone());
        }
        done += batch.len();
        ctx.fetched(SyncKind::WikidataOccupations, "occupations", done, codes.len());
    }

    sync_links(ctx.store, &wanted_links).await?;
    sweep::<WikidataOccupation, _>(ctx.store, &touched, tally).await?;
    Ok(())
}

/// Make the stored links equal to `wanted`.
async fn sync_links<S: Store + ?Sized>(
    store: &S,
    wanted: &BTreeSet<(String, String)>,
) -> Result<()> {
    let existing: BTreeSet<(String, String)> = store.occupation_links().await?.into_iter().collect();
    for (entry, occupation) in wanted.difference(&existing) {
        debug!(entry = %entry, occupation = %occupation, "link");
        store.link_occupation(entry, occupation).await?;
    }
    for (entry, occupation) in existing.difference(wanted) {
        debug!(entry = %entry, occupation = %occupation, "unlink");
        store.unlink_occupation(entry, occupation).await?;
    }
    Ok(())
}
