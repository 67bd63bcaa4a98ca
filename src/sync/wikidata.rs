//! Knowledge-graph entries and their per-language labels.
//!
//! The working set is every code linked from a map element plus every
//! code listed in a persisted tomb's grave-of list. Tombs fetched during
//! the run may name people outside that set; those are fetched in one
//! follow-up pass whose own discoveries are not followed.

use std::collections::BTreeSet;

use anyhow::Result;
use serde_json::Value;
use tracing::info;

use lachaise_sync_core::chunk::{batches, dedup_sorted};
use lachaise_sync_core::extract::{extract_entry, extract_localized};
use lachaise_sync_core::models::{OpenStreetMapElement, WikidataEntry, WikidataLocalizedEntry};
use lachaise_sync_core::reconcile::{secondary_queue, sweep, upsert, Scope, SyncTally};
use lachaise_sync_core::store::{Store, Table};

use super::{SyncContext, SyncKind};

const PROPS: &str = "labels|descriptions|claims|sitelinks";

#[derive(Default)]
struct Touched {
    entries: BTreeSet<String>,
    localized: BTreeSet<(String, String)>,
    grave_of: Vec<String>,
}

pub async fn sync<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
    scope: &Scope,
    tally: &mut SyncTally,
) -> Result<()> {
    let persisted_entries = Table::<WikidataEntry>::all(ctx.store).await?;
    let persisted: BTreeSet<String> = persisted_entries
        .iter()
        .map(|e| e.wikidata_id.clone())
        .collect();

    let codes = match scope {
        Scope::Only(codes) => dedup_sorted(codes.iter().cloned()),
        Scope::Full => {
            let mut codes = Vec::new();
            for element in Table::<OpenStreetMapElement>::all(ctx.store).await? {
                codes.extend(element.wikidata_codes());
            }
            for entry in &persisted_entries {
                codes.extend(entry.grave_of_wikidata.iter().cloned());
            }
            dedup_sorted(codes)
        }
    };
    let working_set: BTreeSet<String> = codes.iter().cloned().collect();

    let mut touched = Touched::default();
    fetch(ctx, "entries", &codes, &mut touched, tally).await?;

    let discovered = std::mem::take(&mut touched.grave_of);
    let queue = secondary_queue(&working_set, &discovered, &persisted, scope);
    if !queue.is_empty() {
        info!(count = queue.len(), "following grave-of references");
        fetch(ctx, "grave_of", &queue, &mut touched, tally).await?;
    }

    if scope.is_full() {
        sweep::<WikidataEntry, _>(ctx.store, &touched.entries, tally).await?;
        sweep::<WikidataLocalizedEntry, _>(ctx.store, &touched.localized, tally).await?;
    }
    Ok(())
}

async fn fetch<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
    phase: &'static str,
    codes: &[String],
    touched: &mut Touched,
    tally: &mut SyncTally,
) -> Result<()> {
    ctx.discovered(SyncKind::Wikidata, phase, codes.len());
    let mut done = 0;
    for batch in batches(codes, ctx.batch_size()) {
        let entities = ctx
            .wiki
            .wikidata_entities(batch, PROPS, ctx.languages())
            .await?;
        for code in batch {
            if !entities.contains_key(code) {
                tally.warn(format!("{code} was not returned by Wikidata"));
            }
        }
        for (code, entity) in &entities {
            handle_entity(ctx, code, entity, touched, tally).await?;
        }
        done += batch.len();
        ctx.fetched(SyncKind::Wikidata, phase, done, codes.len());
    }
    Ok(())
}

async fn handle_entity<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
    code: &str,
    entity: &Value,
    touched: &mut Touched,
    tally: &mut SyncTally,
) -> Result<()> {
    let entry = extract_entry(code, entity, &ctx.config.sync.accepted_locations_of_burial);
    touched
        .grave_of
        .extend(entry.grave_of_wikidata.iter().cloned());
    upsert(ctx.store, entry, ctx.now, tally).await?;
    touched.entries.insert(code.to_string());

    for language in ctx.languages() {
        let localized = extract_localized(code, entity, language);
        upsert(ctx.store, localized, ctx.now, tally).await?;
        touched
            .localized
            .insert((code.to_string(), language.clone()));
    }
    Ok(())
}
