//! Encyclopedia pages of localized entries.
//!
//! Runs in two phases: the default sort keys of every page are read from
//! revision wikitext in batches per language, then each page's lead
//! section is fetched as rendered HTML and filtered by
//! [`extract_lead`](lachaise_sync_core::lead::extract_lead).
//!
//! An override selects localized entries as `Q1:fr` (one language) or
//! `Q1` (every language of the entry).

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use lachaise_sync_core::chunk::{batches, dedup_sorted};
use lachaise_sync_core::extract::or_default;
use lachaise_sync_core::extract::wikitext::{default_sort, revision_text};
use lachaise_sync_core::lead::extract_lead;
use lachaise_sync_core::models::{WikidataLocalizedEntry, WikipediaPage};
use lachaise_sync_core::reconcile::{sweep, upsert, Scope, SyncTally};
use lachaise_sync_core::store::{Store, Table};

use super::{SyncContext, SyncKind};

pub async fn sync<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
    scope: &Scope,
    tally: &mut SyncTally,
) -> Result<()> {
    let entries: Vec<WikidataLocalizedEntry> = Table::<WikidataLocalizedEntry>::all(ctx.store)
        .await?
        .into_iter()
        .filter(|l| !l.wikipedia.is_empty() && selected(scope, l))
        .collect();

    let sort_keys = default_sort_keys(ctx, &entries).await?;

    ctx.discovered(SyncKind::Wikipedia, "pages", entries.len());
    let mut touched = BTreeSet::new();
    let mut done = 0;
    for batch in batches(&entries, ctx.batch_size()) {
        for localized in batch {
            let page = fetch_page(ctx, localized, &sort_keys, tally).await?;
            upsert(ctx.store, page, ctx.now, tally).await?;
            touched.insert((localized.wikidata_id.clone(), localized.language.clone()));
        }
        done += batch.len();
        ctx.fetched(SyncKind::Wikipedia, "pages", done, entries.len());
    }

    if scope.is_full() {
        sweep::<WikipediaPage, _>(ctx.store, &touched, tally).await?;
    }
    Ok(())
}

/// Whether an override entry (`Q1` or `Q1:fr`) selects `localized`.
fn selected(scope: &Scope, localized: &WikidataLocalizedEntry) -> bool {
    let Scope::Only(ids) = scope else {
        return true;
    };
    ids.iter().any(|id| match id.split_once(':') {
        Some((code, language)) => code == localized.wikidata_id && language == localized.language,
        None => *id == localized.wikidata_id,
    })
}

/// Default sort key per `(language, title)`.
async fn default_sort_keys<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
    entries: &[WikidataLocalizedEntry],
) -> Result<BTreeMap<(String, String), String>> {
    let mut titles_by_language: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for localized in entries {
        titles_by_language
            .entry(&localized.language)
            .or_default()
            .push(localized.wikipedia.clone());
    }

    let mut keys = BTreeMap::new();
    let mut done = 0;
    ctx.discovered(SyncKind::Wikipedia, "revisions", entries.len());
    for (language, titles) in titles_by_language {
        let titles = dedup_sorted(titles);
        for batch in batches(&titles, ctx.batch_size()) {
            let pages = ctx.wiki.wikipedia_pages(language, batch).await?;
            for (title, page) in &pages {
                let key = or_default(
                    title,
                    "default_sort",
                    revision_text(page).map(default_sort),
                );
                keys.insert((language.to_string(), title.clone()), key);
            }
            done += batch.len();
            ctx.fetched(SyncKind::Wikipedia, "revisions", done, entries.len());
        }
    }
    Ok(keys)
}

async fn fetch_page<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
    localized: &WikidataLocalizedEntry,
    sort_keys: &BTreeMap<(String, String), String>,
    tally: &mut SyncTally,
) -> Result<WikipediaPage> {
    let language = &localized.language;
    let title = &localized.wikipedia;

    let html = ctx.wiki.wikipedia_lead_html(language, title).await?;
    let intro = match extract_lead(&html, language) {
        Ok(intro) => intro,
        Err(e) => {
            tally.warn(format!("lead of {language}:{title} could not be read: {e}"));
            String::new()
        }
    };

    let mut page = WikipediaPage::new(&localized.wikidata_id, language);
    page.title = title.clone();
    page.intro = intro;
    page.default_sort = sort_keys
        .get(&(language.clone(), title.clone()))
        .cloned()
        .unwrap_or_default();
    Ok(page)
}
