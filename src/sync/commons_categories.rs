//! Media-repository categories.
//!
//! A category page may be a `{{Category redirect|X}}` stub. The redirect is
//! reported as a warning and the target page is used for the main image
//! and the member list; the record stays keyed by the requested title.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use serde_json::Value;

use lachaise_sync_core::chunk::{batches, dedup_sorted};
use lachaise_sync_core::extract::or_default;
use lachaise_sync_core::extract::wikitext::{category_redirect, main_image, revision_text};
use lachaise_sync_core::models::{CommonsCategory, OpenStreetMapElement, WikidataEntry};
use lachaise_sync_core::reconcile::{sweep, upsert, Scope, SyncTally};
use lachaise_sync_core::store::{Store, Table};

use super::{SyncContext, SyncKind};

const CATEGORY_PREFIX: &str = "Category:";

pub async fn sync<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
    scope: &Scope,
    tally: &mut SyncTally,
) -> Result<()> {
    let titles = match scope {
        Scope::Only(titles) => dedup_sorted(titles.iter().cloned()),
        Scope::Full => working_set(ctx).await?,
    };

    ctx.discovered(SyncKind::WikimediaCommonsCategories, "categories", titles.len());
    let mut touched = BTreeSet::new();
    let mut done = 0;
    for batch in batches(&titles, ctx.batch_size()) {
        let pages = ctx.wiki.commons_pages(batch).await?;
        for (title, page) in pages {
            let category = fetch_category(ctx, &title, page, tally).await?;
            upsert(ctx.store, category, ctx.now, tally).await?;
            touched.insert(title);
        }
        done += batch.len();
        ctx.fetched(SyncKind::WikimediaCommonsCategories, "categories", done, titles.len());
    }

    if scope.is_full() {
        sweep::<CommonsCategory, _>(ctx.store, &touched, tally).await?;
    }
    Ok(())
}

/// Categories linked from map elements, from entries of a synced type, and
/// every grave category.
async fn working_set<S: Store + ?Sized>(ctx: &SyncContext<'_, S>) -> Result<Vec<String>> {
    let mut titles = Vec::new();
    for element in Table::<OpenStreetMapElement>::all(ctx.store).await? {
        if element.wikimedia_commons.starts_with(CATEGORY_PREFIX) {
            titles.push(element.wikimedia_commons);
        }
    }

    let synced = &ctx.config.sync.synced_instance_of;
    for entry in Table::<WikidataEntry>::all(ctx.store).await? {
        let synced_type = entry.instance_of.iter().any(|q| synced.contains(q));
        if synced_type && !entry.wikimedia_commons_category.is_empty() {
            titles.push(format!("{CATEGORY_PREFIX}{}", entry.wikimedia_commons_category));
        }
        if !entry.wikimedia_commons_grave_category.is_empty() {
            titles.push(format!(
                "{CATEGORY_PREFIX}{}",
                entry.wikimedia_commons_grave_category
            ));
        }
    }
    Ok(dedup_sorted(titles))
}

async fn fetch_category<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
    title: &str,
    page: Value,
    tally: &mut SyncTally,
) -> Result<CommonsCategory> {
    let page = follow_redirect(ctx, title, page, tally).await?;
    let source_title = page
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(title)
        .to_string();

    let mut category = CommonsCategory::new(title);
    category.main_image = or_default(
        title,
        "main_image",
        revision_text(&page).map(main_image),
    );
    category.category_members = ctx.wiki.category_members(&source_title).await?;
    Ok(category)
}

/// Replace a redirect stub with its target page.
async fn follow_redirect<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
    title: &str,
    page: Value,
    tally: &mut SyncTally,
) -> Result<Value> {
    let Some(target) = revision_text(&page).ok().and_then(category_redirect) else {
        return Ok(page);
    };
    tally.warn(format!("{title} is a redirection for {target}"));

    let mut pages = ctx.wiki.commons_pages(std::slice::from_ref(&target)).await?;
    if pages.len() != 1 {
        bail!(
            "redirect target {} of {} resolved to {} pages",
            target,
            title,
            pages.len()
        );
    }
    match pages.remove(&target) {
        Some(page) => Ok(page),
        None => match pages.into_values().next() {
            Some(page) => Ok(page),
            None => bail!("redirect target {} of {} is empty", target, title),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediawiki::testing::FakeTransport;
    use crate::progress::NoProgress;
    use crate::sync::{fixtures, run};
    use lachaise_sync_core::store::memory::InMemoryStore;
    use serde_json::json;

    fn page(title: &str, wikitext: &str) -> Value {
        json!({"title": title, "revisions": [{"*": wikitext}]})
    }

    fn commons() -> FakeTransport {
        FakeTransport::new(|_, params| {
            if let Some(category) = params.get("cmtitle") {
                let members = match category.as_str() {
                    "Category:Grave of Jim Morrison" => {
                        json!([{"title": "File:Grave.jpg"}, {"title": "File:Flowers.jpg"}])
                    }
                    _ => json!([]),
                };
                return Ok(json!({"query": {"categorymembers": members}}));
            }
            let mut pages = serde_json::Map::new();
            for (i, title) in params["titles"].split('|').enumerate() {
                let p = match title {
                    "Category:Grave of Jim Morrison" => page(
                        title,
                        "{{Information\n|image = Grave.jpg\n}}\nSome text",
                    ),
                    "Category:Jim Morrison grave" => {
                        page(title, "{{Category redirect|Grave of Jim Morrison}}")
                    }
                    _ => json!({"title": title, "missing": ""}),
                };
                pages.insert(format!("-{i}"), p);
            }
            Ok(json!({"query": {"pages": pages}}))
        })
    }

    #[tokio::test]
    async fn test_category_with_main_image_and_members() {
        let store = InMemoryStore::new();
        let transport = commons();
        let config = fixtures::config();
        let ctx = SyncContext::new(&store, &transport, &config, &NoProgress, 100);
        let tally = run(
            &ctx,
            SyncKind::WikimediaCommonsCategories,
            Some("Category:Grave of Jim Morrison"),
        )
        .await
        .unwrap();
        assert_eq!(tally.created, 1);

        let category = Table::<CommonsCategory>::get(&store, &"Category:Grave of Jim Morrison".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(category.main_image, "File:Grave.jpg");
        assert_eq!(category.category_members, vec!["File:Grave.jpg", "File:Flowers.jpg"]);
    }

    #[tokio::test]
    async fn test_redirect_is_followed_with_warning() {
        let store = InMemoryStore::new();
        let transport = commons();
        let config = fixtures::config();
        let ctx = SyncContext::new(&store, &transport, &config, &NoProgress, 100);
        let tally = run(
            &ctx,
            SyncKind::WikimediaCommonsCategories,
            Some("Category:Jim Morrison grave"),
        )
        .await
        .unwrap();
        assert_eq!(
            tally.warnings,
            vec!["Category:Jim Morrison grave is a redirection for Category:Grave of Jim Morrison"]
        );

        let category = Table::<CommonsCategory>::get(&store, &"Category:Jim Morrison grave".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(category.main_image, "File:Grave.jpg");
        assert_eq!(category.category_members.len(), 2);
    }

    #[tokio::test]
    async fn test_full_working_set_and_sweep() {
        let store = InMemoryStore::new();
        let mut tally = SyncTally::default();

        let element: OpenStreetMapElement = serde_json::from_value(json!({
            "id": 1, "type": "node", "name": "x", "latitude": 0.0, "longitude": 0.0,
            "wikimedia_commons": "Category:Grave of Jim Morrison"
        }))
        .unwrap();
        upsert(&store, element, 1, &mut tally).await.unwrap();

        let mut painting = WikidataEntry::new("Q1");
        painting.instance_of = vec!["Q3305213".into()];
        painting.wikimedia_commons_category = "Some painting".into();
        upsert(&store, painting, 1, &mut tally).await.unwrap();

        let mut person = WikidataEntry::new("Q2");
        person.instance_of = vec!["Q5".into()];
        person.wikimedia_commons_category = "Jim Morrison".into();
        person.wikimedia_commons_grave_category = "Jim Morrison grave".into();
        upsert(&store, person, 1, &mut tally).await.unwrap();

        upsert(&store, CommonsCategory::new("Category:Stale"), 1, &mut tally)
            .await
            .unwrap();

        let transport = commons();
        let config = fixtures::config();
        let ctx = SyncContext::new(&store, &transport, &config, &NoProgress, 100);
        let tally = run(&ctx, SyncKind::WikimediaCommonsCategories, None)
            .await
            .unwrap();

        let titles: Vec<String> = Table::<CommonsCategory>::all(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(
            titles,
            vec![
                "Category:Grave of Jim Morrison",
                "Category:Jim Morrison",
                "Category:Jim Morrison grave",
            ]
        );
        assert_eq!(tally.deleted, 1);
    }

    #[tokio::test]
    async fn test_ambiguous_redirect_is_fatal() {
        let store = InMemoryStore::new();
        let transport = FakeTransport::new(|_, params| {
            let titles = &params["titles"];
            if titles == "Category:A" {
                return Ok(json!({"query": {"pages": {"1": page("Category:A", "{{Category redirect|B}}")}}}));
            }
            Ok(json!({"query": {"pages": {}}}))
        });
        let config = fixtures::config();
        let ctx = SyncContext::new(&store, &transport, &config, &NoProgress, 100);
        let err = run(&ctx, SyncKind::WikimediaCommonsCategories, Some("Category:A"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("resolved to 0 pages"));
        let record = store
            .synchronization("wikimedia_commons_categories")
            .await
            .unwrap()
            .unwrap();
        assert!(record.errors.contains("resolved to 0 pages"));
    }
}
