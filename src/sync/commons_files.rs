//! Media-repository files: the main image of every persisted category.

use std::collections::BTreeSet;

use anyhow::Result;

use lachaise_sync_core::chunk::{batches, dedup_sorted};
use lachaise_sync_core::extract::extract_file;
use lachaise_sync_core::models::{CommonsCategory, CommonsFile};
use lachaise_sync_core::reconcile::{sweep, upsert, Scope, SyncTally};
use lachaise_sync_core::store::{Store, Table};

use super::{SyncContext, SyncKind};

pub async fn sync<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
    scope: &Scope,
    tally: &mut SyncTally,
) -> Result<()> {
    let titles = match scope {
        Scope::Only(titles) => dedup_sorted(titles.iter().cloned()),
        Scope::Full => dedup_sorted(
            Table::<CommonsCategory>::all(ctx.store)
                .await?
                .into_iter()
                .map(|c| c.main_image),
        ),
    };

    ctx.discovered(SyncKind::WikimediaCommonsFiles, "files", titles.len());
    let width = ctx.config.sync.thumbnail_width;
    let mut touched = BTreeSet::new();
    let mut done = 0;
    for batch in batches(&titles, ctx.batch_size()) {
        let pages = ctx.wiki.image_info(batch, width).await?;
        for (title, page) in &pages {
            upsert(ctx.store, extract_file(title, page), ctx.now, tally).await?;
            touched.insert(title.clone());
        }
        done += batch.len();
        ctx.fetched(SyncKind::WikimediaCommonsFiles, "files", done, titles.len());
    }

    if scope.is_full() {
        sweep::<CommonsFile, _>(ctx.store, &touched, tally).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediawiki::testing::FakeTransport;
    use crate::progress::NoProgress;
    use crate::sync::{fixtures, run};
    use lachaise_sync_core::store::memory::InMemoryStore;
    use serde_json::json;

    fn image_info() -> FakeTransport {
        FakeTransport::new(|_, params| {
            assert_eq!(params["prop"], "imageinfo");
            assert_eq!(params["iiurlwidth"], "280");
            let mut pages = serde_json::Map::new();
            for (i, title) in params["titles"].split('|').enumerate() {
                let name = title.trim_start_matches("File:");
                pages.insert(
                    i.to_string(),
                    json!({"title": title, "imageinfo": [{
                        "url": format!("https://upload.wikimedia.org/{name}"),
                        "thumburl": format!("https://upload.wikimedia.org/thumb/280px-{name}"),
                    }]}),
                );
            }
            Ok(json!({"query": {"pages": pages}}))
        })
    }

    #[tokio::test]
    async fn test_files_of_category_main_images() {
        let store = InMemoryStore::new();
        let mut tally = SyncTally::default();
        let mut with_image = CommonsCategory::new("Category:A");
        with_image.main_image = "File:A.jpg".into();
        upsert(&store, with_image, 1, &mut tally).await.unwrap();
        upsert(&store, CommonsCategory::new("Category:B"), 1, &mut tally)
            .await
            .unwrap();
        upsert(&store, CommonsFile::new("File:Old.jpg"), 1, &mut tally)
            .await
            .unwrap();

        let transport = image_info();
        let config = fixtures::config();
        let ctx = SyncContext::new(&store, &transport, &config, &NoProgress, 100);
        let tally = run(&ctx, SyncKind::WikimediaCommonsFiles, None)
            .await
            .unwrap();

        assert_eq!((tally.created, tally.deleted), (1, 1));
        let files = Table::<CommonsFile>::all(&store).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].title, "File:A.jpg");
        assert_eq!(files[0].original_url, "https://upload.wikimedia.org/A.jpg");
        assert_eq!(
            files[0].thumbnail_url,
            "https://upload.wikimedia.org/thumb/280px-A.jpg"
        );
        assert_eq!(transport.requests()[0].1["titles"], "File:A.jpg");
    }

    #[tokio::test]
    async fn test_scoped_files_keep_others() {
        let store = InMemoryStore::new();
        let mut tally = SyncTally::default();
        upsert(&store, CommonsFile::new("File:Old.jpg"), 1, &mut tally)
            .await
            .unwrap();

        let transport = image_info();
        let config = fixtures::config();
        let ctx = SyncContext::new(&store, &transport, &config, &NoProgress, 100);
        run(&ctx, SyncKind::WikimediaCommonsFiles, Some("File:B.jpg|File:C.jpg"))
            .await
            .unwrap();
        assert_eq!(Table::<CommonsFile>::all(&store).await.unwrap().len(), 3);
    }
}
