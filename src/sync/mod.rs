//! Synchronization runs.
//!
//! Each [`SyncKind`] pulls one source into the store through the
//! reconciliation engine of `lachaise_sync_core::reconcile`:
//!
//! | Kind | Reads | Writes |
//! |------|-------|--------|
//! | `wikidata` | map elements, persisted grave-of lists | entries, localized entries |
//! | `wikimedia_commons_categories` | map elements, entries | categories |
//! | `wikimedia_commons_files` | category main images | files |
//! | `wikipedia` | localized entries | encyclopedia pages |
//! | `wikidata_occupations` | entry occupation codes | occupations, links |
//!
//! [`run`] always records the outcome in the kind's `synchronizations` row,
//! including when the run fails; the error is returned afterwards.

pub mod commons_categories;
pub mod commons_files;
pub mod occupations;
pub mod osm;
pub mod wikidata;
pub mod wikipedia;

use anyhow::{bail, Result};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use lachaise_sync_core::reconcile::{Scope, SyncTally};
use lachaise_sync_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::mediawiki::{HttpTransport, MediaWiki, Transport};
use crate::progress::{SyncProgressEvent, SyncProgressReporter};
use crate::sqlite_store::SqliteStore;

/// The synchronizations, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Wikidata,
    WikimediaCommonsCategories,
    WikimediaCommonsFiles,
    Wikipedia,
    WikidataOccupations,
}

impl SyncKind {
    pub const ALL: [SyncKind; 5] = [
        SyncKind::Wikidata,
        SyncKind::WikimediaCommonsCategories,
        SyncKind::WikimediaCommonsFiles,
        SyncKind::Wikipedia,
        SyncKind::WikidataOccupations,
    ];

    /// Name of the bookkeeping row and of the CLI argument.
    pub fn name(&self) -> &'static str {
        match self {
            SyncKind::Wikidata => "wikidata",
            SyncKind::WikimediaCommonsCategories => "wikimedia_commons_categories",
            SyncKind::WikimediaCommonsFiles => "wikimedia_commons_files",
            SyncKind::Wikipedia => "wikipedia",
            SyncKind::WikidataOccupations => "wikidata_occupations",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match Self::ALL.iter().find(|k| k.name() == name) {
            Some(kind) => Ok(*kind),
            None => bail!(
                "Unknown sync: '{}'. Available: {}, all",
                name,
                Self::ALL.map(|k| k.name()).join(", ")
            ),
        }
    }

    /// Whether the kind accepts an explicit `--only` list.
    pub fn accepts_override(&self) -> bool {
        !matches!(self, SyncKind::WikidataOccupations)
    }
}

/// Everything a run needs: the store, the remote client and settings.
pub struct SyncContext<'a, S: Store + ?Sized> {
    pub store: &'a S,
    pub wiki: MediaWiki<'a>,
    pub config: &'a Config,
    pub progress: &'a dyn SyncProgressReporter,
    /// Timestamp stamped on every record written by the run.
    pub now: i64,
}

impl<'a, S: Store + ?Sized> SyncContext<'a, S> {
    pub fn new(
        store: &'a S,
        transport: &'a dyn Transport,
        config: &'a Config,
        progress: &'a dyn SyncProgressReporter,
        now: i64,
    ) -> Self {
        Self {
            store,
            wiki: MediaWiki::new(transport, &config.mediawiki),
            config,
            progress,
            now,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.config.mediawiki.batch_size
    }

    pub fn languages(&self) -> &[String] {
        &self.config.sync.languages
    }

    pub(crate) fn discovered(&self, sync: SyncKind, phase: &'static str, total: usize) {
        info!(phase, total, "working set");
        self.progress.report(SyncProgressEvent::Discovered {
            sync: sync.name(),
            phase,
            total: total as u64,
        });
    }

    pub(crate) fn fetched(&self, sync: SyncKind, phase: &'static str, n: usize, total: usize) {
        self.progress.report(SyncProgressEvent::Fetching {
            sync: sync.name(),
            phase,
            n: n as u64,
            total: total as u64,
        });
    }
}

/// Run one synchronization and record its outcome.
///
/// `only` is a `|`-delimited override list; without it the run covers the
/// whole derived working set and deletes what it did not touch.
pub async fn run<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
    kind: SyncKind,
    only: Option<&str>,
) -> Result<SyncTally> {
    if only.is_some() && !kind.accepts_override() {
        bail!("{} always runs in full and does not accept --only", kind.name());
    }
    let scope = Scope::from_override(only);
    let span = info_span!("sync", name = kind.name(), run = %Uuid::new_v4());

    async move {
        info!(full = scope.is_full(), "start");
        let mut tally = SyncTally::default();
        let result = match kind {
            SyncKind::Wikidata => wikidata::sync(ctx, &scope, &mut tally).await,
            SyncKind::WikimediaCommonsCategories => {
                commons_categories::sync(ctx, &scope, &mut tally).await
            }
            SyncKind::WikimediaCommonsFiles => commons_files::sync(ctx, &scope, &mut tally).await,
            SyncKind::Wikipedia => wikipedia::sync(ctx, &scope, &mut tally).await,
            SyncKind::WikidataOccupations => occupations::sync(ctx, &mut tally).await,
        };

        let mut record = tally.to_synchronization(kind.name(), ctx.now);
        if let Err(e) = &result {
            error!(error = %format!("{e:#}"), "failed");
            record.errors = format!("{e:#}");
        }
        ctx.store.save_synchronization(&record).await?;
        result?;

        info!(
            created = tally.created,
            modified = tally.modified,
            deleted = tally.deleted,
            warnings = tally.warnings.len(),
            "end"
        );
        Ok(tally)
    }
    .instrument(span)
    .await
}

/// Run every synchronization in dependency order, stopping at the first
/// failure.
pub async fn run_all<S: Store + ?Sized>(
    ctx: &SyncContext<'_, S>,
) -> Result<Vec<(SyncKind, SyncTally)>> {
    let mut results = Vec::with_capacity(SyncKind::ALL.len());
    for kind in SyncKind::ALL {
        let tally = run(ctx, kind, None).await?;
        results.push((kind, tally));
    }
    Ok(results)
}

/// Entry point of `lsync sync <target>`.
///
/// `target` is a kind name or `all`. Prints one summary block per kind.
/// When the HTTP client cannot be built (no user agent configured) every
/// targeted kind still records the failure before the error is returned.
pub async fn run_command(
    config: &Config,
    target: &str,
    only: Option<&str>,
    progress: &dyn SyncProgressReporter,
) -> Result<()> {
    let kinds: Vec<SyncKind> = if target == "all" {
        if only.is_some() {
            bail!("--only cannot be combined with 'all'");
        }
        SyncKind::ALL.to_vec()
    } else {
        vec![SyncKind::parse(target)?]
    };

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let now = chrono::Utc::now().timestamp();

    let transport = match HttpTransport::new(&config.mediawiki) {
        Ok(transport) => transport,
        Err(e) => {
            for kind in &kinds {
                let mut record = SyncTally::default().to_synchronization(kind.name(), now);
                record.errors = e.to_string();
                store.save_synchronization(&record).await?;
            }
            store.pool().close().await;
            return Err(e.into());
        }
    };

    let ctx = SyncContext::new(&store, &transport, config, progress, now);
    let mut outcome = Ok(());
    for kind in kinds {
        match run(&ctx, kind, only).await {
            Ok(tally) => print_summary(kind, &tally),
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }

    store.pool().close().await;
    outcome
}

fn print_summary(kind: SyncKind, tally: &SyncTally) {
    println!("sync {}", kind.name());
    println!("  created: {}", tally.created);
    println!("  modified: {}", tally.modified);
    println!("  deleted: {}", tally.deleted);
    if !tally.warnings.is_empty() {
        println!("  warnings: {}", tally.warnings.len());
        for warning in &tally.warnings {
            println!("    {}", warning);
        }
    }
    println!("ok");
}
