//! Create / modify / delete reconciliation against persisted state.
//!
//! # Per-record decision
//!
//! | Stored | Field diff | Outcome | Write |
//! |--------|------------|---------|-------|
//! | absent | –          | [`Outcome::Created`]   | yes |
//! | present | any field differs | [`Outcome::Modified`] | yes, all fields |
//! | present | identical | [`Outcome::Unchanged`] | no |
//!
//! A modified record is counted once however many fields changed, and
//! keeps its original `created_at`.
//!
//! # Run scope
//!
//! A run is either [`Scope::Full`], derived from persisted state and
//! followed by a tombstone sweep, or [`Scope::Only`] an explicit override
//! list, which never deletes anything.

use std::collections::BTreeSet;

use anyhow::Result;
use tracing::{debug, warn};

use crate::chunk::split_pipe;
use crate::error::ReconcileError;
use crate::fields::{changed_fields, overwrite, Record};
use crate::models::Synchronization;
use crate::store::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Modified,
    Unchanged,
}

/// Decide what to persist for `incoming` given the currently `stored` record.
///
/// Returns the record to write (or, when unchanged, the stored record as is)
/// together with the outcome.
pub fn reconcile<R: Record>(
    stored: Option<R>,
    mut incoming: R,
    now: i64,
) -> Result<(R, Outcome), ReconcileError> {
    let Some(mut stored) = stored else {
        incoming.stamp(now, now);
        return Ok((incoming, Outcome::Created));
    };

    let changed = changed_fields(&stored, &incoming);
    if changed.is_empty() {
        return Ok((stored, Outcome::Unchanged));
    }

    debug!(kind = R::KIND, key = ?stored.key(), fields = ?changed, "modified");
    overwrite(&mut stored, &incoming)?;
    let created_at = stored.created_at();
    stored.stamp(created_at, now);
    Ok((stored, Outcome::Modified))
}

/// Running counters and soft warnings of one synchronization run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncTally {
    pub created: u64,
    pub modified: u64,
    pub deleted: u64,
    pub warnings: Vec<String>,
}

impl SyncTally {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Modified => self.modified += 1,
            Outcome::Unchanged => {}
        }
    }

    /// Record a soft warning; the run carries on.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// Fold the counters of another run into this one.
    pub fn absorb(&mut self, other: SyncTally) {
        self.created += other.created;
        self.modified += other.modified;
        self.deleted += other.deleted;
        self.warnings.extend(other.warnings);
    }

    /// Bookkeeping row for a run that completed.
    pub fn to_synchronization(&self, name: &str, executed_at: i64) -> Synchronization {
        Synchronization {
            name: name.to_string(),
            last_executed: Some(executed_at),
            created_objects: self.created,
            modified_objects: self.modified,
            deleted_objects: self.deleted,
            errors: self.warnings.join(", "),
        }
    }
}

/// Whether a run covers the whole derived working set or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Full,
    Only(Vec<String>),
}

impl Scope {
    /// `None` means a full run. An override is a `|`-delimited list.
    pub fn from_override(only: Option<&str>) -> Self {
        match only {
            None => Scope::Full,
            Some(list) => Scope::Only(split_pipe(list)),
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Scope::Full)
    }
}

/// Codes referenced by fetched records that need a follow-up fetch.
///
/// A discovered code is queued when it is not in the working set and not
/// queued already. Scoped runs additionally skip codes that are already
/// persisted; full runs must refetch them or the sweep would delete them.
pub fn secondary_queue<'a, I>(
    working_set: &BTreeSet<String>,
    discovered: I,
    persisted: &BTreeSet<String>,
    scope: &Scope,
) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut queued = BTreeSet::new();
    for code in discovered {
        if code.is_empty() || working_set.contains(code) {
            continue;
        }
        if !scope.is_full() && persisted.contains(code) {
            continue;
        }
        queued.insert(code.clone());
    }
    queued.into_iter().collect()
}

/// Reconcile `incoming` against `table` and write it unless unchanged.
pub async fn upsert<R, T>(table: &T, incoming: R, now: i64, tally: &mut SyncTally) -> Result<R>
where
    R: Record,
    T: Table<R> + ?Sized,
{
    let stored = table.get(&incoming.key()).await?;
    let (record, outcome) = reconcile(stored, incoming, now)?;
    if outcome != Outcome::Unchanged {
        table.save(&record).await?;
    }
    tally.record(outcome);
    Ok(record)
}

/// Delete every persisted record whose key was not touched by the run.
pub async fn sweep<R, T>(table: &T, touched: &BTreeSet<R::Key>, tally: &mut SyncTally) -> Result<()>
where
    R: Record,
    T: Table<R> + ?Sized,
{
    for record in table.all().await? {
        let key = record.key();
        if !touched.contains(&key) {
            debug!(kind = R::KIND, key = ?key, "deleted");
            table.delete(&key).await?;
            tally.deleted += 1;
        }
    }
    Ok(())
}
