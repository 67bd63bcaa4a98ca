//! Batch progress reporting for `lsync sync`.
//!
//! Progress goes to **stderr** so the stdout summary stays parseable.
//! Each sync reports its working set once, then one event per fetched
//! batch: `sync wikidata  entries  25 / 1,204`.

use std::io::{IsTerminal, Write};

/// A single progress event.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncProgressEvent {
    /// Working set computed for a phase; nothing fetched yet.
    Discovered {
        sync: &'static str,
        phase: &'static str,
        total: u64,
    },
    /// `n` identifiers of the phase fetched and reconciled.
    Fetching {
        sync: &'static str,
        phase: &'static str,
        n: u64,
        total: u64,
    },
}

pub trait SyncProgressReporter: Send + Sync {
    fn report(&self, event: SyncProgressEvent);
}

/// Human-friendly lines on stderr.
pub struct StderrProgress;

impl SyncProgressReporter for StderrProgress {
    fn report(&self, event: SyncProgressEvent) {
        let line = match &event {
            SyncProgressEvent::Discovered { sync, phase, total } => {
                format!("sync {}  {}  {} to fetch\n", sync, phase, format_number(*total))
            }
            SyncProgressEvent::Fetching {
                sync,
                phase,
                n,
                total,
            } => format!(
                "sync {}  {}  {} / {}\n",
                sync,
                phase,
                format_number(*n),
                format_number(*total)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonProgress;

impl SyncProgressReporter for JsonProgress {
    fn report(&self, event: SyncProgressEvent) {
        let obj = match &event {
            SyncProgressEvent::Discovered { sync, phase, total } => serde_json::json!({
                "event": "progress",
                "sync": sync,
                "phase": phase,
                "total": total
            }),
            SyncProgressEvent::Fetching {
                sync,
                phase,
                n,
                total,
            } => serde_json::json!({
                "event": "progress",
                "sync": sync,
                "phase": phase,
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode selected on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a terminal, otherwise off.
    pub fn default_for_tty() -> Self {
        if std::io::stderr().is_terminal() {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn SyncProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
