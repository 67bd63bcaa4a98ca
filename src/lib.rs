//! # lachaise-sync
//!
//! Keeps a local SQLite mirror of the Wikidata, Wikimedia Commons and
//! Wikipedia records linked from the OpenStreetMap graves of the
//! Père Lachaise cemetery, and serves it as a read-only JSON API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │ OSM export   │──▶│  Reconcile   │──▶│  SQLite   │
//! │ MediaWiki    │   │ upsert/sweep │   │  tables   │
//! └──────────────┘   └──────────────┘   └─────┬─────┘
//!                                             │
//!                         ┌───────────────────┤
//!                         ▼                   ▼
//!                    ┌──────────┐       ┌──────────┐
//!                    │   CLI    │       │   HTTP   │
//!                    │ (lsync)  │       │   API    │
//!                    └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lsync init
//! lsync osm import elements.json
//! lsync sync all
//! lsync sync wikidata --only "Q44301|Q1048"
//! lsync serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` |
//! | [`mediawiki`] | MediaWiki API client with continuation handling |
//! | [`sync`] | The synchronizations and the OSM import |
//! | [`progress`] | Progress reporting for long runs |
//! | [`server`] | Read-only HTTP API |
//! | [`export`] | JSON dump of every table |
//! | [`stats`] | `lsync status` overview |

pub mod config;
pub mod db;
pub mod export;
pub mod mediawiki;
pub mod migrate;
pub mod progress;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod sync;
