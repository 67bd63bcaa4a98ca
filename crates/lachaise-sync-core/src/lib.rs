//! # lachaise-sync core
//!
//! Runtime-free logic for lachaise-sync: data models, field descriptors,
//! the reconciliation engine, the per-source extractors, the lead-section
//! parser and the store abstraction.
//!
//! This crate contains no tokio, sqlx, HTTP client or filesystem I/O. The
//! application crate supplies the transport and the SQLite store.

pub mod chunk;
pub mod error;
pub mod extract;
pub mod fields;
pub mod lead;
pub mod models;
pub mod reconcile;
pub mod store;
