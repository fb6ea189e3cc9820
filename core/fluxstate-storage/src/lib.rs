//! Persistence layer for fluxstate.
//!
//! Stores keep no authoritative in-memory copies of records: every read and
//! write goes through a [`PersistenceGateway`].
//!
//! # Architecture
//!
//! - [`PersistenceGateway`] is the untyped contract: rows, predicates,
//!   upserts keyed by local id, remote id, or natural key
//! - [`SqliteGateway`] implements it over a single SQLite table, with domain
//!   fields stored as JSON
//! - [`Repository`] gives stores a typed [`Record`](fluxstate_model::Record)
//!   view of one collection

mod error;
mod gateway;
mod repository;
mod sqlite;

pub use error::{StorageError, StorageResult};
pub use gateway::{
    Clause, Direction, OrderBy, PersistenceGateway, Predicate, Row, UpsertKey, WriteOp,
};
pub use repository::{Repository, from_row, to_row};
pub use sqlite::SqliteGateway;
