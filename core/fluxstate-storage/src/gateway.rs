//! The persistence gateway contract.
//!
//! Stores never hold records in memory; every read and write goes through a
//! [`PersistenceGateway`]. Rows are untyped here (domain fields are a JSON
//! value); [`Repository`](crate::Repository) layers the typed view on top.

use crate::error::StorageResult;
use fluxstate_types::{LocalId, OwnerId, RemoteId};
use serde_json::Value;

/// One stored row.
///
/// `local_id` is `None` only for rows that have not been written yet; every
/// row read back from a gateway carries one.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub local_id: Option<LocalId>,
    pub collection: String,
    pub owner_id: OwnerId,
    pub remote_id: Option<RemoteId>,
    pub natural_key: Option<String>,
    pub is_local_only: bool,
    pub is_locally_modified: bool,
    pub data: Value,
}

/// Which identity an upsert matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKey {
    /// The row's `local_id`. A row without one is inserted.
    LocalId,
    /// `(collection, owner_id, remote_id)`. The row must carry a remote id.
    RemoteId,
    /// `(collection, owner_id, natural_key)`. The row must carry a natural key.
    NaturalKey,
}

/// A single filter condition. Clauses in a [`Predicate`] are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Owner(OwnerId),
    LocalId(LocalId),
    RemoteId(RemoteId),
    NaturalKey(String),
    LocalOnly(bool),
    LocallyModified(bool),
    /// Equality on a top-level field of the JSON data.
    FieldEq(String, Value),
}

/// Selects rows within one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    collection: String,
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Every row of a collection.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            clauses: Vec::new(),
        }
    }

    pub fn owner(self, owner_id: OwnerId) -> Self {
        self.and(Clause::Owner(owner_id))
    }

    pub fn local_id(self, local_id: LocalId) -> Self {
        self.and(Clause::LocalId(local_id))
    }

    pub fn remote_id(self, remote_id: RemoteId) -> Self {
        self.and(Clause::RemoteId(remote_id))
    }

    pub fn natural_key(self, key: impl Into<String>) -> Self {
        self.and(Clause::NaturalKey(key.into()))
    }

    pub fn local_only(self, flag: bool) -> Self {
        self.and(Clause::LocalOnly(flag))
    }

    pub fn locally_modified(self, flag: bool) -> Self {
        self.and(Clause::LocallyModified(flag))
    }

    pub fn field_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Clause::FieldEq(field.into(), value.into()))
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Result ordering. Ties are always broken by ascending local id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    LocalId(Direction),
    /// A top-level field of the JSON data.
    Field(String, Direction),
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self::Field(field.into(), Direction::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::Field(field.into(), Direction::Desc)
    }
}

impl Default for OrderBy {
    fn default() -> Self {
        Self::LocalId(Direction::Asc)
    }
}

/// One write inside a [`PersistenceGateway::write_all`] transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// `upsert` every row by `key`.
    Upsert { rows: Vec<Row>, key: UpsertKey },
    /// Delete the rows matching `predicate`, then store `rows`. A row
    /// repeating an earlier row's remote id or natural key overwrites it.
    Replace { predicate: Predicate, rows: Vec<Row> },
    Delete(Predicate),
}

impl WriteOp {
    pub fn collection_name(&self) -> Option<&str> {
        match self {
            Self::Upsert { rows, .. } => rows.first().map(|r| r.collection.as_str()),
            Self::Replace { predicate, .. } | Self::Delete(predicate) => {
                Some(predicate.collection_name())
            }
        }
    }
}

/// Durable keyed storage for domain records.
///
/// Implementations must be callable synchronously from inside action
/// handling: no call may block on, or call back into, the dispatcher.
/// Single-row writes are atomic; `write_all` commits every op it is given
/// in one transaction, or none of them.
pub trait PersistenceGateway: Send + Sync {
    /// Inserts a new row and returns its freshly assigned local id.
    /// Any `local_id` on the row is ignored.
    fn insert(&self, row: &Row) -> StorageResult<LocalId>;

    /// Inserts the row if no row matches `key`, else updates every column
    /// of the matching row except its local id. Returns the row's local id.
    fn upsert(&self, row: &Row, key: UpsertKey) -> StorageResult<LocalId>;

    fn delete_where(&self, predicate: &Predicate) -> StorageResult<usize>;

    fn count_where(&self, predicate: &Predicate) -> StorageResult<usize>;

    fn select_where(&self, predicate: &Predicate, order: &OrderBy) -> StorageResult<Vec<Row>>;

    /// Applies `ops` in order, in one transaction. Returns the rows each op
    /// touched: distinct rows stored for upserts and replaces, rows removed
    /// for deletes.
    fn write_all(&self, ops: &[WriteOp]) -> StorageResult<Vec<usize>>;

    /// `upsert` for every row, in one transaction. Returns the number of rows written.
    fn upsert_batch(&self, rows: &[Row], key: UpsertKey) -> StorageResult<usize> {
        let op = WriteOp::Upsert {
            rows: rows.to_vec(),
            key,
        };
        Ok(self.write_all(&[op])?.iter().sum())
    }

    /// Deletes every row matching `predicate` and stores `rows`, in one
    /// transaction. Returns the number of rows stored.
    fn replace_where(&self, predicate: &Predicate, rows: &[Row]) -> StorageResult<usize> {
        let op = WriteOp::Replace {
            predicate: predicate.clone(),
            rows: rows.to_vec(),
        };
        Ok(self.write_all(&[op])?.iter().sum())
    }

    fn upsert_by_local_id(&self, row: &Row) -> StorageResult<LocalId> {
        self.upsert(row, UpsertKey::LocalId)
    }

    fn upsert_by_remote_id(&self, row: &Row) -> StorageResult<LocalId> {
        self.upsert(row, UpsertKey::RemoteId)
    }

    fn upsert_by_natural_key(&self, row: &Row) -> StorageResult<LocalId> {
        self.upsert(row, UpsertKey::NaturalKey)
    }
}
