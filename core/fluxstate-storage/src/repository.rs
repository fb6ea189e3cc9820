//! Typed view over a [`PersistenceGateway`] for one [`Fields`] collection.

use crate::error::{StorageError, StorageResult};
use crate::gateway::{OrderBy, PersistenceGateway, Predicate, Row, UpsertKey, WriteOp};
use fluxstate_model::{Fields, Record, RemoteRecord};
use fluxstate_types::{LocalId, OwnerId, RemoteId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Reads and writes [`Record<F>`] through a shared gateway.
pub struct Repository<F> {
    gateway: Arc<dyn PersistenceGateway>,
    _fields: PhantomData<fn() -> F>,
}

impl<F> Clone for Repository<F> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            _fields: PhantomData,
        }
    }
}

impl<F: Fields> Repository<F> {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            gateway,
            _fields: PhantomData,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    /// Starts a predicate over this repository's collection.
    pub fn predicate(&self) -> Predicate {
        Predicate::collection(F::COLLECTION)
    }

    /// Persists a new local-only record and returns it with its local id.
    pub fn create(&self, owner_id: OwnerId, fields: F) -> StorageResult<Record<F>> {
        let row = to_row_parts(owner_id, None, true, false, &fields)?;
        let local_id = self.gateway.insert(&row)?;
        Ok(Record {
            local_id,
            owner_id,
            remote_id: None,
            is_local_only: true,
            is_locally_modified: false,
            fields,
        })
    }

    pub fn get(&self, local_id: LocalId) -> StorageResult<Option<Record<F>>> {
        self.first(self.predicate().local_id(local_id), &OrderBy::default())
    }

    pub fn get_by_remote_id(
        &self,
        owner_id: OwnerId,
        remote_id: RemoteId,
    ) -> StorageResult<Option<Record<F>>> {
        self.first(
            self.predicate().owner(owner_id).remote_id(remote_id),
            &OrderBy::default(),
        )
    }

    pub fn get_by_natural_key(
        &self,
        owner_id: OwnerId,
        key: &str,
    ) -> StorageResult<Option<Record<F>>> {
        self.first(
            self.predicate().owner(owner_id).natural_key(key),
            &OrderBy::default(),
        )
    }

    pub fn find(&self, predicate: Predicate, order: &OrderBy) -> StorageResult<Vec<Record<F>>> {
        self.gateway
            .select_where(&predicate, order)?
            .into_iter()
            .map(from_row)
            .collect()
    }

    pub fn first(&self, predicate: Predicate, order: &OrderBy) -> StorageResult<Option<Record<F>>> {
        Ok(self.find(predicate, order)?.into_iter().next())
    }

    pub fn count(&self, predicate: Predicate) -> StorageResult<usize> {
        self.gateway.count_where(&predicate)
    }

    /// Writes the record back under its local id, overwriting every column.
    pub fn save(&self, record: &Record<F>) -> StorageResult<LocalId> {
        self.gateway.upsert(&to_row(record)?, UpsertKey::LocalId)
    }

    /// Stores a server record for `owner_id`, matching an existing row by
    /// remote id, or by natural key when the server sent no id.
    pub fn upsert_remote(&self, owner_id: OwnerId, remote: &RemoteRecord<F>) -> StorageResult<LocalId> {
        let (row, key) = remote_row(owner_id, remote)?;
        self.gateway.upsert(&row, key)
    }

    /// [`upsert_remote`](Self::upsert_remote) for a whole page, atomically.
    pub fn upsert_remote_batch(
        &self,
        owner_id: OwnerId,
        remotes: &[RemoteRecord<F>],
    ) -> StorageResult<usize> {
        if remotes.is_empty() {
            return Ok(0);
        }
        let op = self.upsert_remote_op(owner_id, remotes)?;
        Ok(self.write_all(&[op])?.iter().sum())
    }

    /// Atomically replaces everything `owner_id` holds in this collection.
    pub fn replace_owner(
        &self,
        owner_id: OwnerId,
        remotes: &[RemoteRecord<F>],
    ) -> StorageResult<usize> {
        self.replace_where(self.predicate().owner(owner_id), owner_id, remotes)
    }

    /// Atomically deletes the rows matching `predicate` and stores `remotes`
    /// for `owner_id` in their place. Later records win over earlier ones
    /// with the same identity.
    pub fn replace_where(
        &self,
        predicate: Predicate,
        owner_id: OwnerId,
        remotes: &[RemoteRecord<F>],
    ) -> StorageResult<usize> {
        let op = self.replace_op(predicate, owner_id, remotes)?;
        Ok(self.write_all(&[op])?.iter().sum())
    }

    /// Commits `ops`, possibly spanning several collections, in one
    /// transaction.
    pub fn write_all(&self, ops: &[WriteOp]) -> StorageResult<Vec<usize>> {
        self.gateway.write_all(ops)
    }

    /// The write [`upsert_remote_batch`](Self::upsert_remote_batch) performs.
    /// Every record must match on the same kind of key.
    pub fn upsert_remote_op(
        &self,
        owner_id: OwnerId,
        remotes: &[RemoteRecord<F>],
    ) -> StorageResult<WriteOp> {
        let key = remotes.first().map_or(UpsertKey::NaturalKey, upsert_key_for);
        let rows = remotes
            .iter()
            .map(|remote| {
                if upsert_key_for(remote) != key {
                    return Err(StorageError::InvalidData(format!(
                        "{} page mixes keyed and identified records",
                        F::COLLECTION
                    )));
                }
                remote_row(owner_id, remote).map(|(row, _)| row)
            })
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(WriteOp::Upsert { rows, key })
    }

    /// The write [`replace_where`](Self::replace_where) performs.
    pub fn replace_op(
        &self,
        predicate: Predicate,
        owner_id: OwnerId,
        remotes: &[RemoteRecord<F>],
    ) -> StorageResult<WriteOp> {
        let rows = remotes
            .iter()
            .map(|remote| remote_row(owner_id, remote).map(|(row, _)| row))
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(WriteOp::Replace { predicate, rows })
    }

    /// The write [`save`](Self::save) performs.
    pub fn save_op(&self, record: &Record<F>) -> StorageResult<WriteOp> {
        Ok(WriteOp::Upsert {
            rows: vec![to_row(record)?],
            key: UpsertKey::LocalId,
        })
    }

    /// The write [`remove`](Self::remove) performs.
    pub fn remove_op(&self, local_id: LocalId) -> WriteOp {
        WriteOp::Delete(self.predicate().local_id(local_id))
    }

    /// Deletes the record with this local id. Returns whether a row existed.
    pub fn remove(&self, local_id: LocalId) -> StorageResult<bool> {
        Ok(self.gateway.delete_where(&self.predicate().local_id(local_id))? > 0)
    }

    pub fn remove_where(&self, predicate: Predicate) -> StorageResult<usize> {
        self.gateway.delete_where(&predicate)
    }
}

fn upsert_key_for<F>(remote: &RemoteRecord<F>) -> UpsertKey {
    if remote.remote_id.is_some() {
        UpsertKey::RemoteId
    } else {
        UpsertKey::NaturalKey
    }
}

fn remote_row<F: Fields>(owner_id: OwnerId, remote: &RemoteRecord<F>) -> StorageResult<(Row, UpsertKey)> {
    let key = upsert_key_for(remote);
    let row = to_row_parts(owner_id, remote.remote_id, false, false, &remote.fields)?;
    if key == UpsertKey::NaturalKey && row.natural_key.is_none() {
        return Err(StorageError::InvalidData(format!(
            "{} record has neither remote id nor natural key",
            F::COLLECTION
        )));
    }
    Ok((row, key))
}

fn to_row_parts<F: Fields>(
    owner_id: OwnerId,
    remote_id: Option<RemoteId>,
    is_local_only: bool,
    is_locally_modified: bool,
    fields: &F,
) -> StorageResult<Row> {
    Ok(Row {
        local_id: None,
        collection: F::COLLECTION.to_string(),
        owner_id,
        remote_id,
        natural_key: fields.natural_key(),
        is_local_only,
        is_locally_modified,
        data: serde_json::to_value(fields)?,
    })
}

/// Converts a typed record into a gateway row.
pub fn to_row<F: Fields>(record: &Record<F>) -> StorageResult<Row> {
    let mut row = to_row_parts(
        record.owner_id,
        record.remote_id,
        record.is_local_only,
        record.is_locally_modified,
        &record.fields,
    )?;
    row.local_id = Some(record.local_id);
    Ok(row)
}

/// Converts a gateway row back into a typed record.
pub fn from_row<F: Fields>(row: Row) -> StorageResult<Record<F>> {
    if row.collection != F::COLLECTION {
        return Err(StorageError::InvalidData(format!(
            "row from {} read as {}",
            row.collection,
            F::COLLECTION
        )));
    }
    let local_id = row
        .local_id
        .ok_or_else(|| StorageError::InvalidData("row without local id".to_string()))?;
    Ok(Record {
        local_id,
        owner_id: row.owner_id,
        remote_id: row.remote_id,
        is_local_only: row.is_local_only,
        is_locally_modified: row.is_locally_modified,
        fields: serde_json::from_value(row.data)?,
    })
}
