//! Merging server results into local state.
//!
//! Each function applies one kind of successful remote result through a
//! [`Repository`] and reports what it wrote. None of them publish; stores
//! call them from inside [`ChangeEmitter::complete`](crate::ChangeEmitter::complete).

use crate::event::Applied;
use fluxstate_model::{Fields, Record, RemoteRecord, can_load_more};
use fluxstate_storage::{OrderBy, Repository, StorageError, StorageResult, WriteOp};
use fluxstate_types::{LocalId, OwnerId, RemoteId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Result of fetching a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "F: Fields")]
pub enum FetchOutcome<F> {
    Found(RemoteRecord<F>),
    /// The server no longer has the record.
    Gone,
}

/// Result of deleting a record remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "F: Fields")]
pub enum DeleteOutcome<F> {
    /// Moved to a terminal status; the server copy is kept.
    Trashed(RemoteRecord<F>),
    /// Permanently removed.
    Removed,
}

/// Applies the server copy returned by a push of `local_id`.
///
/// A local-only record keeps the fields the server does not echo. Either
/// way the record ends up synced and unmodified. If the local row vanished
/// while the push was in flight, the server copy is stored by remote id.
pub fn apply_push_result<F: Fields>(
    repo: &Repository<F>,
    owner_id: OwnerId,
    local_id: LocalId,
    pushed: RemoteRecord<F>,
) -> StorageResult<Applied> {
    let remote_id = pushed.remote_id.ok_or_else(|| {
        StorageError::InvalidData(format!(
            "pushed {} record {local_id} came back without a remote id",
            F::COLLECTION
        ))
    })?;

    let Some(local) = repo.get(local_id)? else {
        debug!("{} {local_id} vanished during push, storing {remote_id}", F::COLLECTION);
        let stored = repo.upsert_remote(owner_id, &RemoteRecord::new(remote_id, pushed.fields))?;
        return Ok(Applied::record(stored));
    };

    let mut fields = pushed.fields;
    if local.is_local_only {
        fields.keep_unechoed(&local.fields);
    }
    overwrite(repo, local, Some(remote_id), fields)
}

/// Applies the result of fetching one record.
///
/// `Found` overwrites the local copy (matched by `local_id` when known,
/// else by remote id). `Gone` removes the local row.
pub fn apply_fetched_one<F: Fields>(
    repo: &Repository<F>,
    owner_id: OwnerId,
    local_id: Option<LocalId>,
    outcome: FetchOutcome<F>,
) -> StorageResult<Applied> {
    match outcome {
        FetchOutcome::Found(remote) => {
            if let Some(local) = local_id.map(|id| repo.get(id)).transpose()?.flatten() {
                let remote_id = remote.remote_id.or(local.remote_id);
                return overwrite(repo, local, remote_id, remote.fields);
            }
            Ok(Applied::record(repo.upsert_remote(owner_id, &remote)?))
        }
        FetchOutcome::Gone => {
            let removed = match local_id {
                Some(id) => usize::from(repo.remove(id)?),
                None => 0,
            };
            Ok(Applied {
                local_id,
                rows_affected: Some(removed),
                can_load_more: None,
            })
        }
    }
}

/// Merges one page of a list fetch.
///
/// Additive: rows missing from the page are left alone, and rows with
/// unpushed local edits are not overwritten. The page is written in one
/// transaction.
pub fn apply_fetched_page<F: Fields>(
    repo: &Repository<F>,
    owner_id: OwnerId,
    page: &[RemoteRecord<F>],
    page_size: usize,
) -> StorageResult<Applied> {
    let modified: HashSet<RemoteId> = repo
        .find(
            repo.predicate().owner(owner_id).locally_modified(true),
            &OrderBy::default(),
        )?
        .into_iter()
        .filter_map(|r| r.remote_id)
        .collect();

    let merge: Vec<RemoteRecord<F>> = page
        .iter()
        .filter(|r| r.remote_id.is_none_or(|id| !modified.contains(&id)))
        .cloned()
        .collect();
    if merge.len() != page.len() {
        debug!(
            "kept {} locally modified {} rows out of fetched page",
            page.len() - merge.len(),
            F::COLLECTION
        );
    }

    let merged = repo.upsert_remote_batch(owner_id, &merge)?;
    Ok(Applied::rows(merged).with_can_load_more(can_load_more(page.len(), page_size)))
}

/// Applies the result of deleting `local_id` remotely.
pub fn apply_deleted<F: Fields>(
    repo: &Repository<F>,
    owner_id: OwnerId,
    local_id: LocalId,
    outcome: DeleteOutcome<F>,
) -> StorageResult<Applied> {
    match outcome {
        DeleteOutcome::Trashed(remote) => match repo.get(local_id)? {
            Some(local) => {
                let remote_id = remote.remote_id.or(local.remote_id);
                overwrite(repo, local, remote_id, remote.fields)
            }
            None => Ok(Applied::record(repo.upsert_remote(owner_id, &remote)?)),
        },
        DeleteOutcome::Removed => {
            let removed = repo.remove(local_id)?;
            Ok(Applied {
                local_id: Some(local_id),
                rows_affected: Some(usize::from(removed)),
                can_load_more: None,
            })
        }
    }
}

/// Atomically replaces an owner's whole collection with the server's list.
pub fn replace_collection<F: Fields>(
    repo: &Repository<F>,
    owner_id: OwnerId,
    records: &[RemoteRecord<F>],
) -> StorageResult<Applied> {
    Ok(Applied::rows(repo.replace_owner(owner_id, records)?))
}

/// Writes server fields over `local`, leaving it synced and clean.
///
/// Any row already holding the remote id (a list fetch landed first) is
/// dropped in the same transaction; `local` is written back under its own
/// local id.
fn overwrite<F: Fields>(
    repo: &Repository<F>,
    local: Record<F>,
    remote_id: Option<RemoteId>,
    fields: F,
) -> StorageResult<Applied> {
    let record = Record {
        local_id: local.local_id,
        owner_id: local.owner_id,
        remote_id,
        is_local_only: remote_id.is_none() && local.is_local_only,
        is_locally_modified: false,
        fields,
    };

    let mut ops = Vec::with_capacity(2);
    if let Some(remote_id) = remote_id {
        ops.push(WriteOp::Delete(
            repo.predicate().owner(local.owner_id).remote_id(remote_id),
        ));
    }
    ops.push(repo.save_op(&record)?);
    let touched = repo.write_all(&ops)?;
    let own = usize::from(local.remote_id == remote_id);
    if remote_id.is_some() && touched.first().is_some_and(|&removed| removed > own) {
        debug!("dropped duplicate {} row for {remote_id:?}", F::COLLECTION);
    }
    Ok(Applied::record(record.local_id))
}
