use crate::Fields;
use fluxstate_types::{LocalId, OwnerId, RemoteId};
use serde::{Deserialize, Serialize};

/// A domain record as persisted locally.
///
/// The bookkeeping columns are shared by every domain; `fields` holds the
/// domain data. `is_local_only` implies `remote_id` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "F: Fields")]
pub struct Record<F> {
    pub local_id: LocalId,
    pub owner_id: OwnerId,
    pub remote_id: Option<RemoteId>,
    pub is_local_only: bool,
    pub is_locally_modified: bool,
    pub fields: F,
}

impl<F: Fields> Record<F> {
    /// Whether the remote service has confirmed this record at least once.
    pub fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }

    /// The natural key of the domain fields, if the domain defines one.
    pub fn natural_key(&self) -> Option<String> {
        self.fields.natural_key()
    }

    /// Applies a change to the domain fields in place.
    pub fn edit(&mut self, change: impl FnOnce(&mut F)) -> &mut Self {
        change(&mut self.fields);
        self
    }
}

/// The server-canonical form of a record, as returned by a remote service.
///
/// It has no local identity. Collections keyed only by a natural key (site
/// plugins) come back without a remote id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "F: Fields")]
pub struct RemoteRecord<F> {
    pub remote_id: Option<RemoteId>,
    pub fields: F,
}

impl<F: Fields> RemoteRecord<F> {
    /// A record identified by the server's id.
    pub fn new(remote_id: RemoteId, fields: F) -> Self {
        Self {
            remote_id: Some(remote_id),
            fields,
        }
    }

    /// A record identified only by its natural key.
    pub fn keyed(fields: F) -> Self {
        Self {
            remote_id: None,
            fields,
        }
    }

    /// The local form of this server record: synced and unmodified.
    pub fn into_record(self, local_id: LocalId, owner_id: OwnerId) -> Record<F> {
        Record {
            local_id,
            owner_id,
            remote_id: self.remote_id,
            is_local_only: false,
            is_locally_modified: false,
            fields: self.fields,
        }
    }
}
