use crate::posts::model::{Post, PostFields};
use fluxstate_engine::{ChangeEvent, DeleteOutcome, DomainAction, FetchOutcome};
use fluxstate_model::RemoteRecord;
use fluxstate_types::{ActionError, LocalId, OwnerId};

/// Requests and results handled by the [`PostStore`](crate::PostStore).
///
/// Every request kind that goes to the server has a paired result kind that
/// the remote client dispatches when it completes.
#[derive(Debug, Clone)]
pub enum PostAction {
    /// Create an empty local draft.
    Instantiate { owner_id: OwnerId, is_page: bool },
    /// Save local edits.
    Update(Post),
    /// Delete the local row without contacting the server.
    Remove(Post),

    FetchList {
        owner_id: OwnerId,
        pages: bool,
        load_more: bool,
    },
    FetchedList {
        owner_id: OwnerId,
        pages: bool,
        load_more: bool,
        outcome: Result<Vec<RemoteRecord<PostFields>>, ActionError>,
    },

    FetchOne(Post),
    FetchedOne {
        owner_id: OwnerId,
        local_id: Option<LocalId>,
        outcome: Result<FetchOutcome<PostFields>, ActionError>,
    },

    Push(Post),
    Pushed {
        owner_id: OwnerId,
        local_id: LocalId,
        outcome: Result<RemoteRecord<PostFields>, ActionError>,
    },

    Delete(Post),
    Deleted {
        owner_id: OwnerId,
        local_id: LocalId,
        outcome: Result<DeleteOutcome<PostFields>, ActionError>,
    },
}

impl DomainAction for PostAction {
    const DOMAIN: &'static str = "posts";

    fn name(&self) -> &'static str {
        match self {
            Self::Instantiate { .. } => "Instantiate",
            Self::Update(_) => "Update",
            Self::Remove(_) => "Remove",
            Self::FetchList { .. } => "FetchList",
            Self::FetchedList { .. } => "FetchedList",
            Self::FetchOne(_) => "FetchOne",
            Self::FetchedOne { .. } => "FetchedOne",
            Self::Push(_) => "Push",
            Self::Pushed { .. } => "Pushed",
            Self::Delete(_) => "Delete",
            Self::Deleted { .. } => "Deleted",
        }
    }
}

/// Which operation produced a post change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostCause {
    Instantiated,
    Updated,
    Removed,
    FetchedList,
    FetchedOne,
    Pushed,
    Deleted,
}

pub type PostChangeEvent = ChangeEvent<PostCause>;
