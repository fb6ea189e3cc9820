//! Remote client seam for posts.

use crate::posts::model::Post;
use fluxstate_model::PageRequest;
use fluxstate_types::OwnerId;
use std::sync::{Mutex, PoisonError};

/// Network operations on posts.
///
/// Calls return immediately. Each one completes later by dispatching its
/// paired result action exactly once, carrying either the server data or
/// an [`ActionError`](fluxstate_types::ActionError). Retries, timeouts and
/// cancellation are the client's business.
pub trait PostRemoteClient: Send + Sync {
    /// Completes with `PostAction::FetchedList`.
    fn fetch_list(&self, owner_id: OwnerId, pages: bool, page: PageRequest, load_more: bool);

    /// Completes with `PostAction::FetchedOne`.
    fn fetch_one(&self, post: Post);

    /// Creates the post remotely if it has no remote id, else updates it.
    /// Completes with `PostAction::Pushed`.
    fn push(&self, post: Post);

    /// Completes with `PostAction::Deleted`.
    fn delete(&self, post: Post);
}

/// A call received by [`RecordingPostClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum PostCall {
    FetchList {
        owner_id: OwnerId,
        pages: bool,
        page: PageRequest,
        load_more: bool,
    },
    FetchOne(Post),
    Push(Post),
    Delete(Post),
}

/// A client that records calls and never completes them.
///
/// Tests dispatch the result actions themselves, which makes ordering and
/// timing fully deterministic.
#[derive(Debug, Default)]
pub struct RecordingPostClient {
    calls: Mutex<Vec<PostCall>>,
}

impl RecordingPostClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PostCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns and clears the recorded calls.
    pub fn take_calls(&self) -> Vec<PostCall> {
        std::mem::take(&mut *self.calls.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn record(&self, call: PostCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl PostRemoteClient for RecordingPostClient {
    fn fetch_list(&self, owner_id: OwnerId, pages: bool, page: PageRequest, load_more: bool) {
        self.record(PostCall::FetchList {
            owner_id,
            pages,
            page,
            load_more,
        });
    }

    fn fetch_one(&self, post: Post) {
        self.record(PostCall::FetchOne(post));
    }

    fn push(&self, post: Post) {
        self.record(PostCall::Push(post));
    }

    fn delete(&self, post: Post) {
        self.record(PostCall::Delete(post));
    }
}
