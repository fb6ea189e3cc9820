use crate::posts::action::{PostAction, PostCause, PostChangeEvent};
use crate::posts::client::PostRemoteClient;
use crate::posts::model::{Post, PostFields};
use fluxstate_engine::reconcile::{apply_deleted, apply_fetched_one, apply_fetched_page, apply_push_result};
use fluxstate_engine::{
    ActionHandler, Applied, ChangeBus, ChangeEmitter, ChangeEvent, DeleteOutcome, FetchOutcome,
};
use fluxstate_model::{PageRequest, RemoteRecord};
use fluxstate_storage::{OrderBy, PersistenceGateway, Predicate, Repository, StorageResult};
use fluxstate_types::{ActionError, LocalId, OwnerId, RemoteId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for the post store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostStoreConfig {
    /// Posts requested per list fetch.
    pub page_size: usize,
}

impl Default for PostStoreConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

/// Owns posts and pages.
///
/// Holds no records in memory: every accessor reads the gateway.
pub struct PostStore {
    repo: Repository<PostFields>,
    client: Arc<dyn PostRemoteClient>,
    emitter: ChangeEmitter<PostCause>,
    config: PostStoreConfig,
}

impl PostStore {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        client: Arc<dyn PostRemoteClient>,
        bus: ChangeBus<PostChangeEvent>,
        config: PostStoreConfig,
    ) -> Self {
        Self {
            repo: Repository::new(gateway),
            client,
            emitter: ChangeEmitter::new(Self::NAME, bus),
            config,
        }
    }

    pub fn config(&self) -> &PostStoreConfig {
        &self.config
    }

    pub fn bus(&self) -> &ChangeBus<PostChangeEvent> {
        self.emitter.bus()
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn post_by_local_id(&self, local_id: LocalId) -> StorageResult<Option<Post>> {
        self.repo.get(local_id)
    }

    pub fn post_by_remote_id(
        &self,
        owner_id: OwnerId,
        remote_id: RemoteId,
    ) -> StorageResult<Option<Post>> {
        self.repo.get_by_remote_id(owner_id, remote_id)
    }

    /// Posts (not pages) of a site, newest first.
    pub fn posts_for_site(&self, owner_id: OwnerId) -> StorageResult<Vec<Post>> {
        self.repo
            .find(self.kind(owner_id, false), &OrderBy::desc("date_created"))
    }

    /// Pages of a site, newest first.
    pub fn pages_for_site(&self, owner_id: OwnerId) -> StorageResult<Vec<Post>> {
        self.repo
            .find(self.kind(owner_id, true), &OrderBy::desc("date_created"))
    }

    /// Every stored post and page, across all sites.
    pub fn posts_count(&self) -> StorageResult<usize> {
        self.repo.count(self.repo.predicate())
    }

    pub fn posts_count_for_site(&self, owner_id: OwnerId) -> StorageResult<usize> {
        self.repo.count(self.kind(owner_id, false))
    }

    pub fn pages_count_for_site(&self, owner_id: OwnerId) -> StorageResult<usize> {
        self.repo.count(self.kind(owner_id, true))
    }

    /// Local drafts and synced posts with unpushed edits, by local id.
    pub fn locally_changed_posts(&self, owner_id: OwnerId) -> StorageResult<Vec<Post>> {
        let site = self.repo.predicate().owner(owner_id);
        let mut changed = self
            .repo
            .find(site.clone().local_only(true), &OrderBy::default())?;
        changed.extend(
            self.repo
                .find(site.local_only(false).locally_modified(true), &OrderBy::default())?,
        );
        changed.sort_by_key(|p| p.local_id);
        Ok(changed)
    }

    fn kind(&self, owner_id: OwnerId, pages: bool) -> Predicate {
        self.repo
            .predicate()
            .owner(owner_id)
            .field_eq("is_page", pages)
    }

    // ── Local requests ───────────────────────────────────────────

    fn instantiate(&self, owner_id: OwnerId, is_page: bool) {
        let event = ChangeEvent::new(owner_id, PostCause::Instantiated);
        let event = match self.repo.create(owner_id, PostFields::draft(is_page)) {
            Ok(post) => {
                debug!("instantiated post {} for site {owner_id}", post.local_id);
                event.with_local_id(post.local_id)
            }
            Err(err) => {
                warn!("failed to instantiate post for site {owner_id}: {err}");
                event.with_error(ActionError::generic(err.to_string()))
            }
        };
        self.emitter.emit(event);
    }

    fn update(&self, post: &Post) {
        let outcome = match self.repo.get(post.local_id) {
            Ok(Some(stored)) => Ok(stored),
            Ok(None) => Err(ActionError::not_found(format!("post {}", post.local_id))),
            Err(err) => Err(ActionError::generic(err.to_string())),
        };
        self.emitter.complete(
            post.owner_id,
            PostCause::Updated,
            Some(post.local_id),
            outcome,
            |stored| {
                // Bookkeeping stays the store's; only the fields are the caller's.
                let saved = Post {
                    local_id: stored.local_id,
                    owner_id: stored.owner_id,
                    remote_id: stored.remote_id,
                    is_local_only: stored.is_local_only,
                    is_locally_modified: !stored.is_local_only,
                    fields: post.fields.clone(),
                };
                Ok(Applied::record(self.repo.save(&saved)?))
            },
        );
    }

    fn remove(&self, post: &Post) {
        self.emitter.complete(
            post.owner_id,
            PostCause::Removed,
            Some(post.local_id),
            Ok(()),
            |()| {
                let removed = self.repo.remove(post.local_id)?;
                Ok(Applied {
                    local_id: Some(post.local_id),
                    rows_affected: Some(usize::from(removed)),
                    can_load_more: None,
                })
            },
        );
    }

    // ── Remote requests ──────────────────────────────────────────

    fn fetch_list(&self, owner_id: OwnerId, pages: bool, load_more: bool) {
        let offset = if load_more {
            let synced = self.kind(owner_id, pages).local_only(false);
            match self.repo.count(synced) {
                Ok(count) => count,
                Err(err) => {
                    let error = ActionError::generic(err.to_string());
                    return self.fetched_list(owner_id, load_more, Err(error));
                }
            }
        } else {
            0
        };
        let page = PageRequest::after(offset, self.config.page_size);
        debug!("fetching posts for site {owner_id} at offset {offset}");
        self.client.fetch_list(owner_id, pages, page, load_more);
    }

    fn fetch_one(&self, post: &Post) {
        if post.remote_id.is_none() {
            let error = ActionError::not_found(format!("post {} was never pushed", post.local_id));
            return self.fetched_one(post.owner_id, Some(post.local_id), Err(error));
        }
        self.client.fetch_one(post.clone());
    }

    fn push(&self, post: &Post) {
        match self.repo.get(post.local_id) {
            Ok(Some(_)) => self.client.push(post.clone()),
            Ok(None) => {
                let error = ActionError::not_found(format!("post {}", post.local_id));
                self.pushed(post.owner_id, post.local_id, Err(error));
            }
            Err(err) => {
                let error = ActionError::generic(err.to_string());
                self.pushed(post.owner_id, post.local_id, Err(error));
            }
        }
    }

    fn delete(&self, post: &Post) {
        if post.is_local_only {
            // Nothing exists remotely.
            return self.deleted(post.owner_id, post.local_id, Ok(DeleteOutcome::Removed));
        }
        self.client.delete(post.clone());
    }

    // ── Results ──────────────────────────────────────────────────

    fn fetched_list(
        &self,
        owner_id: OwnerId,
        load_more: bool,
        outcome: Result<Vec<RemoteRecord<PostFields>>, ActionError>,
    ) {
        let event = self.emitter.complete(owner_id, PostCause::FetchedList, None, outcome, |page| {
            apply_fetched_page(&self.repo, owner_id, &page, self.config.page_size)
        });
        debug!(
            "site {owner_id}: merged {:?} posts (load_more: {load_more}, can_load_more: {:?})",
            event.rows_affected, event.can_load_more
        );
    }

    fn fetched_one(
        &self,
        owner_id: OwnerId,
        local_id: Option<LocalId>,
        outcome: Result<FetchOutcome<PostFields>, ActionError>,
    ) {
        self.emitter
            .complete(owner_id, PostCause::FetchedOne, local_id, outcome, |fetched| {
                apply_fetched_one(&self.repo, owner_id, local_id, fetched)
            });
    }

    fn pushed(
        &self,
        owner_id: OwnerId,
        local_id: LocalId,
        outcome: Result<RemoteRecord<PostFields>, ActionError>,
    ) {
        self.emitter
            .complete(owner_id, PostCause::Pushed, Some(local_id), outcome, |pushed| {
                apply_push_result(&self.repo, owner_id, local_id, pushed)
            });
    }

    fn deleted(
        &self,
        owner_id: OwnerId,
        local_id: LocalId,
        outcome: Result<DeleteOutcome<PostFields>, ActionError>,
    ) {
        self.emitter
            .complete(owner_id, PostCause::Deleted, Some(local_id), outcome, |deleted| {
                apply_deleted(&self.repo, owner_id, local_id, deleted)
            });
    }
}

impl ActionHandler for PostStore {
    type Action = PostAction;

    const NAME: &'static str = "posts";

    fn handle(&self, action: &PostAction) {
        match action {
            PostAction::Instantiate { owner_id, is_page } => self.instantiate(*owner_id, *is_page),
            PostAction::Update(post) => self.update(post),
            PostAction::Remove(post) => self.remove(post),
            PostAction::FetchList {
                owner_id,
                pages,
                load_more,
            } => self.fetch_list(*owner_id, *pages, *load_more),
            PostAction::FetchedList {
                owner_id,
                load_more,
                outcome,
                ..
            } => self.fetched_list(*owner_id, *load_more, outcome.clone()),
            PostAction::FetchOne(post) => self.fetch_one(post),
            PostAction::FetchedOne {
                owner_id,
                local_id,
                outcome,
            } => self.fetched_one(*owner_id, *local_id, outcome.clone()),
            PostAction::Push(post) => self.push(post),
            PostAction::Pushed {
                owner_id,
                local_id,
                outcome,
            } => self.pushed(*owner_id, *local_id, outcome.clone()),
            PostAction::Delete(post) => self.delete(post),
            PostAction::Deleted {
                owner_id,
                local_id,
                outcome,
            } => self.deleted(*owner_id, *local_id, outcome.clone()),
        }
    }
}
