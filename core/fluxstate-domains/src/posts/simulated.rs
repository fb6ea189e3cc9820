use crate::posts::action::PostAction;
use crate::posts::client::PostRemoteClient;
use crate::posts::model::{Post, PostFields, PostStatus};
use crate::simulated::{Completer, DeleteMode, SimulatedServiceConfig};
use chrono::{DateTime, Duration as TimeDelta, SubsecRound, Utc};
use fluxstate_engine::{DeleteOutcome, DispatchHandle, FetchOutcome};
use fluxstate_model::{PageRequest, RemoteRecord};
use fluxstate_types::{ActionError, OwnerId, RemoteId};
use std::collections::{BTreeMap, HashMap};
use tokio::runtime::Handle;

#[derive(Default)]
struct PostServer {
    last_id: u64,
    sites: HashMap<OwnerId, BTreeMap<RemoteId, PostFields>>,
}

impl PostServer {
    fn allocate_id(&mut self) -> Result<RemoteId, ActionError> {
        self.last_id += 1;
        RemoteId::new(self.last_id).map_err(|e| ActionError::generic(e.to_string()))
    }

    fn insert(&mut self, owner_id: OwnerId, fields: PostFields) -> Result<RemoteId, ActionError> {
        let remote_id = self.allocate_id()?;
        self.sites
            .entry(owner_id)
            .or_default()
            .insert(remote_id, fields);
        Ok(remote_id)
    }

    fn list(&self, owner_id: OwnerId, pages: bool, page: PageRequest) -> Vec<RemoteRecord<PostFields>> {
        let Some(site) = self.sites.get(&owner_id) else {
            return Vec::new();
        };
        let mut matching: Vec<_> = site.iter().filter(|(_, f)| f.is_page == pages).collect();
        // Newest first, like the real endpoint.
        matching.sort_by(|(a_id, a), (b_id, b)| {
            b.date_created
                .cmp(&a.date_created)
                .then_with(|| b_id.cmp(a_id))
        });
        matching
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .map(|(id, fields)| RemoteRecord::new(*id, fields.clone()))
            .collect()
    }

    fn fetch(&self, post: &Post) -> FetchOutcome<PostFields> {
        post.remote_id
            .and_then(|id| {
                let fields = self.sites.get(&post.owner_id)?.get(&id)?;
                Some(FetchOutcome::Found(RemoteRecord::new(id, fields.clone())))
            })
            .unwrap_or(FetchOutcome::Gone)
    }

    fn push(&mut self, post: &Post, echo_date_created: bool) -> Result<RemoteRecord<PostFields>, ActionError> {
        let mut fields = post.fields.clone();
        let remote_id = match post.remote_id {
            Some(id) => {
                let existing = self
                    .sites
                    .get(&post.owner_id)
                    .and_then(|site| site.get(&id))
                    .ok_or_else(|| ActionError::not_found(format!("post {id}")))?;
                // The server owns the creation date once it has one.
                fields.date_created = existing.date_created.or(fields.date_created);
                self.sites.entry(post.owner_id).or_default().insert(id, fields.clone());
                id
            }
            None => {
                if fields.date_created.is_none() {
                    fields.date_created = Some(Utc::now().trunc_subsecs(3));
                }
                self.insert(post.owner_id, fields.clone())?
            }
        };

        if !echo_date_created {
            fields.date_created = None;
        }
        Ok(RemoteRecord::new(remote_id, fields))
    }

    fn delete(&mut self, post: &Post, mode: DeleteMode) -> Result<DeleteOutcome<PostFields>, ActionError> {
        let not_found = || ActionError::not_found(format!("post {}", post.local_id));
        let remote_id = post.remote_id.ok_or_else(not_found)?;
        let site = self.sites.get_mut(&post.owner_id).ok_or_else(not_found)?;
        let fields = site.get_mut(&remote_id).ok_or_else(not_found)?;

        if mode == DeleteMode::Trash && !fields.is_trashed() {
            fields.status = PostStatus::Trash;
            return Ok(DeleteOutcome::Trashed(RemoteRecord::new(remote_id, fields.clone())));
        }
        site.remove(&remote_id);
        Ok(DeleteOutcome::Removed)
    }
}

/// An in-memory post server that completes calls by dispatching results.
pub struct SimulatedPostService {
    completer: Completer<PostServer>,
    config: SimulatedServiceConfig,
}

impl SimulatedPostService {
    pub fn new(dispatcher: DispatchHandle, runtime: Handle, config: SimulatedServiceConfig) -> Self {
        Self {
            completer: Completer::new(PostServer::default(), dispatcher, runtime, config.latency),
            config,
        }
    }

    /// Adds a post directly on the server side.
    pub fn seed(&self, owner_id: OwnerId, fields: PostFields) -> Result<RemoteId, ActionError> {
        self.completer.lock().server.insert(owner_id, fields)
    }

    /// Adds `count` published posts, one minute apart, the last one newest.
    pub fn seed_posts(&self, owner_id: OwnerId, count: usize) -> Result<Vec<RemoteId>, ActionError> {
        let start: DateTime<Utc> = Utc::now().trunc_subsecs(3) - TimeDelta::minutes(count as i64);
        (0..count)
            .map(|n| {
                let fields = PostFields {
                    title: format!("Post {}", n + 1),
                    content: format!("Body of post {}", n + 1),
                    status: PostStatus::Publish,
                    date_created: Some(start + TimeDelta::minutes(n as i64)),
                    ..PostFields::draft(false)
                };
                self.seed(owner_id, fields)
            })
            .collect()
    }

    pub fn server_post(&self, owner_id: OwnerId, remote_id: RemoteId) -> Option<PostFields> {
        self.completer
            .lock()
            .server
            .sites
            .get(&owner_id)?
            .get(&remote_id)
            .cloned()
    }

    pub fn server_count(&self, owner_id: OwnerId) -> usize {
        self.completer
            .lock()
            .server
            .sites
            .get(&owner_id)
            .map_or(0, BTreeMap::len)
    }

    /// Makes the next call fail with `error`.
    pub fn fail_next(&self, error: ActionError) {
        self.completer.fail_next(error);
    }
}

impl PostRemoteClient for SimulatedPostService {
    fn fetch_list(&self, owner_id: OwnerId, pages: bool, page: PageRequest, load_more: bool) {
        self.completer.complete(move |state| {
            let outcome = match state.take_failure() {
                Some(error) => Err(error),
                None => Ok(state.server.list(owner_id, pages, page)),
            };
            PostAction::FetchedList {
                owner_id,
                pages,
                load_more,
                outcome,
            }
        });
    }

    fn fetch_one(&self, post: Post) {
        self.completer.complete(move |state| {
            let outcome = match state.take_failure() {
                Some(error) => Err(error),
                None => Ok(state.server.fetch(&post)),
            };
            PostAction::FetchedOne {
                owner_id: post.owner_id,
                local_id: Some(post.local_id),
                outcome,
            }
        });
    }

    fn push(&self, post: Post) {
        let echo = self.config.echo_date_created;
        self.completer.complete(move |state| {
            let outcome = match state.take_failure() {
                Some(error) => Err(error),
                None => state.server.push(&post, echo),
            };
            PostAction::Pushed {
                owner_id: post.owner_id,
                local_id: post.local_id,
                outcome,
            }
        });
    }

    fn delete(&self, post: Post) {
        let mode = self.config.delete_mode;
        self.completer.complete(move |state| {
            let outcome = match state.take_failure() {
                Some(error) => Err(error),
                None => state.server.delete(&post, mode),
            };
            PostAction::Deleted {
                owner_id: post.owner_id,
                local_id: post.local_id,
                outcome,
            }
        });
    }
}
