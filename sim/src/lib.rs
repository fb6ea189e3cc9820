//! Scripted scenario that drives the fluxstate stores against simulated
//! servers.

use anyhow::{Context, Result, bail};
use fluxstate_domains::plugins::{
    PluginChangeEvent, PluginDirectoryType, SimulatedPluginService, Site, SitePluginFields,
};
use fluxstate_domains::posts::{PostChangeEvent, SimulatedPostService};
use fluxstate_domains::{
    PluginAction, PluginStore, PluginStoreConfig, PostAction, PostStore, PostStoreConfig,
    SimulatedServiceConfig,
};
use fluxstate_engine::{ChangeBus, ChangeEvent, DeliveryContext, Dispatcher};
use fluxstate_storage::PersistenceGateway;
use fluxstate_types::OwnerId;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

/// How long to wait for any single result before giving up.
const RESULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub site: OwnerId,
    /// Posts placed on the simulated server before the first fetch.
    pub seeded_posts: usize,
    /// Plugins placed in the simulated "popular" directory.
    pub seeded_directory: usize,
    pub posts: PostStoreConfig,
    pub plugins: PluginStoreConfig,
    pub service: SimulatedServiceConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            site: OwnerId::new(1),
            seeded_posts: 45,
            seeded_directory: 120,
            posts: PostStoreConfig::default(),
            plugins: PluginStoreConfig::default(),
            service: SimulatedServiceConfig::default(),
        }
    }
}

/// Counts taken after the scenario finishes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ScenarioReport {
    pub posts: usize,
    pub pages: usize,
    pub locally_changed: usize,
    pub server_posts: usize,
    pub post_pages_fetched: usize,
    pub site_plugins: usize,
    pub directory_plugins: usize,
    pub directory_pages_fetched: u32,
    pub events: usize,
    pub errors: usize,
}

/// Wires stores and simulated services over `gateway` and runs the script.
///
/// Must be called from within a tokio runtime; the simulated services
/// complete their calls on it.
pub async fn run_scenario(
    gateway: Arc<dyn PersistenceGateway>,
    config: &ScenarioConfig,
) -> Result<ScenarioReport> {
    let runtime = Handle::current();
    let dispatcher = Dispatcher::new();

    let post_service = Arc::new(SimulatedPostService::new(
        dispatcher.handle(),
        runtime.clone(),
        config.service.clone(),
    ));
    let plugin_service = Arc::new(SimulatedPluginService::new(
        dispatcher.handle(),
        runtime.clone(),
        config.service.clone(),
    ));

    let post_bus: ChangeBus<PostChangeEvent> = ChangeBus::new();
    let plugin_bus: ChangeBus<PluginChangeEvent> = ChangeBus::new();
    post_bus.subscribe(DeliveryContext::Runtime(runtime.clone()), log_event);
    plugin_bus.subscribe(DeliveryContext::Runtime(runtime), log_event);
    let (_, post_events) = post_bus.subscribe_channel();
    let (_, plugin_events) = plugin_bus.subscribe_channel();

    let posts = Arc::new(PostStore::new(
        Arc::clone(&gateway),
        post_service.clone(),
        post_bus,
        config.posts,
    ));
    let plugins = Arc::new(PluginStore::new(
        gateway,
        plugin_service.clone(),
        plugin_service.clone(),
        plugin_bus,
        config.plugins,
    ));
    dispatcher.register(posts.clone());
    dispatcher.register(plugins.clone());

    let mut run = Run {
        dispatcher,
        post_events,
        plugin_events,
        events: 0,
        errors: 0,
    };
    let site = config.site;

    // Server content.
    post_service
        .seed_posts(site, config.seeded_posts)
        .context("seeding posts")?;
    for (name, active) in [("akismet", true), ("jetpack", true), ("hello-dolly", false)] {
        plugin_service.install(site, site_plugin(name, active));
    }
    plugin_service.seed_directory(PluginDirectoryType::Popular, config.seeded_directory);

    // Page through the post list.
    let mut post_pages_fetched = 0;
    let mut load_more = false;
    loop {
        let event = run
            .post(PostAction::FetchList {
                owner_id: site,
                pages: false,
                load_more,
            })
            .await?;
        post_pages_fetched += 1;
        if event.is_error() || event.can_load_more != Some(true) {
            break;
        }
        load_more = true;
    }
    info!(
        "fetched {} posts in {post_pages_fetched} pages",
        posts.posts_count_for_site(site)?
    );

    // Draft, edit, push, then edit again without pushing.
    let created = run
        .post(PostAction::Instantiate {
            owner_id: site,
            is_page: false,
        })
        .await?;
    let local_id = created.local_id.context("instantiate returned no local id")?;
    let mut draft = posts
        .post_by_local_id(local_id)?
        .context("instantiated post missing")?;
    draft.fields.title = "Hello from fluxstate".into();
    draft.fields.content = "Written offline, pushed later.".into();
    run.post(PostAction::Update(draft.clone())).await?;
    run.post(PostAction::Push(draft)).await?;

    let mut synced = posts
        .post_by_local_id(local_id)?
        .context("pushed post missing")?;
    synced.fields.title.push_str(" (edited)");
    run.post(PostAction::Update(synced)).await?;

    // A page that stays local.
    run.post(PostAction::Instantiate {
        owner_id: site,
        is_page: true,
    })
    .await?;

    // Trash the oldest fetched post.
    if let Some(oldest) = posts.posts_for_site(site)?.into_iter().rev().find(|p| p.is_synced()) {
        run.post(PostAction::Delete(oldest)).await?;
    }

    // Plugins: list, update, delete, directory.
    let site_ref = Site::new(site, true);
    run.plugin(PluginAction::FetchSitePlugins(site_ref)).await?;
    if let Some(jetpack) = plugins.site_plugin_by_slug(site, "jetpack")? {
        let mut deactivated = jetpack.fields;
        deactivated.is_active = false;
        run.plugin(PluginAction::UpdateSitePlugin {
            site: site_ref,
            plugin: deactivated.clone(),
        })
        .await?;
        run.plugin(PluginAction::DeleteSitePlugin {
            site: site_ref,
            plugin: deactivated,
        })
        .await?;
    }

    let mut load_more = false;
    loop {
        let event = run
            .plugin(PluginAction::FetchPluginDirectory {
                directory: PluginDirectoryType::Popular,
                load_more,
            })
            .await?;
        if event.is_error() || event.can_load_more != Some(true) {
            break;
        }
        load_more = true;
    }

    let report = ScenarioReport {
        posts: posts.posts_count_for_site(site)?,
        pages: posts.pages_count_for_site(site)?,
        locally_changed: posts.locally_changed_posts(site)?.len(),
        server_posts: post_service.server_count(site),
        post_pages_fetched,
        site_plugins: plugins.site_plugins(site)?.len(),
        directory_plugins: plugins
            .plugins_for_directory(PluginDirectoryType::Popular)?
            .len(),
        directory_pages_fetched: plugins.last_requested_page(PluginDirectoryType::Popular)?,
        events: run.events,
        errors: run.errors,
    };
    info!("scenario finished: {report:?}");
    Ok(report)
}

/// Dispatches requests and waits for the one event each produces.
struct Run {
    dispatcher: Dispatcher,
    post_events: UnboundedReceiver<PostChangeEvent>,
    plugin_events: UnboundedReceiver<PluginChangeEvent>,
    events: usize,
    errors: usize,
}

impl Run {
    async fn post(&mut self, action: PostAction) -> Result<PostChangeEvent> {
        self.dispatcher.dispatch(action);
        let event = next_event(&mut self.post_events).await?;
        self.record(&event);
        Ok(event)
    }

    async fn plugin(&mut self, action: PluginAction) -> Result<PluginChangeEvent> {
        self.dispatcher.dispatch(action);
        let event = next_event(&mut self.plugin_events).await?;
        self.record(&event);
        Ok(event)
    }

    fn record<C>(&mut self, event: &ChangeEvent<C>) {
        self.events += 1;
        if event.is_error() {
            self.errors += 1;
        }
    }
}

async fn next_event<E>(events: &mut UnboundedReceiver<E>) -> Result<E> {
    match tokio::time::timeout(RESULT_TIMEOUT, events.recv()).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => bail!("change bus closed"),
        Err(_) => bail!("no result within {RESULT_TIMEOUT:?}"),
    }
}

fn log_event<C: Debug>(event: ChangeEvent<C>) -> Result<()> {
    match &event.error {
        Some(error) => warn!("{:?} for owner {} failed: {error}", event.cause, event.owner_id),
        None => info!(
            "{:?} for owner {} (local id {:?}, rows {:?}, more {:?})",
            event.cause, event.owner_id, event.local_id, event.rows_affected, event.can_load_more
        ),
    }
    Ok(())
}

fn site_plugin(slug: &str, is_active: bool) -> SitePluginFields {
    SitePluginFields {
        name: format!("{slug}/{slug}"),
        slug: slug.to_string(),
        display_name: slug.replace('-', " "),
        version: Some("1.0.0".into()),
        is_active,
        is_auto_update_enabled: false,
    }
}
