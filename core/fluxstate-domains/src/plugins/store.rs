use crate::plugins::action::{PluginAction, PluginCause, PluginChangeEvent};
use crate::plugins::client::{PluginDirectoryClient, SitePluginClient};
use crate::plugins::model::{
    DirectoryEntryFields, PluginDirectoryType, PluginInfo, PluginInfoFields, Site, SitePlugin,
    SitePluginFields,
};
use fluxstate_engine::reconcile::replace_collection;
use fluxstate_engine::{ActionHandler, Applied, ChangeBus, ChangeEmitter};
use fluxstate_model::{RemoteRecord, can_load_more};
use fluxstate_storage::{OrderBy, PersistenceGateway, Predicate, Repository, StorageResult};
use fluxstate_types::{ActionError, OwnerId};
use std::sync::Arc;
use tracing::debug;

/// Configuration for the plugin store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginStoreConfig {
    /// Plugins requested per directory page.
    pub directory_page_size: usize,
}

impl Default for PluginStoreConfig {
    fn default() -> Self {
        Self {
            directory_page_size: 50,
        }
    }
}

/// Owns site plugins, the global plugin catalogue and directory listings.
pub struct PluginStore {
    site_plugins: Repository<SitePluginFields>,
    catalogue: Repository<PluginInfoFields>,
    directory: Repository<DirectoryEntryFields>,
    site_client: Arc<dyn SitePluginClient>,
    directory_client: Arc<dyn PluginDirectoryClient>,
    emitter: ChangeEmitter<PluginCause>,
    config: PluginStoreConfig,
}

impl PluginStore {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        site_client: Arc<dyn SitePluginClient>,
        directory_client: Arc<dyn PluginDirectoryClient>,
        bus: ChangeBus<PluginChangeEvent>,
        config: PluginStoreConfig,
    ) -> Self {
        Self {
            site_plugins: Repository::new(Arc::clone(&gateway)),
            catalogue: Repository::new(Arc::clone(&gateway)),
            directory: Repository::new(gateway),
            site_client,
            directory_client,
            emitter: ChangeEmitter::new(Self::NAME, bus),
            config,
        }
    }

    pub fn config(&self) -> &PluginStoreConfig {
        &self.config
    }

    pub fn bus(&self) -> &ChangeBus<PluginChangeEvent> {
        self.emitter.bus()
    }

    // ── Accessors ────────────────────────────────────────────────

    /// Plugins installed on a site, by display name.
    pub fn site_plugins(&self, site_id: OwnerId) -> StorageResult<Vec<SitePlugin>> {
        self.site_plugins.find(
            self.site_plugins.predicate().owner(site_id),
            &OrderBy::asc("display_name"),
        )
    }

    pub fn site_plugin_by_name(
        &self,
        site_id: OwnerId,
        name: &str,
    ) -> StorageResult<Option<SitePlugin>> {
        self.site_plugins.get_by_natural_key(site_id, name)
    }

    pub fn site_plugin_by_slug(
        &self,
        site_id: OwnerId,
        slug: &str,
    ) -> StorageResult<Option<SitePlugin>> {
        self.site_plugins.first(
            self.site_plugins
                .predicate()
                .owner(site_id)
                .field_eq("slug", slug),
            &OrderBy::default(),
        )
    }

    pub fn plugin_info_by_slug(&self, slug: &str) -> StorageResult<Option<PluginInfo>> {
        self.catalogue.get_by_natural_key(OwnerId::GLOBAL, slug)
    }

    /// Catalogue entries listed in a directory, in page order.
    pub fn plugins_for_directory(
        &self,
        directory: PluginDirectoryType,
    ) -> StorageResult<Vec<PluginInfo>> {
        let entries = self
            .directory
            .find(self.listing(directory), &OrderBy::asc("page"))?;
        let mut plugins = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(info) = self.plugin_info_by_slug(&entry.fields.slug)? {
                plugins.push(info);
            }
        }
        Ok(plugins)
    }

    /// Highest page fetched for a directory, 0 if none.
    pub fn last_requested_page(&self, directory: PluginDirectoryType) -> StorageResult<u32> {
        Ok(self
            .directory
            .first(self.listing(directory), &OrderBy::desc("page"))?
            .map_or(0, |entry| entry.fields.page))
    }

    fn listing(&self, directory: PluginDirectoryType) -> Predicate {
        self.directory
            .predicate()
            .owner(OwnerId::GLOBAL)
            .field_eq("directory", directory.as_str())
    }

    // ── Requests ─────────────────────────────────────────────────

    fn fetch_site_plugins(&self, site: Site) {
        if let Err(error) = require_management(&site) {
            return self.fetched_site_plugins(site.id, Err(error));
        }
        self.site_client.fetch_site_plugins(site);
    }

    fn update_site_plugin(&self, site: Site, plugin: &SitePluginFields) {
        if let Err(error) = require_management(&site) {
            return self.updated_site_plugin(site.id, Err(error));
        }
        self.site_client.update_site_plugin(site, plugin.clone());
    }

    fn delete_site_plugin(&self, site: Site, plugin: &SitePluginFields) {
        if let Err(error) = require_management(&site) {
            return self.deleted_site_plugin(site.id, &plugin.name, Err(error));
        }
        self.site_client.delete_site_plugin(site, plugin.clone());
    }

    fn fetch_plugin_info(&self, slug: &str) {
        self.directory_client.fetch_plugin_info(slug.to_string());
    }

    fn fetch_plugin_directory(&self, directory: PluginDirectoryType, load_more: bool) {
        let page = if load_more {
            match self.last_requested_page(directory) {
                Ok(last) => last + 1,
                Err(err) => {
                    let error = ActionError::generic(err.to_string());
                    return self.fetched_plugin_directory(directory, 0, Err(error));
                }
            }
        } else {
            1
        };
        debug!("fetching {directory} plugin directory page {page}");
        self.directory_client
            .fetch_directory(directory, page, self.config.directory_page_size);
    }

    // ── Results ──────────────────────────────────────────────────

    fn fetched_site_plugins(
        &self,
        site_id: OwnerId,
        outcome: Result<Vec<SitePluginFields>, ActionError>,
    ) {
        self.emitter
            .complete(site_id, PluginCause::FetchedSitePlugins, None, outcome, |plugins| {
                let remotes: Vec<_> = plugins.into_iter().map(RemoteRecord::keyed).collect();
                replace_collection(&self.site_plugins, site_id, &remotes)
            });
    }

    fn updated_site_plugin(&self, site_id: OwnerId, outcome: Result<SitePluginFields, ActionError>) {
        self.emitter
            .complete(site_id, PluginCause::UpdatedSitePlugin, None, outcome, |plugin| {
                let local_id = self
                    .site_plugins
                    .upsert_remote(site_id, &RemoteRecord::keyed(plugin))?;
                Ok(Applied::record(local_id))
            });
    }

    fn deleted_site_plugin(&self, site_id: OwnerId, name: &str, outcome: Result<(), ActionError>) {
        self.emitter
            .complete(site_id, PluginCause::DeletedSitePlugin, None, outcome, |()| {
                let removed = self
                    .site_plugins
                    .remove_where(self.site_plugins.predicate().owner(site_id).natural_key(name))?;
                Ok(Applied::rows(removed))
            });
    }

    fn fetched_plugin_info(&self, outcome: Result<PluginInfoFields, ActionError>) {
        self.emitter.complete(
            OwnerId::GLOBAL,
            PluginCause::FetchedPluginInfo,
            None,
            outcome,
            |info| {
                let local_id = self
                    .catalogue
                    .upsert_remote(OwnerId::GLOBAL, &RemoteRecord::keyed(info))?;
                Ok(Applied::record(local_id))
            },
        );
    }

    fn fetched_plugin_directory(
        &self,
        directory: PluginDirectoryType,
        page: u32,
        outcome: Result<Vec<PluginInfoFields>, ActionError>,
    ) {
        self.emitter.complete(
            OwnerId::GLOBAL,
            PluginCause::FetchedPluginDirectory(directory),
            None,
            outcome,
            |plugins| self.merge_directory_page(directory, page, plugins),
        );
    }

    /// Stores catalogue entries and the listing for one directory page in
    /// one transaction. Page 1 replaces the listing; later pages add to it.
    fn merge_directory_page(
        &self,
        directory: PluginDirectoryType,
        page: u32,
        plugins: Vec<PluginInfoFields>,
    ) -> StorageResult<Applied> {
        let returned = plugins.len();
        let entries: Vec<_> = plugins
            .iter()
            .map(|info| {
                RemoteRecord::keyed(DirectoryEntryFields {
                    directory,
                    slug: info.slug.clone(),
                    page,
                })
            })
            .collect();
        let catalogue: Vec<_> = plugins.into_iter().map(RemoteRecord::keyed).collect();

        let listing = if page <= 1 {
            self.directory
                .replace_op(self.listing(directory), OwnerId::GLOBAL, &entries)?
        } else {
            self.directory.upsert_remote_op(OwnerId::GLOBAL, &entries)?
        };
        let ops = [
            self.catalogue.upsert_remote_op(OwnerId::GLOBAL, &catalogue)?,
            listing,
        ];
        let merged = self.directory.write_all(&ops)?.last().copied().unwrap_or_default();

        Ok(Applied::rows(merged)
            .with_can_load_more(can_load_more(returned, self.config.directory_page_size)))
    }
}

fn require_management(site: &Site) -> Result<(), ActionError> {
    if site.supports_plugin_management {
        Ok(())
    } else {
        Err(ActionError::not_available(format!(
            "site {} does not support plugin management",
            site.id
        )))
    }
}

impl ActionHandler for PluginStore {
    type Action = PluginAction;

    const NAME: &'static str = "plugins";

    fn handle(&self, action: &PluginAction) {
        match action {
            PluginAction::FetchSitePlugins(site) => self.fetch_site_plugins(*site),
            PluginAction::FetchedSitePlugins { site_id, outcome } => {
                self.fetched_site_plugins(*site_id, outcome.clone())
            }
            PluginAction::UpdateSitePlugin { site, plugin } => self.update_site_plugin(*site, plugin),
            PluginAction::UpdatedSitePlugin { site_id, outcome } => {
                self.updated_site_plugin(*site_id, outcome.clone())
            }
            PluginAction::DeleteSitePlugin { site, plugin } => self.delete_site_plugin(*site, plugin),
            PluginAction::DeletedSitePlugin {
                site_id,
                name,
                outcome,
            } => self.deleted_site_plugin(*site_id, name, outcome.clone()),
            PluginAction::FetchPluginInfo { slug } => self.fetch_plugin_info(slug),
            PluginAction::FetchedPluginInfo { outcome, .. } => {
                self.fetched_plugin_info(outcome.clone())
            }
            PluginAction::FetchPluginDirectory {
                directory,
                load_more,
            } => self.fetch_plugin_directory(*directory, *load_more),
            PluginAction::FetchedPluginDirectory {
                directory,
                page,
                outcome,
            } => self.fetched_plugin_directory(*directory, *page, outcome.clone()),
        }
    }
}
