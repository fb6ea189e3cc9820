use crate::plugins::action::PluginAction;
use crate::plugins::client::{PluginDirectoryClient, SitePluginClient};
use crate::plugins::model::{PluginDirectoryType, PluginInfoFields, Site, SitePluginFields};
use crate::simulated::{Completer, SimulatedServiceConfig};
use fluxstate_engine::DispatchHandle;
use fluxstate_types::{ActionError, OwnerId};
use std::collections::{BTreeMap, HashMap};
use tokio::runtime::Handle;

#[derive(Default)]
struct PluginServer {
    installed: HashMap<OwnerId, BTreeMap<String, SitePluginFields>>,
    catalogue: BTreeMap<String, PluginInfoFields>,
    listings: HashMap<PluginDirectoryType, Vec<String>>,
}

impl PluginServer {
    fn site_plugins(&self, site_id: OwnerId) -> Vec<SitePluginFields> {
        self.installed
            .get(&site_id)
            .map(|plugins| plugins.values().cloned().collect())
            .unwrap_or_default()
    }

    fn update(&mut self, site_id: OwnerId, plugin: SitePluginFields) -> Result<SitePluginFields, ActionError> {
        let slot = self
            .installed
            .get_mut(&site_id)
            .and_then(|plugins| plugins.get_mut(&plugin.name))
            .ok_or_else(|| ActionError::not_found(format!("plugin {}", plugin.name)))?;
        *slot = plugin.clone();
        Ok(plugin)
    }

    fn delete(&mut self, site_id: OwnerId, name: &str) -> Result<(), ActionError> {
        let plugins = self
            .installed
            .get_mut(&site_id)
            .ok_or_else(|| ActionError::not_found(format!("plugin {name}")))?;
        match plugins.get(name) {
            None => Err(ActionError::not_found(format!("plugin {name}"))),
            Some(p) if p.is_active => Err(ActionError::generic(format!(
                "plugin {name} must be deactivated before deletion"
            ))),
            Some(_) => {
                plugins.remove(name);
                Ok(())
            }
        }
    }

    fn directory_page(&self, directory: PluginDirectoryType, page: u32, page_size: usize) -> Vec<PluginInfoFields> {
        let skip = (page.max(1) as usize - 1) * page_size;
        self.listings
            .get(&directory)
            .map(|slugs| {
                slugs
                    .iter()
                    .skip(skip)
                    .take(page_size)
                    .filter_map(|slug| self.catalogue.get(slug).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// An in-memory plugin API and plugin directory.
pub struct SimulatedPluginService {
    completer: Completer<PluginServer>,
}

impl SimulatedPluginService {
    pub fn new(dispatcher: DispatchHandle, runtime: Handle, config: SimulatedServiceConfig) -> Self {
        Self {
            completer: Completer::new(PluginServer::default(), dispatcher, runtime, config.latency),
        }
    }

    /// Installs a plugin on a site, server side.
    pub fn install(&self, site_id: OwnerId, plugin: SitePluginFields) {
        self.completer
            .lock()
            .server
            .installed
            .entry(site_id)
            .or_default()
            .insert(plugin.name.clone(), plugin);
    }

    pub fn installed(&self, site_id: OwnerId) -> Vec<SitePluginFields> {
        self.completer.lock().server.site_plugins(site_id)
    }

    /// Adds a plugin to the catalogue and appends it to a directory listing.
    pub fn publish(&self, directory: PluginDirectoryType, info: PluginInfoFields) {
        let mut state = self.completer.lock();
        state
            .server
            .listings
            .entry(directory)
            .or_default()
            .push(info.slug.clone());
        state.server.catalogue.insert(info.slug.clone(), info);
    }

    /// Publishes `count` generated plugins to a directory.
    pub fn seed_directory(&self, directory: PluginDirectoryType, count: usize) {
        for n in 1..=count {
            self.publish(
                directory,
                PluginInfoFields {
                    slug: format!("{directory}-plugin-{n}"),
                    name: format!("{directory} plugin {n}"),
                    version: Some("1.0.0".into()),
                    author: Some("simulated".into()),
                    rating: Some(80),
                    downloads: (count - n + 1) as u64 * 1000,
                },
            );
        }
    }

    pub fn fail_next(&self, error: ActionError) {
        self.completer.fail_next(error);
    }
}

impl SitePluginClient for SimulatedPluginService {
    fn fetch_site_plugins(&self, site: Site) {
        self.completer.complete(move |state| {
            let outcome = match state.take_failure() {
                Some(error) => Err(error),
                None => Ok(state.server.site_plugins(site.id)),
            };
            PluginAction::FetchedSitePlugins {
                site_id: site.id,
                outcome,
            }
        });
    }

    fn update_site_plugin(&self, site: Site, plugin: SitePluginFields) {
        self.completer.complete(move |state| {
            let outcome = match state.take_failure() {
                Some(error) => Err(error),
                None => state.server.update(site.id, plugin),
            };
            PluginAction::UpdatedSitePlugin {
                site_id: site.id,
                outcome,
            }
        });
    }

    fn delete_site_plugin(&self, site: Site, plugin: SitePluginFields) {
        self.completer.complete(move |state| {
            let outcome = match state.take_failure() {
                Some(error) => Err(error),
                None => state.server.delete(site.id, &plugin.name),
            };
            PluginAction::DeletedSitePlugin {
                site_id: site.id,
                name: plugin.name,
                outcome,
            }
        });
    }
}

impl PluginDirectoryClient for SimulatedPluginService {
    fn fetch_plugin_info(&self, slug: String) {
        self.completer.complete(move |state| {
            let outcome = match state.take_failure() {
                Some(error) => Err(error),
                None => state
                    .server
                    .catalogue
                    .get(&slug)
                    .cloned()
                    .ok_or_else(|| ActionError::not_found(format!("plugin {slug}"))),
            };
            PluginAction::FetchedPluginInfo { slug, outcome }
        });
    }

    fn fetch_directory(&self, directory: PluginDirectoryType, page: u32, page_size: usize) {
        self.completer.complete(move |state| {
            let outcome = match state.take_failure() {
                Some(error) => Err(error),
                None => Ok(state.server.directory_page(directory, page, page_size)),
            };
            PluginAction::FetchedPluginDirectory {
                directory,
                page,
                outcome,
            }
        });
    }
}
