//! Remote client seams for plugins.

use crate::plugins::model::{PluginDirectoryType, Site, SitePluginFields};
use std::sync::{Mutex, PoisonError};

/// Plugin management on a site. Each call completes by dispatching its
/// paired `PluginAction` result exactly once.
pub trait SitePluginClient: Send + Sync {
    /// Completes with `FetchedSitePlugins`.
    fn fetch_site_plugins(&self, site: Site);

    /// Completes with `UpdatedSitePlugin`.
    fn update_site_plugin(&self, site: Site, plugin: SitePluginFields);

    /// Completes with `DeletedSitePlugin`.
    fn delete_site_plugin(&self, site: Site, plugin: SitePluginFields);
}

/// The public plugin directory.
pub trait PluginDirectoryClient: Send + Sync {
    /// Completes with `FetchedPluginInfo`.
    fn fetch_plugin_info(&self, slug: String);

    /// Fetches one 1-based page. Completes with `FetchedPluginDirectory`.
    fn fetch_directory(&self, directory: PluginDirectoryType, page: u32, page_size: usize);
}

/// A call received by [`RecordingPluginClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginCall {
    FetchSitePlugins(Site),
    UpdateSitePlugin(Site, SitePluginFields),
    DeleteSitePlugin(Site, SitePluginFields),
    FetchPluginInfo(String),
    FetchDirectory {
        directory: PluginDirectoryType,
        page: u32,
        page_size: usize,
    },
}

/// Records calls to both plugin seams without completing them.
#[derive(Debug, Default)]
pub struct RecordingPluginClient {
    calls: Mutex<Vec<PluginCall>>,
}

impl RecordingPluginClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PluginCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take_calls(&self) -> Vec<PluginCall> {
        std::mem::take(&mut *self.calls.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn record(&self, call: PluginCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl SitePluginClient for RecordingPluginClient {
    fn fetch_site_plugins(&self, site: Site) {
        self.record(PluginCall::FetchSitePlugins(site));
    }

    fn update_site_plugin(&self, site: Site, plugin: SitePluginFields) {
        self.record(PluginCall::UpdateSitePlugin(site, plugin));
    }

    fn delete_site_plugin(&self, site: Site, plugin: SitePluginFields) {
        self.record(PluginCall::DeleteSitePlugin(site, plugin));
    }
}

impl PluginDirectoryClient for RecordingPluginClient {
    fn fetch_plugin_info(&self, slug: String) {
        self.record(PluginCall::FetchPluginInfo(slug));
    }

    fn fetch_directory(&self, directory: PluginDirectoryType, page: u32, page_size: usize) {
        self.record(PluginCall::FetchDirectory {
            directory,
            page,
            page_size,
        });
    }
}
