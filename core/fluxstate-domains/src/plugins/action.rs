use crate::plugins::model::{PluginDirectoryType, PluginInfoFields, Site, SitePluginFields};
use fluxstate_engine::{ChangeEvent, DomainAction};
use fluxstate_types::{ActionError, OwnerId};

/// Requests and results handled by the [`PluginStore`](crate::PluginStore).
#[derive(Debug, Clone)]
pub enum PluginAction {
    FetchSitePlugins(Site),
    FetchedSitePlugins {
        site_id: OwnerId,
        outcome: Result<Vec<SitePluginFields>, ActionError>,
    },

    /// Change a plugin's state (activation, auto-update) on the site.
    UpdateSitePlugin {
        site: Site,
        plugin: SitePluginFields,
    },
    UpdatedSitePlugin {
        site_id: OwnerId,
        outcome: Result<SitePluginFields, ActionError>,
    },

    DeleteSitePlugin {
        site: Site,
        plugin: SitePluginFields,
    },
    DeletedSitePlugin {
        site_id: OwnerId,
        name: String,
        outcome: Result<(), ActionError>,
    },

    FetchPluginInfo {
        slug: String,
    },
    FetchedPluginInfo {
        slug: String,
        outcome: Result<PluginInfoFields, ActionError>,
    },

    FetchPluginDirectory {
        directory: PluginDirectoryType,
        load_more: bool,
    },
    FetchedPluginDirectory {
        directory: PluginDirectoryType,
        page: u32,
        outcome: Result<Vec<PluginInfoFields>, ActionError>,
    },
}

impl DomainAction for PluginAction {
    const DOMAIN: &'static str = "plugins";

    fn name(&self) -> &'static str {
        match self {
            Self::FetchSitePlugins(_) => "FetchSitePlugins",
            Self::FetchedSitePlugins { .. } => "FetchedSitePlugins",
            Self::UpdateSitePlugin { .. } => "UpdateSitePlugin",
            Self::UpdatedSitePlugin { .. } => "UpdatedSitePlugin",
            Self::DeleteSitePlugin { .. } => "DeleteSitePlugin",
            Self::DeletedSitePlugin { .. } => "DeletedSitePlugin",
            Self::FetchPluginInfo { .. } => "FetchPluginInfo",
            Self::FetchedPluginInfo { .. } => "FetchedPluginInfo",
            Self::FetchPluginDirectory { .. } => "FetchPluginDirectory",
            Self::FetchedPluginDirectory { .. } => "FetchedPluginDirectory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginCause {
    FetchedSitePlugins,
    UpdatedSitePlugin,
    DeletedSitePlugin,
    FetchedPluginInfo,
    FetchedPluginDirectory(PluginDirectoryType),
}

pub type PluginChangeEvent = ChangeEvent<PluginCause>;
