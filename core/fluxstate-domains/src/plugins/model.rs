use fluxstate_model::{Fields, Record};
use fluxstate_types::OwnerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The parts of a site the plugin store needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: OwnerId,
    /// Whether the site's API exposes plugin management.
    pub supports_plugin_management: bool,
}

impl Site {
    pub fn new(id: OwnerId, supports_plugin_management: bool) -> Self {
        Self {
            id,
            supports_plugin_management,
        }
    }
}

pub type SitePlugin = Record<SitePluginFields>;
pub type PluginInfo = Record<PluginInfoFields>;
pub type DirectoryEntry = Record<DirectoryEntryFields>;

/// A plugin installed on a site. Identified by `name` (e.g.
/// `"akismet/akismet"`); the server assigns no numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitePluginFields {
    pub name: String,
    pub slug: String,
    pub display_name: String,
    pub version: Option<String>,
    pub is_active: bool,
    pub is_auto_update_enabled: bool,
}

impl Fields for SitePluginFields {
    const COLLECTION: &'static str = "site_plugins";

    fn natural_key(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

/// A catalogue entry from the public plugin directory, keyed by slug and
/// stored under [`OwnerId::GLOBAL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfoFields {
    pub slug: String,
    pub name: String,
    pub version: Option<String>,
    pub author: Option<String>,
    /// Average rating, 0-100.
    pub rating: Option<u8>,
    pub downloads: u64,
}

impl Fields for PluginInfoFields {
    const COLLECTION: &'static str = "plugin_info";

    fn natural_key(&self) -> Option<String> {
        Some(self.slug.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginDirectoryType {
    New,
    Popular,
}

impl PluginDirectoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Popular => "popular",
        }
    }
}

impl fmt::Display for PluginDirectoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership of a plugin in one directory listing, with the page it came
/// from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntryFields {
    pub directory: PluginDirectoryType,
    pub slug: String,
    pub page: u32,
}

impl Fields for DirectoryEntryFields {
    const COLLECTION: &'static str = "plugin_directory";

    fn natural_key(&self) -> Option<String> {
        Some(format!("{}/{}", self.directory, self.slug))
    }
}
