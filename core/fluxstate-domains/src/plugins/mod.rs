//! Site plugins and the public plugin directory.

mod action;
mod client;
mod model;
mod simulated;
mod store;

pub use action::{PluginAction, PluginCause, PluginChangeEvent};
pub use client::{PluginCall, PluginDirectoryClient, RecordingPluginClient, SitePluginClient};
pub use model::{
    DirectoryEntry, DirectoryEntryFields, PluginDirectoryType, PluginInfo, PluginInfoFields, Site,
    SitePlugin, SitePluginFields,
};
pub use simulated::SimulatedPluginService;
pub use store::{PluginStore, PluginStoreConfig};
