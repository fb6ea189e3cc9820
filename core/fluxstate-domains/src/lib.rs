//! Domain stores for fluxstate.
//!
//! Each domain module provides its record fields, its action enum and
//! change causes, the store that handles them, a remote client trait, a
//! recording client for tests and a simulated in-process service.
//!
//! - [`posts`]: posts and pages, with optimistic local drafts
//! - [`plugins`]: plugins installed on a site and the public directory

pub mod plugins;
pub mod posts;
mod simulated;

pub use plugins::{PluginAction, PluginCause, PluginStore, PluginStoreConfig};
pub use posts::{PostAction, PostCause, PostStore, PostStoreConfig};
pub use simulated::{DeleteMode, SimulatedServiceConfig};
