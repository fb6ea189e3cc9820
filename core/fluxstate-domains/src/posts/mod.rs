//! Posts and pages.

mod action;
mod client;
mod model;
mod simulated;
mod store;

pub use action::{PostAction, PostCause, PostChangeEvent};
pub use client::{PostCall, PostRemoteClient, RecordingPostClient};
pub use model::{Post, PostFields, PostStatus};
pub use simulated::SimulatedPostService;
pub use store::{PostStore, PostStoreConfig};
