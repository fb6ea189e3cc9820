//! Core record model for fluxstate.
//!
//! Defines the universal types that every store and the gateway depend on:
//! - [`Record`]: a persisted domain record with local/remote bookkeeping
//! - [`RemoteRecord`]: the server-canonical form returned by remote clients
//! - [`Fields`]: the trait domain data implements (collection, natural key,
//!   fields the server does not echo)
//! - [`PageRequest`]: paging parameters for list fetches

mod fields;
mod paging;
mod record;

pub use fields::Fields;
pub use paging::{PageRequest, can_load_more};
pub use record::{Record, RemoteRecord};
