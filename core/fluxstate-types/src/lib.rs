//! Core type definitions for fluxstate.
//!
//! This crate defines the fundamental, domain-agnostic types used throughout
//! the engine:
//! - Local, remote and owner identifiers
//! - The typed error value carried on result payloads and change events
//!
//! Domain-specific record fields (posts, plugins, ...) belong in
//! `fluxstate-domains`, not here.

mod action_error;
mod ids;

pub use action_error::{ActionError, ErrorKind};
pub use ids::{LocalId, OwnerId, RemoteId};

/// Errors raised while constructing or parsing core types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid id: {0}")]
    InvalidId(String),
}
