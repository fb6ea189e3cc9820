use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Domain data carried by a [`Record`](crate::Record).
///
/// Implementors are plain data; the gateway stores them as JSON inside the
/// named collection. Only [`COLLECTION`](Fields::COLLECTION) is required.
///
/// Override the provided methods when the domain needs:
/// - a natural key for rows whose local identity may be unknown
///   (a plugin reported by the server is identified by its name)
/// - to keep values the server never echoes back after the first push
///   (a creation date set on the device)
pub trait Fields:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Gateway collection holding records of this type.
    const COLLECTION: &'static str;

    /// Key unique within an owner, if the domain has one.
    fn natural_key(&self) -> Option<String> {
        None
    }

    /// Called on server fields after the first successful push of a
    /// local-only record, with the pre-push local fields.
    /// Default keeps the server copy untouched.
    fn keep_unechoed(&mut self, local: &Self) {
        let _ = local;
    }
}
