//! Entity and document traits: identity plus a home collection.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity persisted as a JSON document in a named collection.
///
/// The document key is the identifier's `Display` form, so a lookup by id
/// never needs the document body.
pub trait Document: Entity + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the document lives in (e.g. `"products"`).
    const COLLECTION: &'static str;

    fn key_of(id: &Self::Id) -> String {
        id.to_string()
    }

    fn key(&self) -> String {
        Self::key_of(self.id())
    }
}
