//! Name resolution seam
//!
//! Log markers only carry numeric ids. Replication output needs the live
//! database name and the collection's persisted unique id, which belong to
//! whatever owns the schema. The [`Catalog`] trait is the boundary to it.
//!
//! Thread safety: lookups run concurrently from several tailing calls, so
//! implementations must be `Send + Sync`.

use crate::types::{CollectionId, DatabaseId};

/// A live database, as seen by the catalog at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatabaseRef {
    /// Numeric id
    pub id: DatabaseId,
    /// Current name
    pub name: String,
}

impl DatabaseRef {
    /// Create a database reference.
    pub fn new(id: DatabaseId, name: impl Into<String>) -> Self {
        DatabaseRef {
            id,
            name: name.into(),
        }
    }
}

/// A live collection, as seen by the catalog at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    /// Numeric id (transient)
    pub id: CollectionId,
    /// Current name
    pub name: String,
    /// Persisted globally unique id
    pub cuid: String,
}

impl CollectionRef {
    /// Create a collection reference.
    pub fn new(id: CollectionId, name: impl Into<String>, cuid: impl Into<String>) -> Self {
        CollectionRef {
            id,
            name: name.into(),
            cuid: cuid.into(),
        }
    }

    /// System collections are the ones whose name starts with `_`.
    pub fn is_system(&self) -> bool {
        is_system_name(&self.name)
    }
}

/// Whether a collection name denotes a system collection.
pub fn is_system_name(name: &str) -> bool {
    name.starts_with('_')
}

/// Resolves numeric ids to live schema objects.
///
/// A `None` answer means the object does not exist (anymore). Callers treat
/// that as a concurrent drop, never as an error.
pub trait Catalog: Send + Sync {
    /// Look up a database by id.
    fn database(&self, id: DatabaseId) -> Option<DatabaseRef>;

    /// Look up a collection inside a database.
    fn collection(&self, database: DatabaseId, id: CollectionId) -> Option<CollectionRef>;
}

impl<C: Catalog + ?Sized> Catalog for std::sync::Arc<C> {
    fn database(&self, id: DatabaseId) -> Option<DatabaseRef> {
        (**self).database(id)
    }

    fn collection(&self, database: DatabaseId, id: CollectionId) -> Option<CollectionRef> {
        (**self).collection(database, id)
    }
}
