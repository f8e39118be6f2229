//! Per-call name cache over a [`Catalog`].
//!
//! Only successful lookups are cached; a miss asks the catalog again next
//! time. Once resolved, a name stays valid for the rest of the call even if
//! the object is dropped concurrently.

use marklog_core::{Catalog, CollectionId, CollectionRef, DatabaseId, DatabaseRef};
use rustc_hash::FxHashMap;

/// Memoizing resolver used by one tailing call.
pub struct NameCache<'c> {
    catalog: &'c dyn Catalog,
    databases: FxHashMap<DatabaseId, DatabaseRef>,
    collections: FxHashMap<(DatabaseId, CollectionId), CollectionRef>,
}

impl<'c> NameCache<'c> {
    /// Create an empty cache over `catalog`.
    pub fn new(catalog: &'c dyn Catalog) -> Self {
        NameCache {
            catalog,
            databases: FxHashMap::default(),
            collections: FxHashMap::default(),
        }
    }

    /// Resolve a database. Id `0` never resolves.
    pub fn database(&mut self, id: DatabaseId) -> Option<&DatabaseRef> {
        if id == 0 {
            return None;
        }
        if !self.databases.contains_key(&id) {
            let found = self.catalog.database(id)?;
            self.databases.insert(id, found);
        }
        self.databases.get(&id)
    }

    /// Resolve a collection. Id `0` never resolves.
    pub fn collection(&mut self, database: DatabaseId, id: CollectionId) -> Option<&CollectionRef> {
        if id == 0 {
            return None;
        }
        let key = (database, id);
        if !self.collections.contains_key(&key) {
            let found = self.catalog.collection(database, id)?;
            self.collections.insert(key, found);
        }
        self.collections.get(&key)
    }

    /// Resolve and cache a collection ahead of use. Returns whether it resolved.
    pub fn prime(&mut self, database: DatabaseId, id: CollectionId) -> bool {
        self.collection(database, id).is_some()
    }
}

impl std::fmt::Debug for NameCache<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameCache")
            .field("databases", &self.databases.len())
            .field("collections", &self.collections.len())
            .finish()
    }
}
