//! In-memory catalog
//!
//! A [`Catalog`] backed by a `BTreeMap` under a `parking_lot::RwLock`.
//! Supports creating and dropping databases and collections while tailing
//! calls read from it, which is what replication sees in production when a
//! follower catches up while the schema changes.

use crate::error::{Error, Result};
use crate::traits::{Catalog, CollectionRef, DatabaseRef};
use crate::types::{CollectionId, DatabaseId};
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug)]
struct DatabaseEntry {
    name: String,
    collections: BTreeMap<CollectionId, CollectionRef>,
}

/// Thread-safe in-memory catalog.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    databases: RwLock<BTreeMap<DatabaseId, DatabaseEntry>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a database. Fails if the id is already taken.
    pub fn create_database(&self, id: DatabaseId, name: impl Into<String>) -> Result<()> {
        if id == 0 {
            return Err(Error::internal("database id 0 is reserved"));
        }
        let mut databases = self.databases.write();
        if databases.contains_key(&id) {
            return Err(Error::internal(format!("database {} already exists", id)));
        }
        databases.insert(
            id,
            DatabaseEntry {
                name: name.into(),
                collections: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Remove a database and all its collections. Returns whether it existed.
    pub fn drop_database(&self, id: DatabaseId) -> bool {
        self.databases.write().remove(&id).is_some()
    }

    /// Register a collection inside an existing database.
    pub fn create_collection(
        &self,
        database: DatabaseId,
        id: CollectionId,
        name: impl Into<String>,
        cuid: impl Into<String>,
    ) -> Result<()> {
        if id == 0 {
            return Err(Error::internal("collection id 0 is reserved"));
        }
        let mut databases = self.databases.write();
        let entry = databases
            .get_mut(&database)
            .ok_or_else(|| Error::not_found(format!("database {}", database)))?;
        if entry.collections.contains_key(&id) {
            return Err(Error::internal(format!(
                "collection {}/{} already exists",
                database, id
            )));
        }
        entry
            .collections
            .insert(id, CollectionRef::new(id, name, cuid));
        Ok(())
    }

    /// Remove a collection. Returns whether it existed.
    pub fn drop_collection(&self, database: DatabaseId, id: CollectionId) -> bool {
        self.databases
            .write()
            .get_mut(&database)
            .map(|entry| entry.collections.remove(&id).is_some())
            .unwrap_or(false)
    }

    /// Number of registered databases.
    pub fn database_count(&self) -> usize {
        self.databases.read().len()
    }
}

impl Catalog for InMemoryCatalog {
    fn database(&self, id: DatabaseId) -> Option<DatabaseRef> {
        self.databases
            .read()
            .get(&id)
            .map(|entry| DatabaseRef::new(id, entry.name.clone()))
    }

    fn collection(&self, database: DatabaseId, id: CollectionId) -> Option<CollectionRef> {
        self.databases
            .read()
            .get(&database)
            .and_then(|entry| entry.collections.get(&id).cloned())
    }
}
