//! Replication criteria
//!
//! [`Filter`] is what a follower asks for; [`MarkerFilter`] applies it,
//! together with the node's [`TailConfig`], to one decoded marker. Rules run
//! in a fixed order and the first failing rule decides the [`Rejection`]:
//!
//! 1. the kind must be replicable
//! 2. the effective database must match a database-scoped filter
//! 3. the effective collection must match a collection-scoped filter,
//!    unless the marker frames a transaction or has no collection
//! 4. system collections need `include_system`; excluded node-local
//!    collections never pass
//! 5. markers before `first_regular_tick` need an admitted transaction id
//! 6. the database and collection must still exist, except for the drop
//!    markers that report their disappearance

use crate::config::TailConfig;
use crate::names::NameCache;
use crate::serializer::payload_str;
use marklog_core::{is_system_name, CollectionId, DatabaseId, Tick, TransactionId};
use marklog_durability::{Marker, MarkerKind};
use rustc_hash::FxHashSet;

/// What a follower asks to receive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Database scope, `0` for all databases
    pub database: DatabaseId,
    /// Collection scope, `0` for all collections
    pub collection: CollectionId,
    /// Whether system collections are replicated
    pub include_system: bool,
    /// Markers before this tick belong to the follower's snapshot
    pub first_regular_tick: Tick,
    /// Transactions straddling the snapshot point that still replicate
    pub admitted_transactions: FxHashSet<TransactionId>,
}

impl Filter {
    /// Filter accepting everything except system collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one database (builder pattern).
    pub fn with_database(mut self, database: DatabaseId) -> Self {
        self.database = database;
        self
    }

    /// Restrict to one collection (builder pattern).
    pub fn with_collection(mut self, collection: CollectionId) -> Self {
        self.collection = collection;
        self
    }

    /// Include system collections (builder pattern).
    pub fn with_include_system(mut self, include: bool) -> Self {
        self.include_system = include;
        self
    }

    /// Set the first regular tick (builder pattern).
    pub fn with_first_regular_tick(mut self, tick: Tick) -> Self {
        self.first_regular_tick = tick;
        self
    }

    /// Admit transactions straddling the first regular tick (builder pattern).
    pub fn with_admitted_transactions<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = TransactionId>,
    {
        self.admitted_transactions.extend(ids);
        self
    }
}

/// Why a marker was not replicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Framing marker
    NotReplicable,
    /// Outside the database scope
    OtherDatabase,
    /// Outside the collection scope
    OtherCollection,
    /// System collection without `include_system`
    SystemCollection,
    /// Node-local collection from the exclusion list
    ExcludedCollection,
    /// Before the first regular tick and not part of an admitted transaction
    BeforeRegularTick,
    /// Database no longer exists
    DatabaseGone,
    /// Collection no longer exists
    CollectionGone,
}

impl Rejection {
    /// Stable name for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Rejection::NotReplicable => "not_replicable",
            Rejection::OtherDatabase => "other_database",
            Rejection::OtherCollection => "other_collection",
            Rejection::SystemCollection => "system_collection",
            Rejection::ExcludedCollection => "excluded_collection",
            Rejection::BeforeRegularTick => "before_regular_tick",
            Rejection::DatabaseGone => "database_gone",
            Rejection::CollectionGone => "collection_gone",
        }
    }
}

/// Applies a [`Filter`] and the node configuration to markers.
#[derive(Debug, Clone, Copy)]
pub struct MarkerFilter<'f> {
    filter: &'f Filter,
    config: &'f TailConfig,
}

impl<'f> MarkerFilter<'f> {
    /// Create a filter evaluator.
    pub fn new(filter: &'f Filter, config: &'f TailConfig) -> Self {
        MarkerFilter { filter, config }
    }

    /// Whether the marker replicates.
    pub fn accept(
        &self,
        marker: &Marker<'_>,
        database: DatabaseId,
        collection: CollectionId,
        names: &mut NameCache<'_>,
    ) -> bool {
        self.check(marker, database, collection, names).is_ok()
    }

    /// Run the rules in order; `database` and `collection` are the marker's
    /// effective owner ids.
    pub fn check(
        &self,
        marker: &Marker<'_>,
        database: DatabaseId,
        collection: CollectionId,
        names: &mut NameCache<'_>,
    ) -> Result<(), Rejection> {
        let kind = marker.kind();
        let filter = self.filter;

        if !kind.is_replicable() {
            return Err(Rejection::NotReplicable);
        }

        if filter.database != 0 && filter.database != database {
            return Err(Rejection::OtherDatabase);
        }

        // Database and view events carry no collection and pass the scope
        if filter.collection != 0
            && collection != 0
            && !kind.is_transaction()
            && filter.collection != collection
        {
            return Err(Rejection::OtherCollection);
        }

        if collection != 0 {
            self.check_system(marker, database, collection, names)?;
        }

        if marker.tick() < filter.first_regular_tick {
            let tid = marker.transaction_id();
            if tid == 0 || !filter.admitted_transactions.contains(&tid) {
                return Err(Rejection::BeforeRegularTick);
            }
        }

        if !matches!(kind, MarkerKind::DropDatabase | MarkerKind::DropCollection) {
            if database != 0 && names.database(database).is_none() {
                return Err(Rejection::DatabaseGone);
            }
            if collection != 0 && names.collection(database, collection).is_none() {
                return Err(Rejection::CollectionGone);
            }
        }

        Ok(())
    }

    fn check_system(
        &self,
        marker: &Marker<'_>,
        database: DatabaseId,
        collection: CollectionId,
        names: &mut NameCache<'_>,
    ) -> Result<(), Rejection> {
        let name = match names.collection(database, collection) {
            Some(resolved) => Some(resolved.name.clone()),
            // A dropped collection is only known by the name in its drop marker
            None if marker.kind() == MarkerKind::DropCollection => {
                payload_str(marker, "name").ok().flatten()
            }
            None => None,
        };

        if let Some(name) = name {
            if is_system_name(&name) {
                if self.config.is_excluded(&name) {
                    return Err(Rejection::ExcludedCollection);
                }
                if !self.filter.include_system {
                    return Err(Rejection::SystemCollection);
                }
            }
        }
        Ok(())
    }
}
