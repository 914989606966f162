//! In-memory storage backend for Ward Station.
//!
//! Implements every `ward-storage` repository trait. Per-record tables are
//! sharded `dashmap` maps with compare-and-swap on the version; the
//! bed/admission aggregate lives behind one `tokio` lock so an
//! [`OccupancyCommit`](ward_storage::OccupancyCommit) is checked and applied
//! as a unit.
//!
//! ```ignore
//! use ward_db_memory::InMemoryStore;
//! use ward_storage::OrderStore;
//!
//! let store = InMemoryStore::new();
//! let stored = store.insert_order(order).await?;
//! ```

mod occupancy;
mod store;
mod table;

pub use store::InMemoryStore;
pub use table::VersionedTable;

/// Creates a new shared in-memory store.
pub fn create_store() -> ward_storage::DynWardStore {
    std::sync::Arc::new(InMemoryStore::new())
}
