//! Image map persistence.
//!
//! # Module Structure
//!
//! ```text
//! store/
//! ├── deps     # DependencyIndex (entity -> maps)
//! ├── memory   # MemoryStore
//! ├── json     # JsonStore (one JSON file + one SVG file per map)
//! └── mod.rs   # MapStore trait, StoreError (this file)
//! ```

mod deps;
mod json;
mod memory;

pub use deps::DependencyIndex;
pub use json::JsonStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use thiserror::Error;

use crate::map::{DerivedCache, EntityRef, ImageMap, MapId, RegionSet, SourceImage};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error when accessing `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid JSON in `{0}`")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("image map {0} not found")]
    NotFound(MapId),
}

/// Storage for image maps and their derived values.
///
/// Every write replaces one part of a map as a whole. Derived values go
/// through [`MapStore::commit_derived`] so ids, markup and dimensions are
/// never observed half-updated. A new source always travels together with
/// the derived values computed from it ([`MapStore::commit_source`]).
pub trait MapStore {
    /// Store a new map with no regions and nothing derived.
    fn insert(&mut self, title: &str, source: SourceImage) -> Result<MapId, StoreError>;

    fn get(&self, id: MapId) -> Result<ImageMap, StoreError>;

    /// All map ids in ascending order.
    fn list(&self) -> Vec<MapId>;

    /// Replace the source and the derived values computed from it in one commit.
    fn commit_source(
        &mut self,
        id: MapId,
        source: &SourceImage,
        derived: &DerivedCache,
    ) -> Result<(), StoreError>;

    /// Replace the region set and refresh the dependency index.
    fn put_regions(&mut self, id: MapId, regions: &RegionSet) -> Result<(), StoreError>;

    fn commit_derived(&mut self, id: MapId, derived: &DerivedCache) -> Result<(), StoreError>;

    /// Maps with at least one region linking to `entity`.
    fn maps_referencing(&self, entity: &EntityRef) -> Vec<MapId>;
}
