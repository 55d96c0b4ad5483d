//! In-process store.

use std::collections::BTreeMap;

use super::{DependencyIndex, MapStore, StoreError};
use crate::map::{DerivedCache, EntityRef, ImageMap, MapId, RegionSet, SourceImage};

#[derive(Debug, Default)]
pub struct MemoryStore {
    maps: BTreeMap<MapId, ImageMap>,
    deps: DependencyIndex,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already loaded maps, rebuilding the dependency index.
    pub(super) fn from_maps(maps: impl IntoIterator<Item = ImageMap>) -> Self {
        let mut store = Self::new();
        for map in maps {
            store.deps.record(map.id, map.regions.entities());
            store.next_id = store.next_id.max(map.id.0);
            store.maps.insert(map.id, map);
        }
        store
    }

    pub(super) fn map(&self, id: MapId) -> Result<&ImageMap, StoreError> {
        self.maps.get(&id).ok_or(StoreError::NotFound(id))
    }

    fn map_mut(&mut self, id: MapId) -> Result<&mut ImageMap, StoreError> {
        self.maps.get_mut(&id).ok_or(StoreError::NotFound(id))
    }
}

impl MapStore for MemoryStore {
    fn insert(&mut self, title: &str, source: SourceImage) -> Result<MapId, StoreError> {
        self.next_id += 1;
        let id = MapId(self.next_id);
        self.maps.insert(id, ImageMap::new(id, title, source));
        Ok(id)
    }

    fn get(&self, id: MapId) -> Result<ImageMap, StoreError> {
        self.map(id).cloned()
    }

    fn list(&self) -> Vec<MapId> {
        self.maps.keys().copied().collect()
    }

    fn commit_source(
        &mut self,
        id: MapId,
        source: &SourceImage,
        derived: &DerivedCache,
    ) -> Result<(), StoreError> {
        let map = self.map_mut(id)?;
        map.source = source.clone();
        map.derived = derived.clone();
        Ok(())
    }

    fn put_regions(&mut self, id: MapId, regions: &RegionSet) -> Result<(), StoreError> {
        self.map_mut(id)?.regions = regions.clone();
        self.deps.record(id, regions.entities());
        Ok(())
    }

    fn commit_derived(&mut self, id: MapId, derived: &DerivedCache) -> Result<(), StoreError> {
        self.map_mut(id)?.derived = derived.clone();
        Ok(())
    }

    fn maps_referencing(&self, entity: &EntityRef) -> Vec<MapId> {
        self.deps.used_by(entity)
    }
}
