//! Which image maps link to which entities.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::map::{EntityRef, MapId};

type EntitySet = FxHashSet<EntityRef>;
type MapSet = FxHashSet<MapId>;

/// Bidirectional map <-> entity index.
///
/// Forward: image map -> entities its regions link to.
/// Reverse: entity -> image maps that must re-render when it changes.
///
/// # Invariants
/// - Forward and reverse mappings are always consistent
/// - Empty sets are never stored
#[derive(Debug, Default)]
pub struct DependencyIndex {
    forward: FxHashMap<MapId, EntitySet>,
    reverse: FxHashMap<EntityRef, MapSet>,
}

impl DependencyIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the entities a map references, replacing what was recorded before.
    pub fn record(&mut self, map: MapId, entities: impl IntoIterator<Item = EntityRef>) {
        self.remove(map);

        let entities: EntitySet = entities.into_iter().collect();
        if entities.is_empty() {
            return;
        }
        for entity in &entities {
            self.reverse.entry(entity.clone()).or_default().insert(map);
        }
        self.forward.insert(map, entities);
    }

    /// Maps referencing `entity`, in ascending id order.
    pub fn used_by(&self, entity: &EntityRef) -> Vec<MapId> {
        let mut maps: Vec<MapId> = self
            .reverse
            .get(entity)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        maps.sort_unstable();
        maps
    }

    /// Forget a map and clean up its reverse entries.
    pub fn remove(&mut self, map: MapId) {
        let Some(old) = self.forward.remove(&map) else {
            return;
        };
        for entity in old {
            if let Some(maps) = self.reverse.get_mut(&entity) {
                maps.remove(&map);
                if maps.is_empty() {
                    self.reverse.remove(&entity);
                }
            }
        }
    }
}
