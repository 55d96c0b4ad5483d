//! Directory-backed store: `<id>.json` for metadata, `<id>.svg` for the source.
//!
//! Everything is loaded into memory on open; writes go straight through to
//! disk and are skipped when a file's content would not change.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{MapStore, MemoryStore, StoreError};
use crate::freshness::ContentHash;
use crate::map::{DerivedCache, EntityRef, ImageMap, MapId, RegionSet, SourceImage};

/// On-disk shape of one image map (the source lives next to it).
#[derive(Debug, Serialize, Deserialize)]
struct StoredMap {
    id: MapId,
    title: String,
    source_hash: ContentHash,
    #[serde(default)]
    regions: RegionSet,
    #[serde(default)]
    derived: DerivedCache,
}

#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    inner: MemoryStore,
}

impl JsonStore {
    /// Open (creating if needed) a store directory and load every map in it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::Io(dir.clone(), e))?;

        let entries = fs::read_dir(&dir).map_err(|e| StoreError::Io(dir.clone(), e))?;
        let mut maps = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::Io(dir.clone(), e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                maps.push(load_map(&path)?);
            }
        }

        debug!("store"; "loaded {} image map(s) from {}", maps.len(), dir.display());
        Ok(Self {
            dir,
            inner: MemoryStore::from_maps(maps),
        })
    }

    fn json_path(&self, id: MapId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn svg_path(&self, id: MapId) -> PathBuf {
        self.dir.join(format!("{id}.svg"))
    }

    fn persist_map(&self, id: MapId) -> Result<(), StoreError> {
        let map = self.inner.map(id)?;
        let stored = StoredMap {
            id,
            title: map.title.clone(),
            source_hash: map.source.hash(),
            regions: map.regions.clone(),
            derived: map.derived.clone(),
        };
        let path = self.json_path(id);
        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| StoreError::Json(path.clone(), e))?;
        write_if_changed(&path, json.as_bytes())
    }

    fn persist_source(&self, id: MapId) -> Result<(), StoreError> {
        let map = self.inner.map(id)?;
        write_if_changed(&self.svg_path(id), map.source.bytes())
    }
}

impl MapStore for JsonStore {
    fn insert(&mut self, title: &str, source: SourceImage) -> Result<MapId, StoreError> {
        let id = self.inner.insert(title, source)?;
        self.persist_source(id)?;
        self.persist_map(id)?;
        Ok(id)
    }

    fn get(&self, id: MapId) -> Result<ImageMap, StoreError> {
        self.inner.get(id)
    }

    fn list(&self) -> Vec<MapId> {
        self.inner.list()
    }

    /// The `.svg` is written first. If the JSON write never happens, its
    /// stale `source_hash` no longer matches and the next open drops the old
    /// derived values instead of trusting them.
    fn commit_source(
        &mut self,
        id: MapId,
        source: &SourceImage,
        derived: &DerivedCache,
    ) -> Result<(), StoreError> {
        self.inner.commit_source(id, source, derived)?;
        self.persist_source(id)?;
        self.persist_map(id)
    }

    fn put_regions(&mut self, id: MapId, regions: &RegionSet) -> Result<(), StoreError> {
        self.inner.put_regions(id, regions)?;
        self.persist_map(id)
    }

    fn commit_derived(&mut self, id: MapId, derived: &DerivedCache) -> Result<(), StoreError> {
        self.inner.commit_derived(id, derived)?;
        self.persist_map(id)
    }

    fn maps_referencing(&self, entity: &EntityRef) -> Vec<MapId> {
        self.inner.maps_referencing(entity)
    }
}

/// Load one map and its sibling `.svg` file.
fn load_map(path: &Path) -> Result<ImageMap, StoreError> {
    let json = fs::read_to_string(path).map_err(|e| StoreError::Io(path.to_path_buf(), e))?;
    let stored: StoredMap =
        serde_json::from_str(&json).map_err(|e| StoreError::Json(path.to_path_buf(), e))?;

    let svg_path = path.with_extension("svg");
    let bytes = fs::read(&svg_path).map_err(|e| StoreError::Io(svg_path.clone(), e))?;
    let source = SourceImage::new(bytes);

    // The SVG was swapped behind our back: nothing derived can be trusted
    let derived = if source.hash() == stored.source_hash {
        stored.derived
    } else {
        log!("warning"; "{} changed outside svgmap, derived values dropped", svg_path.display());
        DerivedCache::default()
    };

    Ok(ImageMap {
        id: stored.id,
        title: stored.title,
        source,
        regions: stored.regions,
        derived,
    })
}

/// Check if file content is the same as new content
fn file_content_matches(path: &Path, content: &[u8]) -> bool {
    fs::read(path).is_ok_and(|existing| existing == content)
}

fn write_if_changed(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    if file_content_matches(path, content) {
        debug!("store"; "{} unchanged, skipping write", path.display());
        return Ok(());
    }
    fs::write(path, content).map_err(|e| StoreError::Io(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::EXAMPLE_SVG;
    use crate::map::{LinkSpec, Region};
    use tempfile::TempDir;

    fn regions() -> RegionSet {
        [Region {
            element_id: "blue".into(),
            link: LinkSpec::Entity(EntityRef::page("world")),
            target: Some("_blank".into()),
        }]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_json_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let id = {
            let mut store = JsonStore::open(dir.path()).unwrap();
            let id = store.insert("Shapes", SourceImage::new(EXAMPLE_SVG)).unwrap();
            store.put_regions(id, &regions()).unwrap();
            id
        };

        assert!(dir.path().join(format!("{id}.json")).exists());
        assert!(dir.path().join(format!("{id}.svg")).exists());

        let store = JsonStore::open(dir.path()).unwrap();
        let map = store.get(id).unwrap();
        assert_eq!(map.title, "Shapes");
        assert_eq!(map.source.bytes(), EXAMPLE_SVG.as_bytes());
        assert_eq!(map.regions, regions());
        assert_eq!(store.maps_referencing(&EntityRef::page("world")), [id]);
    }

    #[test]
    fn test_json_store_rewrites_on_change() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonStore::open(dir.path()).unwrap();
        let id = store.insert("m", SourceImage::new("<svg/>")).unwrap();
        let path = store.json_path(id);

        let before = fs::read(&path).unwrap();
        store.commit_derived(id, &DerivedCache::default()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), before);

        store.put_regions(id, &regions()).unwrap();
        assert_ne!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_json_store_drops_derived_on_external_edit() {
        let dir = TempDir::new().unwrap();
        let id = {
            let mut store = JsonStore::open(dir.path()).unwrap();
            let id = store.insert("m", SourceImage::new(EXAMPLE_SVG)).unwrap();
            let mut map = store.get(id).unwrap();
            map.recompute_ids(&Default::default()).unwrap();
            store.commit_derived(id, &map.derived).unwrap();
            id
        };

        let store = JsonStore::open(dir.path()).unwrap();
        assert!(store.get(id).unwrap().derived.ids.is_some());

        fs::write(dir.path().join(format!("{id}.svg")), "<svg><rect id=\"x\"/></svg>").unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        assert_eq!(store.get(id).unwrap().derived, DerivedCache::default());
    }

    #[test]
    fn test_json_store_commit_source_keeps_hash_and_derived_together() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonStore::open(dir.path()).unwrap();
        let id = store.insert("m", SourceImage::new(EXAMPLE_SVG)).unwrap();
        let mut map = store.get(id).unwrap();
        map.recompute_ids(&Default::default()).unwrap();
        store.commit_derived(id, &map.derived).unwrap();
        let old_json = fs::read(store.json_path(id)).unwrap();

        let replacement = SourceImage::new("<svg><rect id=\"x\"/></svg>");
        let mut replaced = store.get(id).unwrap();
        replaced.source = replacement.clone();
        replaced.recompute_ids(&Default::default()).unwrap();
        store.commit_source(id, &replacement, &replaced.derived).unwrap();

        let reopened = JsonStore::open(dir.path()).unwrap().get(id).unwrap();
        assert_eq!(reopened.source.hash(), replacement.hash());
        assert_eq!(reopened.derived, replaced.derived);

        // Only the `.svg` made it to disk: the old derived values are not trusted
        fs::write(store.json_path(id), &old_json).unwrap();
        let reopened = JsonStore::open(dir.path()).unwrap().get(id).unwrap();
        assert_eq!(reopened.source.bytes(), replacement.bytes());
        assert_eq!(reopened.derived, DerivedCache::default());
    }

    #[test]
    fn test_json_store_reports_bad_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("1.json"), "{not json").unwrap();
        assert!(matches!(
            JsonStore::open(dir.path()),
            Err(StoreError::Json(..))
        ));

        fs::write(
            dir.path().join("1.json"),
            format!(
                r#"{{"id": 1, "title": "t", "source_hash": "{}"}}"#,
                ContentHash::of("<svg/>").to_hex()
            ),
        )
        .unwrap();
        assert!(matches!(JsonStore::open(dir.path()), Err(StoreError::Io(..))));
    }
}
