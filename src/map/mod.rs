//! Image maps: a source SVG, its linked regions and the values derived from them.
//!
//! # Module Structure
//!
//! ```text
//! map/
//! ├── derived   # DerivedCache, recompute_ids / recompute_render
//! ├── resolve   # LinkResolver: LinkSpec -> LinkTarget
//! └── mod.rs    # ImageMap, Region, RegionSet, SourceImage (this file)
//! ```
//!
//! | Change                 | Invalidates       |
//! |------------------------|-------------------|
//! | source image replaced  | ids, render       |
//! | region added/edited    | render            |
//! | linked entity changed  | render            |

mod derived;
mod resolve;

pub use derived::{DerivedCache, IdsSlot, RenderSettings, RenderSlot, render_svg};
pub use resolve::{LinkResolver, StaticResolver, resolve_links};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::freshness::ContentHash;

// ============================================================================
// Identity
// ============================================================================

/// Store-assigned image map identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(pub u64);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MapId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

// ============================================================================
// Source image
// ============================================================================

/// Raw SVG bytes. Replaced as a whole, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    bytes: Vec<u8>,
    hash: ContentHash,
}

impl SourceImage {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let hash = ContentHash::of(&bytes);
        Self { bytes, hash }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn hash(&self) -> ContentHash {
        self.hash
    }
}

// ============================================================================
// Links
// ============================================================================

/// Kinds of external entity a region can link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Page,
    Document,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Document => "document",
        }
    }
}

/// Reference to an entity whose URL can change independently of the map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub key: String,
}

impl EntityRef {
    pub fn page(key: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Page,
            key: key.into(),
        }
    }

    pub fn document(key: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Document,
            key: key.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.key)
    }
}

impl FromStr for EntityRef {
    type Err = String;

    /// Parse `page:<key>` or `document:<key>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, key) = s
            .split_once(':')
            .ok_or_else(|| format!("expected `page:<key>` or `document:<key>`, got `{s}`"))?;
        if key.is_empty() {
            return Err(format!("empty entity key in `{s}`"));
        }
        match kind {
            "page" => Ok(Self::page(key)),
            "document" | "doc" => Ok(Self::document(key)),
            _ => Err(format!("unknown entity kind `{kind}`")),
        }
    }
}

/// What a region links to, before URL resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkSpec {
    /// A literal URL.
    External(String),
    /// A page or document, resolved to a URL at render time.
    Entity(EntityRef),
}

impl LinkSpec {
    /// The entity this link depends on, if any.
    pub fn entity(&self) -> Option<&EntityRef> {
        match self {
            Self::External(_) => None,
            Self::Entity(entity) => Some(entity),
        }
    }
}

impl fmt::Display for LinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External(url) => f.write_str(url),
            Self::Entity(entity) => fmt::Display::fmt(entity, f),
        }
    }
}

// ============================================================================
// Regions
// ============================================================================

/// Link attached to one element id. The id need not exist in the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub element_id: String,
    pub link: LinkSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Regions of one image map, unique by element id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionSet(BTreeMap<String, Region>);

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the region for `region.element_id`.
    pub fn upsert(&mut self, region: Region) -> Option<Region> {
        self.0.insert(region.element_id.clone(), region)
    }

    pub fn remove(&mut self, element_id: &str) -> Option<Region> {
        self.0.remove(element_id)
    }

    pub fn get(&self, element_id: &str) -> Option<&Region> {
        self.0.get(element_id)
    }

    /// Regions ordered by element id.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct entities referenced by any region.
    pub fn entities(&self) -> Vec<EntityRef> {
        let mut entities: Vec<EntityRef> = self
            .iter()
            .filter_map(|region| region.link.entity().cloned())
            .collect();
        entities.sort();
        entities.dedup();
        entities
    }
}

impl FromIterator<Region> for RegionSet {
    fn from_iter<I: IntoIterator<Item = Region>>(iter: I) -> Self {
        let mut set = Self::new();
        for region in iter {
            set.upsert(region);
        }
        set
    }
}

// ============================================================================
// Image map
// ============================================================================

/// Rendered markup plus intrinsic size; `(0, 0)` when indeterminate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedArtifact {
    pub markup: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct ImageMap {
    pub id: MapId,
    pub title: String,
    pub source: SourceImage,
    pub regions: RegionSet,
    pub derived: DerivedCache,
}

impl ImageMap {
    /// A new map with no regions and nothing derived yet.
    pub fn new(id: MapId, title: impl Into<String>, source: SourceImage) -> Self {
        Self {
            id,
            title: title.into(),
            source,
            regions: RegionSet::new(),
            derived: DerivedCache::default(),
        }
    }
}
