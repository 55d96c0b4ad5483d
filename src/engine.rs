//! Entry points that keep every image map's derived values current.
//!
//! Every mutation follows the same shape: persist the input that changed,
//! recompute what it invalidates, then commit the derived cache in one call
//! if anything moved. A new source image is only stored together with the
//! derived values computed from it. Nothing is deferred, so an entry point that returns
//! `Ok` leaves the rendered artifact consistent with its inputs.
//!
//! | Entry point                   | Recomputes    |
//! |-------------------------------|---------------|
//! | `create_map`                  | ids, render   |
//! | `replace_source_image`        | ids, render   |
//! | `upsert_region`               | render        |
//! | `delete_region`               | render        |
//! | `notify_dependency_changed`   | render (each) |

use std::collections::BTreeSet;

use thiserror::Error;

use crate::map::{
    EntityRef, ImageMap, LinkResolver, LinkSpec, MapId, Region, RenderSettings, SourceImage,
    resolve_links,
};
use crate::store::{MapStore, StoreError};
use crate::svg::SvgError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Svg(#[from] SvgError),

    #[error(transparent)]
    Store(StoreError),

    #[error("image map {0} does not exist")]
    UnknownMap(MapId),

    #[error("region element id must not be empty")]
    EmptyElementId,

    /// The render inputs still differed from the stored fingerprint after a recompute.
    #[error("image map {0} did not settle after recompute")]
    NotConverged(MapId),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::UnknownMap(id),
            other => Self::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

pub struct Engine<S: MapStore, R: LinkResolver> {
    store: S,
    resolver: R,
    settings: RenderSettings,
}

impl<S: MapStore, R: LinkResolver> Engine<S, R> {
    pub fn new(store: S, resolver: R) -> Self {
        Self::with_settings(store, resolver, RenderSettings::default())
    }

    pub fn with_settings(store: S, resolver: R, settings: RenderSettings) -> Self {
        Self {
            store,
            resolver,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Entity URLs live in the resolver; change them here, then call
    /// [`Engine::notify_dependency_changed`].
    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Store a new image map and compute everything derived from it.
    ///
    /// The source is validated first, so a malformed image is never stored.
    pub fn create_map(&mut self, title: &str, svg: impl Into<Vec<u8>>) -> Result<MapId> {
        let source = SourceImage::new(svg);
        let mut draft = ImageMap::new(MapId(0), title, source.clone());
        draft.recompute_ids(&self.settings.vocabulary)?;
        self.refresh_render(&mut draft)?;

        let id = self.store.insert(title, source)?;
        self.store.commit_derived(id, &draft.derived)?;
        log!("map"; "created image map {} \"{}\"", id, title);
        Ok(id)
    }

    /// Swap the source image. Returns whether the rendered artifact changed.
    pub fn replace_source_image(&mut self, id: MapId, svg: impl Into<Vec<u8>>) -> Result<bool> {
        let mut map = self.store.get(id)?;
        map.source = SourceImage::new(svg);
        let ids_changed = map.recompute_ids(&self.settings.vocabulary)?;
        let render_changed = self.refresh_render(&mut map)?;
        self.ensure_converged(&map)?;

        self.store.commit_source(id, &map.source, &map.derived)?;
        debug!("map"; "map {} source replaced (ids changed: {}, render changed: {})", id, ids_changed, render_changed);
        Ok(render_changed)
    }

    /// Add or replace the link for `element_id`.
    ///
    /// The element does not have to exist in the current image.
    pub fn upsert_region(
        &mut self,
        id: MapId,
        element_id: &str,
        link: LinkSpec,
        target: Option<String>,
    ) -> Result<bool> {
        if element_id.is_empty() {
            return Err(EngineError::EmptyElementId);
        }
        let mut map = self.store.get(id)?;
        map.regions.upsert(Region {
            element_id: element_id.to_owned(),
            link,
            target: target.filter(|t| !t.is_empty()),
        });
        self.store.put_regions(id, &map.regions)?;
        self.refresh_and_commit(&mut map)
    }

    /// Remove the link for `element_id`. Removing a missing region is a no-op.
    pub fn delete_region(&mut self, id: MapId, element_id: &str) -> Result<bool> {
        let mut map = self.store.get(id)?;
        if map.regions.remove(element_id).is_none() {
            return Ok(false);
        }
        self.store.put_regions(id, &map.regions)?;
        self.refresh_and_commit(&mut map)
    }

    /// An external page or document changed (typically its URL).
    ///
    /// Re-renders every map that links to it and returns those whose
    /// rendered artifact actually changed. Id sets are never touched.
    pub fn notify_dependency_changed(&mut self, entity: &EntityRef) -> Result<Vec<MapId>> {
        let mut changed = Vec::new();
        for id in self.store.maps_referencing(entity) {
            let mut map = self.store.get(id)?;
            if self.refresh_and_commit(&mut map)? {
                log!("notify"; "re-rendered image map {} because {} changed", id, entity);
                changed.push(id);
            }
        }
        Ok(changed)
    }

    // ========================================================================
    // Getters (recompute absent slots on first access)
    // ========================================================================

    pub fn ids(&mut self, id: MapId) -> Result<BTreeSet<String>> {
        let mut map = self.store.get(id)?;
        if let Some(slot) = map.derived.ids.take() {
            return Ok(slot.ids);
        }
        map.recompute_ids(&self.settings.vocabulary)?;
        self.store.commit_derived(id, &map.derived)?;
        Ok(map.derived.ids.map(|slot| slot.ids).unwrap_or_default())
    }

    pub fn rendered_markup(&mut self, id: MapId) -> Result<String> {
        let map = self.rendered(id)?;
        Ok(map
            .derived
            .render
            .map(|slot| slot.artifact.markup)
            .unwrap_or_default())
    }

    /// `(width, height)`; `(0, 0)` when the image does not declare them.
    pub fn dimensions(&mut self, id: MapId) -> Result<(f64, f64)> {
        let map = self.rendered(id)?;
        Ok(map
            .derived
            .render
            .map(|slot| (slot.artifact.width, slot.artifact.height))
            .unwrap_or_default())
    }

    /// The source image exactly as stored.
    pub fn original_markup(&self, id: MapId) -> Result<Vec<u8>> {
        Ok(self.store.get(id)?.source.bytes().to_vec())
    }

    // ========================================================================
    // Private
    // ========================================================================

    /// Load a map, rendering it first if it never was.
    fn rendered(&mut self, id: MapId) -> Result<ImageMap> {
        let mut map = self.store.get(id)?;
        if map.derived.render.is_none() {
            self.refresh_and_commit(&mut map)?;
        }
        Ok(map)
    }

    fn refresh_render(&self, map: &mut ImageMap) -> Result<bool> {
        let links = resolve_links(&map.regions, &self.resolver);
        Ok(map.recompute_render(&links, &self.settings)?)
    }

    /// Recompute the render and commit it if the stored value moved.
    fn refresh_and_commit(&mut self, map: &mut ImageMap) -> Result<bool> {
        let old_render = map.derived.render.clone();
        let changed = self.refresh_render(map)?;
        if map.derived.render != old_render {
            self.store.commit_derived(map.id, &map.derived)?;
        }
        Ok(changed)
    }

    /// A single pass suffices: ids and render read the same source and the
    /// render does not read ids. This verifies that claim after the fact.
    fn ensure_converged(&self, map: &ImageMap) -> Result<()> {
        let links = resolve_links(&map.regions, &self.resolver);
        if map.render_is_current(&links, &self.settings) {
            Ok(())
        } else {
            Err(EngineError::NotConverged(map.id))
        }
    }
}
