//! Derived values of an image map and how they are recomputed.
//!
//! Two slots, each `None` until first computed: the id set and the rendered
//! artifact. Presence is tracked separately from content, so an image with no
//! linkable ids has `Some` empty id set rather than looking uncomputed.
//!
//! Both recompute functions are idempotent and report whether the stored
//! value changed. Render additionally records a fingerprint of its inputs and
//! skips the parse when the fingerprint still matches.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{ImageMap, RenderedArtifact};
use crate::freshness::{ContentHash, Fingerprint};
use crate::svg::{
    Document, LinkMap, Serializer, SvgError, Vocabulary, WrappedLink, ensure_svg_root,
    normalize_dimensions, read_dimensions, scan_ids, wrap_links,
};

/// Linkable element ids, computed from `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdsSlot {
    pub ids: BTreeSet<String>,
    pub source: ContentHash,
}

/// Rendered artifact plus the fingerprint of the inputs it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSlot {
    pub artifact: RenderedArtifact,
    pub fingerprint: ContentHash,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedCache {
    #[serde(default)]
    pub ids: Option<IdsSlot>,
    #[serde(default)]
    pub render: Option<RenderSlot>,
}

/// Knobs shared by every render.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub vocabulary: Vocabulary,
    pub serializer: Serializer,
    /// Check that every wrapped link's URL made it into the output.
    pub verify_links: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::visible(),
            serializer: Serializer::new(),
            verify_links: true,
        }
    }
}

impl RenderSettings {
    /// Fingerprint of everything a render of `source` with `links` depends on.
    pub fn fingerprint(&self, source: ContentHash, links: &LinkMap) -> ContentHash {
        let mut fp = Fingerprint::new("svgmap-render");
        fp.field(source.as_bytes());

        match &self.vocabulary {
            Vocabulary::Any => {
                fp.field("*");
            }
            Vocabulary::Tags(tags) => {
                let mut tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                tags.sort_unstable();
                fp.field(tags.join(" "));
            }
        }

        for (uri, prefix) in self.serializer.prefixes() {
            fp.field(uri).field(prefix);
        }
        fp.field([u8::from(self.verify_links)]);

        fp.field((links.len() as u64).to_le_bytes());
        for (element_id, link) in links {
            fp.field(element_id)
                .field(&link.url)
                .optional(link.target.as_deref());
        }
        fp.finish()
    }
}

impl ImageMap {
    /// Rescan the source for linkable ids.
    pub fn recompute_ids(&mut self, vocabulary: &Vocabulary) -> Result<bool, SvgError> {
        let ids = scan_ids(self.source.bytes(), vocabulary).collect::<Result<BTreeSet<_>, _>>()?;
        let slot = IdsSlot {
            ids,
            source: self.source.hash(),
        };

        let changed = self.derived.ids.as_ref().is_none_or(|old| old.ids != slot.ids);
        debug!("ids"; "map {}: {} ids{}", self.id, slot.ids.len(), if changed { "" } else { " (unchanged)" });
        self.derived.ids = Some(slot);
        Ok(changed)
    }

    /// Re-render with the already resolved `links`.
    pub fn recompute_render(
        &mut self,
        links: &LinkMap,
        settings: &RenderSettings,
    ) -> Result<bool, SvgError> {
        let fingerprint = settings.fingerprint(self.source.hash(), links);
        if self
            .derived
            .render
            .as_ref()
            .is_some_and(|slot| slot.fingerprint == fingerprint)
        {
            debug!("render"; "map {}: inputs {} unchanged, skipping", self.id, fingerprint);
            return Ok(false);
        }

        let artifact = render_svg(self.source.bytes(), links, settings)?;
        let changed = self
            .derived
            .render
            .as_ref()
            .is_none_or(|old| old.artifact != artifact);
        debug!("render"; "map {}: rendered {} bytes{}", self.id, artifact.markup.len(), if changed { "" } else { " (unchanged)" });

        self.derived.render = Some(RenderSlot {
            artifact,
            fingerprint,
        });
        Ok(changed)
    }

    /// Whether the stored render was built from exactly these inputs.
    pub fn render_is_current(&self, links: &LinkMap, settings: &RenderSettings) -> bool {
        let fingerprint = settings.fingerprint(self.source.hash(), links);
        self.derived
            .render
            .as_ref()
            .is_some_and(|slot| slot.fingerprint == fingerprint)
    }
}

/// Full render pipeline: parse, wrap, normalize, serialize, verify, measure.
///
/// Unreadable dimensions are not fatal: the artifact gets `(0, 0)` and a
/// warning is logged.
pub fn render_svg(
    source: &[u8],
    links: &LinkMap,
    settings: &RenderSettings,
) -> Result<RenderedArtifact, SvgError> {
    let mut doc = Document::parse(source)?;
    ensure_svg_root(&doc)?;

    let wrapped = wrap_links(&mut doc, links, &settings.vocabulary)?;
    normalize_dimensions(&mut doc)?;
    let markup = settings.serializer.serialize(&mut doc)?;

    if settings.verify_links {
        verify_links(&markup, &wrapped)?;
    }

    let (width, height) = match read_dimensions(&doc) {
        Ok(Some(size)) => size,
        Ok(None) => (0.0, 0.0),
        Err(SvgError::Dimension(message)) => {
            log!("warning"; "{message}, using 0x0");
            (0.0, 0.0)
        }
        Err(e) => return Err(e),
    };

    Ok(RenderedArtifact {
        markup,
        width,
        height,
    })
}

/// Every wrapped link's (escaped) URL must appear in the output.
fn verify_links(markup: &str, wrapped: &[WrappedLink]) -> Result<(), SvgError> {
    for link in wrapped {
        let escaped = quick_xml::escape::escape(link.link.url.as_str());
        if !markup.contains(escaped.as_ref()) {
            return Err(SvgError::Consistency(format!(
                "link `{}` for `{}` is missing from the rendered markup",
                link.link.url, link.element_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{EXAMPLE_SVG, EXAMPLE2_SVG, IDS_IN_EXAMPLE_SVG, IDS_IN_EXAMPLE2_SVG};
    use crate::map::{MapId, SourceImage};
    use crate::svg::LinkTarget;

    fn map(svg: &str) -> ImageMap {
        ImageMap::new(MapId(1), "test", SourceImage::new(svg))
    }

    fn links() -> LinkMap {
        LinkMap::from([
            ("green".to_owned(), LinkTarget::from("/hello")),
            (
                "blue".to_owned(),
                LinkTarget::new("/world").with_target("_blank"),
            ),
        ])
    }

    fn id_set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_recompute_ids_is_idempotent() {
        let mut map = map(EXAMPLE_SVG);
        assert!(map.recompute_ids(&Vocabulary::visible()).unwrap());
        assert_eq!(map.derived.ids.as_ref().unwrap().ids, id_set(&IDS_IN_EXAMPLE_SVG));
        assert!(!map.recompute_ids(&Vocabulary::visible()).unwrap());
    }

    #[test]
    fn test_empty_id_set_is_present() {
        let mut map = map("<svg><defs id=\"d\"/></svg>");
        assert!(map.recompute_ids(&Vocabulary::visible()).unwrap());
        let slot = map.derived.ids.as_ref().unwrap();
        assert!(slot.ids.is_empty());
        assert!(!map.recompute_ids(&Vocabulary::visible()).unwrap());
    }

    #[test]
    fn test_recompute_render_is_idempotent() {
        let settings = RenderSettings::default();
        let mut map = map(EXAMPLE_SVG);
        assert!(map.recompute_render(&links(), &settings).unwrap());
        let first = map.derived.render.clone().unwrap();
        assert!(!map.recompute_render(&links(), &settings).unwrap());
        assert_eq!(map.derived.render.unwrap(), first);

        assert!(first.artifact.markup.contains(r#"xlink:href="/hello""#));
        assert_eq!((first.artifact.width, first.artifact.height), (588.0, 588.0));
    }

    #[test]
    fn test_render_without_fingerprint_match_still_detects_no_change() {
        let settings = RenderSettings::default();
        let mut map = map(EXAMPLE_SVG);
        map.recompute_render(&links(), &settings).unwrap();

        // Forget the fingerprint: the full render runs but the artifact is the same
        let slot = map.derived.render.as_mut().unwrap();
        slot.fingerprint = ContentHash::new([0; 32]);
        assert!(!map.recompute_render(&links(), &settings).unwrap());
        assert!(map.render_is_current(&links(), &settings));
    }

    #[test]
    fn test_render_changes_with_links() {
        let settings = RenderSettings::default();
        let mut map = map(EXAMPLE_SVG);
        map.recompute_render(&links(), &settings).unwrap();

        let mut changed = links();
        changed.insert("red".into(), LinkTarget::from("/red"));
        assert!(!map.render_is_current(&changed, &settings));
        assert!(map.recompute_render(&changed, &settings).unwrap());
        let markup = &map.derived.render.as_ref().unwrap().artifact.markup;
        assert!(markup.contains(r#"<a xlink:href="/red"><rect id="red""#));
    }

    #[test]
    fn test_render_settings_are_part_of_fingerprint() {
        let mut map = map(EXAMPLE_SVG);
        map.recompute_render(&links(), &RenderSettings::default()).unwrap();

        let unverified = RenderSettings {
            verify_links: false,
            ..RenderSettings::default()
        };
        assert!(!map.render_is_current(&links(), &unverified));
        // Same markup, new fingerprint
        assert!(!map.recompute_render(&links(), &unverified).unwrap());
        assert!(map.render_is_current(&links(), &unverified));

        let prefixed = RenderSettings {
            serializer: Serializer::new()
                .with_prefix("ink", "http://www.inkscape.org/namespaces/inkscape"),
            ..RenderSettings::default()
        };
        assert!(!map.render_is_current(&links(), &prefixed));
        assert!(map.recompute_render(&links(), &prefixed).unwrap());
        let markup = &map.derived.render.as_ref().unwrap().artifact.markup;
        assert!(markup.contains(r#"xmlns:ink="http://www.inkscape.org/namespaces/inkscape""#));
    }

    #[test]
    fn test_render_example2_dimensions() {
        let settings = RenderSettings::default();
        let mut map = map(EXAMPLE2_SVG);
        map.recompute_ids(&settings.vocabulary).unwrap();
        assert_eq!(map.derived.ids.as_ref().unwrap().ids, id_set(&IDS_IN_EXAMPLE2_SVG));

        map.recompute_render(&LinkMap::new(), &settings).unwrap();
        let artifact = &map.derived.render.as_ref().unwrap().artifact;
        assert!(artifact.markup.contains(r#"viewBox="0 0 588 588""#));
        assert!(!artifact.markup.contains(r#"width="588""#));
        assert_eq!((artifact.width, artifact.height), (588.0, 588.0));
    }

    #[test]
    fn test_render_degrades_bad_dimensions() {
        let artifact = render_svg(
            br#"<svg width="100%" height="50"><rect id="r"/></svg>"#,
            &LinkMap::new(),
            &RenderSettings::default(),
        )
        .unwrap();
        assert_eq!((artifact.width, artifact.height), (0.0, 0.0));
        assert!(artifact.markup.contains(r#"viewBox="0 0 100% 50""#));

        let artifact = render_svg(
            br#"<svg viewBox="0 0 NaN 10"><rect id="r"/></svg>"#,
            &LinkMap::new(),
            &RenderSettings::default(),
        )
        .unwrap();
        assert_eq!((artifact.width, artifact.height), (0.0, 0.0));
    }

    #[test]
    fn test_render_escapes_urls() {
        let links = LinkMap::from([("red".to_owned(), LinkTarget::from("/search?a=1&b=2"))]);
        let artifact = render_svg(EXAMPLE_SVG.as_bytes(), &links, &RenderSettings::default()).unwrap();
        assert!(artifact.markup.contains(r#"xlink:href="/search?a=1&amp;b=2""#));
    }

    #[test]
    fn test_render_rejects_bad_input() {
        let settings = RenderSettings::default();
        assert!(matches!(
            render_svg(b"<svg><g></svg>", &LinkMap::new(), &settings),
            Err(SvgError::Parse { .. })
        ));
        assert!(matches!(
            render_svg(b"<html/>", &LinkMap::new(), &settings),
            Err(SvgError::NotSvg(_))
        ));

        // Nothing is cached on failure
        let mut map = map("<svg>");
        assert!(map.recompute_render(&LinkMap::new(), &settings).is_err());
        assert!(map.recompute_ids(&settings.vocabulary).is_err());
        assert_eq!(map.derived, DerivedCache::default());
    }

    #[test]
    fn test_verify_links_detects_missing_url() {
        let root = Document::parse(b"<svg/>").unwrap().root();
        let wrapped = vec![WrappedLink {
            element: root,
            anchor: root,
            element_id: "red".into(),
            link: LinkTarget::from("/nowhere"),
        }];
        assert!(matches!(
            verify_links("<svg/>", &wrapped),
            Err(SvgError::Consistency(_))
        ));
        assert!(verify_links(r#"<a xlink:href="/nowhere"/>"#, &wrapped).is_ok());
    }
}
