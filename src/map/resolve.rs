//! Turning region link specs into concrete URLs.

use rustc_hash::FxHashMap;

use super::{EntityKind, EntityRef, LinkSpec, RegionSet};
use crate::svg::{LinkMap, LinkTarget};

/// Computes the current URL of a page or document.
///
/// Returning `None` (entity gone, unpublished, ...) leaves the region
/// unlinked, the same as an empty URL.
pub trait LinkResolver {
    fn resolve(&self, entity: &EntityRef) -> Option<String>;
}

impl<R: LinkResolver + ?Sized> LinkResolver for &R {
    fn resolve(&self, entity: &EntityRef) -> Option<String> {
        (**self).resolve(entity)
    }
}

/// Resolver backed by fixed key -> URL tables (`[entities.*]` in the config).
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    urls: FxHashMap<EntityRef, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every `key = url` pair of one entity kind.
    pub fn with_table<'a>(
        mut self,
        kind: EntityKind,
        table: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Self {
        for (key, url) in table {
            self.set(
                EntityRef {
                    kind,
                    key: key.clone(),
                },
                url.clone(),
            );
        }
        self
    }

    /// Set (or change) the URL of an entity.
    pub fn set(&mut self, entity: EntityRef, url: impl Into<String>) {
        self.urls.insert(entity, url.into());
    }

    pub fn remove(&mut self, entity: &EntityRef) -> Option<String> {
        self.urls.remove(entity)
    }
}

impl LinkResolver for StaticResolver {
    fn resolve(&self, entity: &EntityRef) -> Option<String> {
        self.urls.get(entity).cloned()
    }
}

/// Resolve every region into the element id -> link map the compositor uses.
///
/// Regions that resolve to an empty URL are left out.
pub fn resolve_links(regions: &RegionSet, resolver: &dyn LinkResolver) -> LinkMap {
    let mut links = LinkMap::new();
    for region in regions.iter() {
        let url = match &region.link {
            LinkSpec::External(url) => Some(url.clone()),
            LinkSpec::Entity(entity) => {
                let url = resolver.resolve(entity);
                if url.is_none() {
                    crate::debug!("render"; "{} does not resolve, #{} left unlinked", entity, region.element_id);
                }
                url
            }
        };
        let Some(url) = url.filter(|url| !url.is_empty()) else {
            continue;
        };

        let mut link = LinkTarget::new(url);
        if let Some(target) = region.target.as_deref().filter(|t| !t.is_empty()) {
            link = link.with_target(target);
        }
        links.insert(region.element_id.clone(), link);
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Region;

    fn regions() -> RegionSet {
        [
            Region {
                element_id: "red".into(),
                link: LinkSpec::External("https://example.com/".into()),
                target: Some(String::new()),
            },
            Region {
                element_id: "blue".into(),
                link: LinkSpec::Entity(EntityRef::page("world")),
                target: Some("_blank".into()),
            },
            Region {
                element_id: "green".into(),
                link: LinkSpec::Entity(EntityRef::document("missing")),
                target: None,
            },
            Region {
                element_id: "yellow".into(),
                link: LinkSpec::External(String::new()),
                target: None,
            },
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_resolve_links() {
        let mut resolver = StaticResolver::new();
        resolver.set(EntityRef::page("world"), "/world/");

        let links = resolve_links(&regions(), &resolver);
        assert_eq!(links.len(), 2);
        assert_eq!(links["red"], LinkTarget::new("https://example.com/"));
        assert_eq!(links["blue"], LinkTarget::new("/world/").with_target("_blank"));
        assert!(!links.contains_key("green"));
        assert!(!links.contains_key("yellow"));
    }

    #[test]
    fn test_resolver_follows_url_changes() {
        let mut resolver = StaticResolver::new();
        resolver.set(EntityRef::page("world"), "/world/");
        resolver.set(EntityRef::page("world"), "/maailma/");
        let links = resolve_links(&regions(), &resolver);
        assert_eq!(links["blue"].url, "/maailma/");

        resolver.remove(&EntityRef::page("world"));
        let links = resolve_links(&regions(), &resolver);
        assert!(!links.contains_key("blue"));
    }

    #[test]
    fn test_resolver_from_table() {
        let table = std::collections::BTreeMap::from([("manual".to_owned(), "/docs/manual.pdf".to_owned())]);
        let resolver = StaticResolver::new().with_table(EntityKind::Document, &table);
        assert_eq!(
            resolver.resolve(&EntityRef::document("manual")).as_deref(),
            Some("/docs/manual.pdf")
        );
        assert_eq!(resolver.resolve(&EntityRef::page("manual")), None);
    }
}
