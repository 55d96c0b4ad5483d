//! Wrap elements in `<a>` anchors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Document, Element, NodeId, QName, SvgError, Vocabulary, XLINK_NS};

/// A resolved link destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkTarget {
    pub url: String,
    /// HTML link target (`_blank` for a new window, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl LinkTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Build the `<a>` element for this link. Empty values are omitted.
    fn anchor(&self) -> Element {
        let mut anchor = Element::new(QName::svg("a"));
        anchor.set_attr(QName::new(Some(XLINK_NS), "href"), self.url.as_str());
        if let Some(target) = self.target.as_deref().filter(|t| !t.is_empty()) {
            anchor.set_attr(QName::svg("target"), target);
        }
        anchor
    }
}

impl From<&str> for LinkTarget {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

/// Element id -> link. Ordered so that fingerprints are deterministic.
pub type LinkMap = BTreeMap<String, LinkTarget>;

/// One element that [`wrap_links`] placed inside an anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedLink {
    pub element: NodeId,
    pub anchor: NodeId,
    pub element_id: String,
    pub link: LinkTarget,
}

/// Wrap every element whose id is a key of `links` in an `<a>` element.
///
/// Only elements in `vocabulary` are considered; the root is never wrapped.
/// Ids in `links` that match nothing are ignored, as are links with an empty
/// url. Sibling order is preserved: the anchor takes the element's slot.
///
/// When the source has duplicate ids, every matching element is wrapped.
/// This is the document author's problem and is deliberately left undefined.
pub fn wrap_links(
    doc: &mut Document,
    links: &LinkMap,
    vocabulary: &Vocabulary,
) -> Result<Vec<WrappedLink>, SvgError> {
    let mut parents = doc.parent_index();

    // First, find the elements that we are interested in wrapping
    let root = doc.root();
    let candidates: Vec<(NodeId, String, &LinkTarget)> = doc
        .descendants()
        .into_iter()
        .filter(|&node| node != root)
        .filter_map(|node| {
            let element = &doc[node];
            if !vocabulary.contains(&element.name.local) {
                return None;
            }
            let id = element.id()?;
            let link = links.get(id).filter(|link| !link.url.is_empty())?;
            Some((node, id.to_owned(), link))
        })
        .collect();

    // Then wrap them
    let mut wrapped = Vec::with_capacity(candidates.len());
    for (node, element_id, link) in candidates {
        let parent = parents.parent(node).ok_or_else(|| {
            SvgError::Consistency(format!("element `{element_id}` has no parent"))
        })?;
        let index = doc[parent]
            .children
            .iter()
            .position(|&child| child == node)
            .ok_or_else(|| {
                SvgError::Consistency(format!("element `{element_id}` missing from its parent"))
            })?;

        doc[parent].children.remove(index);

        // Keep the element's trailing whitespace from leaking outside the anchor
        let element = &mut doc[node];
        element.tail = element
            .tail
            .take()
            .map(|tail| tail.trim().to_owned())
            .filter(|tail| !tail.is_empty());

        let mut anchor = link.anchor();
        anchor.children.push(node);
        let anchor = doc.alloc(anchor);
        doc[parent].children.insert(index, anchor);

        parents.set(node, anchor);
        parents.set(anchor, parent);

        wrapped.push(WrappedLink {
            element: node,
            anchor,
            element_id,
            link: link.clone(),
        });
    }

    Ok(wrapped)
}
