//! SVG parsing, link wrapping and serialization.
//!
//! # Module Structure
//!
//! ```text
//! svg/
//! ├── tree        # Arena XML tree (Document, Element, NodeId, ParentIndex)
//! ├── scan        # Streaming id scanner
//! ├── link        # Wrap elements in <a> anchors
//! ├── dimensions  # width/height <-> viewBox
//! ├── entity      # Internal DTD subset entities
//! ├── serialize   # Namespace-qualified output
//! └── error       # SvgError
//! ```
//!
//! Pipeline used by the image-map renderer:
//!
//! ```text
//! bytes ─► Document::parse ─► wrap_links ─► normalize_dimensions ─► Serializer
//!   └────► scan_ids (streaming, no tree)
//! ```

mod dimensions;
mod entity;
mod error;
mod link;
mod scan;
mod serialize;
mod tree;

pub use dimensions::{ensure_svg_root, normalize_dimensions, read_dimensions};
pub use error::SvgError;
pub use link::{LinkMap, LinkTarget, WrappedLink, wrap_links};
pub use scan::{IdScanner, scan_ids};
pub use serialize::{Serializer, qualify_attributes};
pub use tree::{Document, Element, NodeId, ParentIndex, QName};

use rustc_hash::FxHashSet;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Visible SVG elements that may carry a link.
///
/// See <https://developer.mozilla.org/en-US/docs/Web/SVG/Element>.
pub const VISIBLE_SVG_TAGS: &[&str] = &[
    "a", "circle", "ellipse", "g", "image", "line", "path", "polygon", "polyline", "rect", "switch",
    "text", "textPath", "tref", "tspan", "use",
];

/// Set of namespace-agnostic element names considered for ids and links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vocabulary {
    /// Every element qualifies.
    Any,
    Tags(FxHashSet<String>),
}

impl Vocabulary {
    /// The default allow-list ([`VISIBLE_SVG_TAGS`]).
    pub fn visible() -> Self {
        Self::from_tags(VISIBLE_SVG_TAGS.iter().copied())
    }

    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Tags(tags.into_iter().map(Into::into).collect())
    }

    /// Check a local (prefix-stripped) element name. Case-sensitive.
    #[inline]
    pub fn contains(&self, local_name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Tags(tags) => tags.contains(local_name),
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::visible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_vocabulary() {
        let vocab = Vocabulary::visible();
        for tag in VISIBLE_SVG_TAGS {
            assert!(vocab.contains(tag));
        }
        assert!(vocab.contains("textPath"));
        assert!(!vocab.contains("textpath"));
        assert!(!vocab.contains("defs"));
        assert!(!vocab.contains("linearGradient"));
    }

    #[test]
    fn test_any_vocabulary() {
        assert!(Vocabulary::Any.contains("defs"));
        assert!(Vocabulary::Any.contains("whatever"));
    }
}
